//! Tube redirector
//!
//! ECS ответственность:
//! - Entrance crossing detection (три предиката, per-entrance cooldown)
//! - Redirect / teleport projectile'а к exit pose
//! - Single-flight поворот на 90° вокруг pivot
//!
//! Physics bridge ответственность:
//! - Sensor overlap → EntranceTriggered (Began + Continuing каждый тик)
//! - Pointer ray cast → RotateTubeRequest

use bevy::prelude::*;

pub mod components;
pub mod crossing;
pub mod events;
pub mod redirect;
pub mod rotation;
pub mod setup;
pub mod suppression;
pub mod systems;

pub use components::{
    Entrance, EntranceGeometry, EntranceTrigger, RotationProgress, RotationState, Teleport,
    TriggerOutcome, Tube,
};
pub use crossing::{inward_cosine, AcceptReason, CrossingSample, EntrancePlane};
pub use events::{
    EntranceTriggered, OverlapPhase, ProjectileTeleported, RotateTubeRequest, TubeRotationFinished,
};
pub use redirect::{compute_redirect, exit_direction, ExitPose, RedirectResult};
pub use rotation::{QuarterTurn, QUARTER_TURN_DEGREES};
pub use setup::{diagnose_tube, SensorStatus, SetupDiagnostic};
pub use suppression::SuppressedPairs;

use crate::TubeshotSet;

/// Tube Plugin
///
/// Порядок выполнения:
/// 1. PreUpdate: setup_new_tubes (id, relay, диагностика)
/// 2. FixedUpdate/Timers: tick_collision_suppressions
/// 3. FixedUpdate/Resolve: handle_entrance_triggers (после terminal contacts:
///    projectile, убитый контактом в этом тике, уже не телепортируется)
/// 4. Update: start_tube_rotations → advance_tube_rotations
pub struct TubePlugin;

impl Plugin for TubePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<EntranceTriggered>()
            .add_event::<RotateTubeRequest>()
            .add_event::<TubeRotationFinished>()
            .add_event::<ProjectileTeleported>()
            .init_resource::<SuppressedPairs>();

        app.add_systems(PreUpdate, setup::setup_new_tubes);

        app.add_systems(
            FixedUpdate,
            (
                suppression::tick_collision_suppressions.in_set(TubeshotSet::Timers),
                systems::handle_entrance_triggers
                    .in_set(TubeshotSet::Resolve)
                    .after(crate::projectile::systems::handle_projectile_contacts),
            ),
        );

        // Поворот и pointer input в variable tick
        app.add_systems(
            Update,
            (rotation::start_tube_rotations, rotation::advance_tube_rotations).chain(),
        );
    }
}
