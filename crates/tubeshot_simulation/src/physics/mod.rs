//! Physics bridge (Rapier)
//!
//! Projectile движение, collision groups и адаптер Rapier событий
//! в core события (EntranceTriggered, ProjectileContact, RotateTubeRequest).

use bevy::prelude::*;
use bevy_rapier3d::prelude::CollisionEvent;

pub mod bridge;
pub mod collision;
pub mod movement;
pub mod picking;

pub use bridge::{emit_continuing_overlaps, relay_collision_events, OverlapTracker};
pub use movement::integrate_projectiles;
pub use picking::{pick_tubes_with_pointer, PointerPressed, PICK_MAX_DISTANCE};

use crate::TubeshotSet;

/// Rapier bridge plugin
///
/// Сам RapierPhysicsPlugin добавляет приложение (`.in_fixed_schedule()`),
/// здесь только адаптеры. CollisionEvent регистрируется и без Rapier,
/// чтобы headless тесты могли слать события вручную.
pub struct RapierBridgePlugin;

impl Plugin for RapierBridgePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CollisionEvent>()
            .add_event::<PointerPressed>()
            .init_resource::<OverlapTracker>();

        app.add_systems(
            FixedUpdate,
            (emit_continuing_overlaps, relay_collision_events)
                .chain()
                .in_set(TubeshotSet::Relay),
        );

        // Запросы поворота должны попасть в этот же кадр
        app.add_systems(
            Update,
            pick_tubes_with_pointer.before(crate::tube::rotation::start_tube_rotations),
        );
    }
}
