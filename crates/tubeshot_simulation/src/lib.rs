//! Tubeshot Simulation Core
//!
//! ECS-симуляция tube redirector механики на Bevy 0.16
//!
//! HYBRID ARCHITECTURE:
//! - ECS = правила (crossing detection, redirect, rotation, projectile lifecycle)
//! - Rapier = факты (sensor overlap, solid contacts, ray cast) через physics bridge

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod config;
pub mod hierarchy;
pub mod logger;
pub mod physics;
pub mod projectile;
pub mod tube;

// Re-export основных типов
pub use config::{
    spawn_level, ContactPolicy, LayoutError, LevelLayout, ProjectileConfig, RedirectSettings,
    RotationSettings, SafetySettings, SpawnedLevel, TubeSettings,
};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, LogLevel, LogPrinter,
};
pub use physics::{PointerPressed, RapierBridgePlugin};
pub use projectile::{
    spawn_projectile, ActiveProjectiles, DestroyCause, EnemyHit, Projectile, ProjectileContact,
    ProjectileDestroyed, ProjectilePlugin, ProjectileSpawned, SurfaceTag, TransitStamp,
};
pub use tube::{
    Entrance, EntranceTrigger, EntranceTriggered, OverlapPhase, ProjectileTeleported,
    RotateTubeRequest, TriggerOutcome, Tube, TubePlugin, TubeRotationFinished,
};

/// Частота fixed тика симуляции
pub const SIMULATION_HZ: f64 = 60.0;

/// Фазы fixed тика (выполняются строго последовательно)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TubeshotSet {
    /// Lifetime, suppression timers
    Timers,
    /// Physics bridge: Rapier события → core события
    Relay,
    /// Entrance handler, terminal contacts
    Resolve,
    /// velocity → position, alignment, sync в Rapier
    Integrate,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Fixed timestep 60Hz для simulation tick
        app.insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ));

        // Детерминистичный RNG (seed по умолчанию, если harness не задал свой)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app.configure_sets(
            FixedUpdate,
            (
                TubeshotSet::Timers,
                TubeshotSet::Relay,
                TubeshotSet::Resolve,
                TubeshotSet::Integrate,
            )
                .chain(),
        );

        app.add_plugins((ProjectilePlugin, TubePlugin, RapierBridgePlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время двигается вручную: каждый `app.update()` = ровно один fixed тик
/// (кроме самого первого, у которого delta = 0).
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins((MinimalPlugins, bevy::transform::TransformPlugin))
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / SIMULATION_HZ,
        )))
        .add_plugins(SimulationPlugin);

    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
