//! Projectile (пуля)
//!
//! ECS ответственность:
//! - velocity / lifetime / liveness
//! - ориентация вдоль velocity каждый fixed тик
//! - terminal contacts (enemy, wall, tube side)
//! - active count + spawn/destroy события для внешних коллабораторов

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

pub mod components;
pub mod events;
pub mod systems;

pub use components::{
    align_to_velocity, ActiveProjectiles, EntranceKey, Projectile, SurfaceTag, TransitStamp,
    ALIGN_EPSILON_SQ,
};
pub use events::{DestroyCause, EnemyHit, ProjectileContact, ProjectileDestroyed, ProjectileSpawned};
pub use systems::{classify_contact, destroy_projectile, ContactResponse};

use crate::config::ProjectileConfig;
use crate::physics::{collision, integrate_projectiles};
use crate::TubeshotSet;

/// Projectile Plugin
///
/// Порядок в FixedUpdate:
/// 1. Timers: tick_projectile_lifetimes
/// 2. Resolve: handle_projectile_contacts
/// 3. Integrate: integrate_projectiles → align_projectiles
///
/// PostUpdate: note_reported_destructions → track_projectile_lifecycle (active count)
pub struct ProjectilePlugin;

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ProjectileSpawned>()
            .add_event::<ProjectileDestroyed>()
            .add_event::<ProjectileContact>()
            .add_event::<EnemyHit>()
            .init_resource::<ActiveProjectiles>()
            .init_resource::<ProjectileConfig>();

        app.add_systems(
            FixedUpdate,
            (
                systems::tick_projectile_lifetimes.in_set(TubeshotSet::Timers),
                systems::handle_projectile_contacts.in_set(TubeshotSet::Resolve),
                (integrate_projectiles, systems::align_projectiles)
                    .chain()
                    .in_set(TubeshotSet::Integrate),
            ),
        );

        app.add_systems(
            PostUpdate,
            (
                systems::note_reported_destructions,
                systems::track_projectile_lifecycle,
            )
                .chain(),
        );
    }
}

/// Spawn + Fire
///
/// Создает entity с полным набором компонентов:
/// - Projectile (уже выпущен, lifetime идёт)
/// - Rapier: kinematic RigidBody + ball Collider + collision events
pub fn spawn_projectile(
    commands: &mut Commands,
    position: Vec3,
    velocity: Vec3,
    config: &ProjectileConfig,
) -> Entity {
    let mut transform = Transform::from_translation(position);
    let mut projectile = Projectile::new();
    projectile.fire(&mut transform, velocity, config.lifetime_secs);

    commands
        .spawn((
            projectile,
            transform,
            RigidBody::KinematicPositionBased,
            Collider::ball(config.radius),
            // Kinematic vs static (стены, sensor'ы) по умолчанию не репортятся
            ActiveEvents::COLLISION_EVENTS,
            ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC,
            collision::projectile_groups(),
        ))
        .id()
}
