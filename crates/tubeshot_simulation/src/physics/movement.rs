//! Движение projectile'ов
//!
//! Архитектура:
//! - Rapier для коллизий (RigidBody::KinematicPositionBased)
//! - Custom velocity integration (не используем Rapier forces, нет гравитации)
//! - Position-based kinematic: Rapier сам выводит скорость тела из смены Transform
//!
//! Детерминизм: fixed timestep (60Hz)

use bevy::prelude::*;

use crate::projectile::Projectile;

/// Интеграция velocity → Transform: position += velocity * dt
///
/// Работает и без Rapier (headless симуляция).
pub fn integrate_projectiles(mut query: Query<(&Projectile, &mut Transform)>, time: Res<Time>) {
    let delta = time.delta_secs();

    for (projectile, mut transform) in query.iter_mut() {
        if projectile.is_alive() {
            transform.translation += projectile.velocity * delta;
        }
    }
}
