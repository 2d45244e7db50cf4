//! Projectile события (core → внешние коллабораторы: ammo, lose condition)

use bevy::prelude::*;

/// Projectile появился в мире
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileSpawned {
    pub projectile: Entity,
}

/// Причина уничтожения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyCause {
    /// Lifetime вышел
    Expired,
    /// Попал во врага
    HitEnemy,
    /// Стена / борт tube / (по политике) любая поверхность
    Obstacle,
    /// Despawn в обход destroy_projectile (reset уровня, внешний код)
    Despawned,
}

/// Projectile уничтожен (ровно одно событие на projectile)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileDestroyed {
    pub projectile: Entity,
    pub cause: DestroyCause,
}

/// Solid контакт projectile'а с другим телом (от physics bridge)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileContact {
    pub projectile: Entity,
    pub other: Entity,
}

/// Враг получил попадание (enemy health и анимация живут снаружи)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyHit {
    pub enemy: Entity,
    pub projectile: Entity,
}
