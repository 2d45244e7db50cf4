//! Collision groups: централизованные константы для всего проекта
//!
//! ## Слои:
//! - GROUP_1: Projectiles (kinematic bullets)
//! - GROUP_2: Environment (стены, борта tube'ов)
//! - GROUP_3: Tube sensors (overlap-only входы)
//! - GROUP_4: Enemies
//!
//! Projectile'ы не коллайдят друг с другом.

use bevy_rapier3d::prelude::*;

pub const GROUP_PROJECTILES: Group = Group::GROUP_1;
pub const GROUP_ENVIRONMENT: Group = Group::GROUP_2;
pub const GROUP_TUBE_SENSORS: Group = Group::GROUP_3;
pub const GROUP_ENEMIES: Group = Group::GROUP_4;

/// Projectile: environment + sensors + enemies
pub fn projectile_groups() -> CollisionGroups {
    CollisionGroups::new(
        GROUP_PROJECTILES,
        GROUP_ENVIRONMENT | GROUP_TUBE_SENSORS | GROUP_ENEMIES,
    )
}

pub fn environment_groups() -> CollisionGroups {
    CollisionGroups::new(GROUP_ENVIRONMENT, GROUP_PROJECTILES)
}

pub fn tube_sensor_groups() -> CollisionGroups {
    CollisionGroups::new(GROUP_TUBE_SENSORS, GROUP_PROJECTILES)
}

pub fn enemy_groups() -> CollisionGroups {
    CollisionGroups::new(GROUP_ENEMIES, GROUP_PROJECTILES)
}
