//! Redirect transform: новая позиция + velocity после входа в tube

use bevy::prelude::*;

use crate::config::RedirectSettings;

/// Exit pose в world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitPose {
    pub position: Vec3,
    pub forward: Vec3,
}

impl ExitPose {
    pub fn from_global(global: &GlobalTransform) -> Self {
        Self {
            position: global.translation(),
            forward: global.forward().as_vec3(),
        }
    }
}

/// Результат redirect'а
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedirectResult {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Направление выхода (unit или ZERO если exit смотрит строго вертикально при clamp_to_xz)
    pub direction: Vec3,
}

/// Направление выхода (опционально сплющенное в XZ)
pub fn exit_direction(forward: Vec3, clamp_to_xz: bool) -> Vec3 {
    let forward = forward.normalize_or_zero();
    if clamp_to_xz {
        Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero()
    } else {
        forward
    }
}

/// Вычисляет redirect для projectile в `position` со скоростью `velocity`
pub fn compute_redirect(
    settings: &RedirectSettings,
    exit: &ExitPose,
    position: Vec3,
    velocity: Vec3,
) -> RedirectResult {
    let speed = velocity.length();
    let direction = exit_direction(exit.forward, settings.clamp_to_xz);

    let out_speed = if settings.preserve_speed {
        speed.max(settings.min_speed_floor)
    } else {
        speed
    };

    let base = if settings.teleport_to_exit {
        exit.position
    } else {
        position
    };

    RedirectResult {
        position: base + direction * settings.exit_offset,
        velocity: direction * out_speed,
        direction,
    }
}
