//! Setup-time конфигурация: настройки tube'ов, projectile'ов, level layout
//!
//! Значения по умолчанию подобраны под projectile ~40 m/s и fixed тик 60Hz.
//! Конфиги сериализуемы (serde), level layout грузится из JSON.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub mod layout;

pub use layout::{
    spawn_level, EnemyLayout, EntranceLayout, LauncherLayout, LayoutError, LevelLayout,
    SpawnedLevel, TubeLayout, TubeSideLayout, WallLayout, DEMO_LEVEL_JSON,
};

/// Настройки redirect transform (куда и с какой скоростью выкидываем projectile)
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectSettings {
    /// true = прыжок в exit pose, false = только сдвиг на exit_offset от текущей позиции
    pub teleport_to_exit: bool,
    /// Сохранять модуль скорости (с нижним порогом min_speed_floor)
    pub preserve_speed: bool,
    /// Сплющить направление выхода в плоскость XZ
    pub clamp_to_xz: bool,
    /// Сдвиг вдоль направления выхода (метры, ≥ 0)
    pub exit_offset: f32,
    /// Минимальная скорость после redirect при preserve_speed
    pub min_speed_floor: f32,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            teleport_to_exit: true,
            preserve_speed: true,
            clamp_to_xz: true,
            exit_offset: 0.05,
            min_speed_floor: 0.01,
        }
    }
}

/// Защита от double-fire
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    /// Окно, в течение которого тот же projectile не может снова пройти тот же entrance (сек)
    pub per_entrance_cooldown: f32,
    /// Насколько глубоко за плоскостью входа считаем "уже внутри" (метры)
    pub inside_epsilon: f32,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            per_entrance_cooldown: 0.12,
            inside_epsilon: 0.03,
        }
    }
}

/// Поворот tube на 90° по клику
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Длительность поворота на 90° (сек)
    pub duration_secs: f32,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self { duration_secs: 0.15 }
    }
}

/// Полный набор настроек одного tube
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct TubeSettings {
    pub redirect: RedirectSettings,
    pub safety: SafetySettings,
    pub rotation: RotationSettings,
}

impl TubeSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.redirect.exit_offset.is_finite() || self.redirect.exit_offset < 0.0 {
            return Err("exit_offset must be finite and >= 0".to_string());
        }
        if !self.redirect.min_speed_floor.is_finite() || self.redirect.min_speed_floor < 0.0 {
            return Err("min_speed_floor must be finite and >= 0".to_string());
        }
        if !self.safety.per_entrance_cooldown.is_finite() || self.safety.per_entrance_cooldown < 0.0 {
            return Err("per_entrance_cooldown must be finite and >= 0".to_string());
        }
        if !self.safety.inside_epsilon.is_finite() || self.safety.inside_epsilon < 0.0 {
            return Err("inside_epsilon must be finite and >= 0".to_string());
        }
        if !self.rotation.duration_secs.is_finite() || self.rotation.duration_secs < 0.0 {
            return Err("rotation duration_secs must be finite and >= 0".to_string());
        }
        Ok(())
    }

    /// Приводит значения к инвариантам (non-negative окна/сдвиги)
    ///
    /// Используется при создании Tube из кода: невалидный конфиг не блокирует игру.
    pub fn sanitized(mut self) -> Self {
        self.redirect.exit_offset = non_negative(self.redirect.exit_offset);
        self.redirect.min_speed_floor = non_negative(self.redirect.min_speed_floor);
        self.safety.per_entrance_cooldown = non_negative(self.safety.per_entrance_cooldown);
        self.safety.inside_epsilon = non_negative(self.safety.inside_epsilon);
        self.rotation.duration_secs = non_negative(self.rotation.duration_secs);
        self
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Что делать при контакте с телом без SurfaceTag
///
/// Оригинальная игра: projectile летит дальше (pass-through props).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum ContactPolicy {
    #[default]
    Ignore,
    Destroy,
}

/// Глобальные параметры projectile'ов
#[derive(Resource, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Время жизни после Fire (сек)
    pub lifetime_secs: f32,
    /// Радиус collider'а (метры)
    pub radius: f32,
    /// Политика для контактов без тега
    pub unmatched_contact: ContactPolicy,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: 6.0,
            radius: 0.05,
            unmatched_contact: ContactPolicy::Ignore,
        }
    }
}

impl ProjectileConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.lifetime_secs.is_finite() || self.lifetime_secs <= 0.0 {
            return Err("lifetime_secs must be finite and > 0".to_string());
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err("radius must be finite and > 0".to_string());
        }
        Ok(())
    }
}
