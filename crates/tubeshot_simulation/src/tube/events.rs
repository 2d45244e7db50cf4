//! Tube события

use bevy::prelude::*;

use super::crossing::AcceptReason;

/// Фаза overlap'а sensor'а
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPhase {
    /// Первый тик пересечения
    Began,
    /// Пересечение продолжается
    Continuing,
}

/// Overlap sensor'а entrance с телом (physics bridge → tube handler)
///
/// Шлётся на каждом тике пересечения: Began один раз, потом Continuing.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntranceTriggered {
    pub tube: Entity,
    pub entrance_index: usize,
    /// Sensor entity (для suppression)
    pub sensor: Entity,
    pub body: Entity,
    pub phase: OverlapPhase,
}

/// Запрос на поворот tube на 90° CW
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotateTubeRequest {
    pub tube: Entity,
}

/// Поворот закончен (tube снова Idle)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TubeRotationFinished {
    pub tube: Entity,
}

/// Projectile прошёл через tube
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ProjectileTeleported {
    pub projectile: Entity,
    pub tube: Entity,
    pub entrance_index: usize,
    pub reason: AcceptReason,
    pub position: Vec3,
    pub velocity: Vec3,
}
