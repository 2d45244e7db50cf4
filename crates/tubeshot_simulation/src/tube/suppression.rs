//! Временное подавление пары (projectile, sensor) после телепорта
//!
//! Timer record на пару, тикается раз в fixed тик, всегда доживает до конца.
//! Пока пара подавлена, overlap события этого sensor'а для projectile'а
//! отбрасываются до tube handler'а.

use bevy::prelude::*;

#[derive(Debug, Clone)]
pub struct CollisionSuppression {
    pub projectile: Entity,
    pub sensor: Entity,
    timer: Timer,
}

#[derive(Resource, Debug, Default)]
pub struct SuppressedPairs {
    active: Vec<CollisionSuppression>,
}

impl SuppressedPairs {
    /// Нулевое окно → ничего не планируем
    pub fn suppress(&mut self, projectile: Entity, sensor: Entity, duration_secs: f32) {
        if duration_secs.is_nan() || duration_secs <= 0.0 {
            return;
        }
        self.active.push(CollisionSuppression {
            projectile,
            sensor,
            timer: Timer::from_seconds(duration_secs, TimerMode::Once),
        });
    }

    pub fn is_suppressed(&self, projectile: Entity, sensor: Entity) -> bool {
        self.active
            .iter()
            .any(|pair| pair.projectile == projectile && pair.sensor == sensor)
    }

    /// Tick всех записей, истёкшие удаляются
    pub fn tick(&mut self, delta: std::time::Duration) {
        self.active.retain_mut(|pair| !pair.timer.tick(delta).finished());
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

pub fn tick_collision_suppressions(time: Res<Time>, mut pairs: ResMut<SuppressedPairs>) {
    if pairs.is_empty() {
        return;
    }
    pairs.tick(time.delta());
}
