//! Projectile компоненты: Projectile, TransitStamp, SurfaceTag
//!
//! Projectile: velocity-driven entity
//! - velocity хранится в ECS (интеграция в physics::movement)
//! - lifetime countdown стартует на Fire, НЕ сбрасывается на Redirect
//! - ориентация всегда смотрит вдоль velocity

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Порог квадрата скорости для выравнивания ориентации
pub const ALIGN_EPSILON_SQ: f32 = 1e-6;

/// Составной ключ entrance: `tubeId#entranceIndex`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntranceKey(String);

impl EntranceKey {
    pub fn new(tube_id: &str, entrance_index: usize) -> Self {
        Self(format!("{}#{}", tube_id, entrance_index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntranceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// История телепортов + кэш signed distance по entrance'ам
///
/// Живёт внутри Projectile (создаётся лениво при первой оценке любым tube,
/// умирает вместе с projectile).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitStamp {
    /// Последний entrance, через который прошёл телепорт
    pub last_entrance_key: Option<EntranceKey>,
    /// Время последнего телепорта (simulation clock, сек)
    pub last_time: f32,
    /// Последняя signed distance до плоскости входа (только для оценённых entrance'ов)
    ///
    /// BTreeMap: Debug вывод стабилен между запусками (snapshots)
    signed_distances: BTreeMap<EntranceKey, f32>,
}

impl TransitStamp {
    /// Активен ли cooldown именно для этого entrance
    ///
    /// Другой entrance (даже того же tube) не блокируется.
    pub fn cooldown_active(&self, key: &EntranceKey, now: f32, cooldown: f32) -> bool {
        self.last_entrance_key.as_ref() == Some(key) && now - self.last_time < cooldown
    }

    pub fn signed_distance(&self, key: &EntranceKey) -> Option<f32> {
        self.signed_distances.get(key).copied()
    }

    pub fn remember_distance(&mut self, key: &EntranceKey, distance: f32) {
        self.signed_distances.insert(key.clone(), distance);
    }

    pub fn record_teleport(&mut self, key: EntranceKey, now: f32) {
        self.last_entrance_key = Some(key);
        self.last_time = now;
    }

    /// Сколько entrance'ов уже оценивалось для этого projectile
    pub fn tracked_entrances(&self) -> usize {
        self.signed_distances.len()
    }
}

/// Projectile (пуля)
///
/// Инварианты:
/// - `alive == false` → entity уже поставлен на despawn, события игнорируются
/// - lifetime == None → projectile ещё не был выпущен (Fire)
#[derive(Component, Debug, Clone)]
#[require(Transform)]
pub struct Projectile {
    /// Скорость (m/s, world space)
    pub velocity: Vec3,
    lifetime: Option<Timer>,
    alive: bool,
    /// Транзитная история (lazily populated)
    pub transit: Option<TransitStamp>,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            lifetime: None,
            alive: true,
            transit: None,
        }
    }
}

impl Projectile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire: задаёт velocity и (пере)запускает lifetime countdown
    pub fn fire(&mut self, transform: &mut Transform, velocity: Vec3, lifetime_secs: f32) {
        self.velocity = velocity;
        self.lifetime = Some(Timer::from_seconds(lifetime_secs.max(0.0), TimerMode::Once));
        align_to_velocity(transform, velocity);
    }

    /// Redirect: задаёт velocity и ориентацию, lifetime не трогает
    ///
    /// Вызывается только redirect transform'ом tube.
    pub fn redirect(&mut self, transform: &mut Transform, velocity: Vec3) {
        self.velocity = velocity;
        align_to_velocity(transform, velocity);
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_fired(&self) -> bool {
        self.lifetime.is_some()
    }

    /// Оставшееся время жизни (None если ещё не выпущен)
    pub fn lifetime_remaining(&self) -> Option<f32> {
        self.lifetime.as_ref().map(|timer| timer.remaining_secs())
    }

    /// Tick lifetime, возвращает true когда время вышло
    pub fn tick_lifetime(&mut self, delta: Duration) -> bool {
        match self.lifetime.as_mut() {
            Some(timer) => timer.tick(delta).finished(),
            None => false,
        }
    }

    /// Пометить уничтоженным (idempotent)
    ///
    /// true только на первом вызове, вызывающий делает despawn один раз.
    pub fn mark_destroyed(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }

    /// TransitStamp, создаётся при первом обращении
    pub fn transit_mut(&mut self) -> &mut TransitStamp {
        self.transit.get_or_insert_with(TransitStamp::default)
    }
}

/// Повернуть transform вдоль velocity (up = Y)
///
/// При почти нулевой скорости ориентация не меняется.
pub fn align_to_velocity(transform: &mut Transform, velocity: Vec3) {
    if velocity.length_squared() > ALIGN_EPSILON_SQ {
        transform.look_to(velocity.normalize(), Vec3::Y);
    }
}

/// Тег поверхности для terminal collision handling
///
/// Может висеть на родителе collider'а (поиск идёт вверх по иерархии).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub enum SurfaceTag {
    Enemy,
    Wall,
    TubeSide,
}

/// Process-wide счётчик живых projectile'ов
///
/// Считаем по множеству entity: повторный spawn/despawn одного entity
/// не сдвигает счётчик, ниже нуля он уйти не может.
/// `reported`: уничтоженные, про которых ProjectileDestroyed уже отправлен.
#[derive(Resource, Debug, Default)]
pub struct ActiveProjectiles {
    tracked: BTreeSet<Entity>,
    reported: BTreeSet<Entity>,
}

impl ActiveProjectiles {
    pub fn count(&self) -> usize {
        self.tracked.len()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.tracked.contains(&entity)
    }

    /// true если entity новый
    pub fn register(&mut self, entity: Entity) -> bool {
        self.tracked.insert(entity)
    }

    /// true если entity был в счётчике
    pub fn unregister(&mut self, entity: Entity) -> bool {
        self.tracked.remove(&entity)
    }

    pub fn mark_reported(&mut self, entity: Entity) {
        self.reported.insert(entity);
    }

    /// Снимает отметку; true если уничтожение уже было объявлено
    pub fn take_reported(&mut self, entity: Entity) -> bool {
        self.reported.remove(&entity)
    }
}
