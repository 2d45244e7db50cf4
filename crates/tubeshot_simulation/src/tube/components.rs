//! Tube компоненты: Tube, Entrance, EntranceTrigger
//!
//! Tube владеет фиксированным списком entrance'ов, принимает решение о входе
//! (crossing state machine) и делает redirect. Вся bookkeeping (cooldown,
//! signed distance cache) живёт в TransitStamp projectile'а.

use bevy::prelude::*;

use super::crossing::{inward_cosine, AcceptReason, CrossingSample, EntrancePlane};
use super::redirect::{compute_redirect, ExitPose};
use super::rotation::QuarterTurn;
use crate::config::TubeSettings;
use crate::projectile::{EntranceKey, Projectile};

/// Вход в tube (конфигурация, immutable после setup)
#[derive(Debug, Clone, PartialEq)]
pub struct Entrance {
    pub name: String,
    /// Overlap-only sensor volume
    pub sensor: Option<Entity>,
    /// Exit pose (Transform entity, forward = направление выхода)
    pub exit: Option<Entity>,
    /// Центр bounds sensor volume в его локальных координатах
    /// (collider может быть смещён относительно entity)
    pub sensor_center: Vec3,
    /// "Внутрь tube" в локальных координатах sensor'а
    local_inward: Vec3,
    min_enter_dot: f32,
}

impl Default for Entrance {
    fn default() -> Self {
        Self {
            name: String::new(),
            sensor: None,
            exit: None,
            sensor_center: Vec3::ZERO,
            local_inward: Vec3::NEG_Z,
            min_enter_dot: 0.5,
        }
    }
}

impl Entrance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..default()
        }
    }

    pub fn with_sensor(mut self, sensor: Entity) -> Self {
        self.sensor = Some(sensor);
        self
    }

    pub fn with_exit(mut self, exit: Entity) -> Self {
        self.exit = Some(exit);
        self
    }

    pub fn with_sensor_center(mut self, center: Vec3) -> Self {
        self.sensor_center = center;
        self
    }

    /// Нулевой вектор игнорируется (остаётся предыдущее направление)
    pub fn with_local_inward(mut self, inward: Vec3) -> Self {
        let inward = inward.normalize_or_zero();
        if inward != Vec3::ZERO {
            self.local_inward = inward;
        }
        self
    }

    /// Clamp в [0, 1]
    pub fn with_min_enter_dot(mut self, min_enter_dot: f32) -> Self {
        self.min_enter_dot = if min_enter_dot.is_finite() {
            min_enter_dot.clamp(0.0, 1.0)
        } else {
            0.5
        };
        self
    }

    pub fn local_inward(&self) -> Vec3 {
        self.local_inward
    }

    pub fn min_enter_dot(&self) -> f32 {
        self.min_enter_dot
    }
}

/// Relay на sensor entity: overlap этого sensor'а → entrance `index` tube `owner`
///
/// Вешается автоматически при setup tube.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct EntranceTrigger {
    pub owner: Entity,
    pub index: usize,
}

/// Геометрия entrance в world space на момент события
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntranceGeometry {
    pub plane: EntrancePlane,
    /// None → entrance выключен (нет exit pose)
    pub exit: Option<ExitPose>,
}

impl EntranceGeometry {
    /// Плоскость входа проходит через центр bounds sensor'а
    pub fn resolve(
        entrance: &Entrance,
        sensor: &GlobalTransform,
        exit: Option<&GlobalTransform>,
    ) -> Self {
        Self {
            plane: EntrancePlane::new(
                sensor.transform_point(entrance.sensor_center),
                sensor.rotation() * entrance.local_inward,
            ),
            exit: exit.map(ExitPose::from_global),
        }
    }
}

/// Успешный телепорт
#[derive(Debug, Clone, PartialEq)]
pub struct Teleport {
    pub key: EntranceKey,
    pub reason: AcceptReason,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Результат HandleEntranceTrigger (обычные значения, не ошибки)
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Индекс вне массива entrance'ов
    InvalidEntrance,
    /// У entrance нет exit pose
    Disabled,
    /// Тот же projectile недавно прошёл этот entrance
    CoolingDown,
    Rejected { signed_distance: f32 },
    Teleported(Teleport),
}

impl TriggerOutcome {
    pub fn is_teleport(&self) -> bool {
        matches!(self, TriggerOutcome::Teleported(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Idle,
    Rotating,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationProgress {
    Idle,
    Turning { rotated_degrees: f32 },
    Finished,
}

/// Tube (редиректор)
#[derive(Component, Debug, Clone)]
#[require(Transform)]
pub struct Tube {
    /// Пустой → выводится из Entity при setup
    id: String,
    entrances: Vec<Entrance>,
    pub settings: TubeSettings,
    /// Pivot поворота (None → сам tube)
    pub pivot: Option<Entity>,
    rotation: Option<QuarterTurn>,
}

impl Tube {
    pub fn new(id: impl Into<String>, entrances: Vec<Entrance>, settings: TubeSettings) -> Self {
        Self {
            id: id.into(),
            entrances,
            settings: settings.sanitized(),
            pivot: None,
            rotation: None,
        }
    }

    pub fn with_pivot(mut self, pivot: Entity) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Детерминированный id из identity entity
    pub fn derived_id(owner: Entity) -> String {
        format!("tube-{}", owner.to_bits())
    }

    /// true если id был выведен
    pub fn ensure_id(&mut self, owner: Entity) -> bool {
        if self.id.is_empty() {
            self.id = Self::derived_id(owner);
            true
        } else {
            false
        }
    }

    pub fn entrances(&self) -> &[Entrance] {
        &self.entrances
    }

    pub fn entrance(&self, index: usize) -> Option<&Entrance> {
        self.entrances.get(index)
    }

    pub fn entrance_key(&self, owner: Entity, index: usize) -> EntranceKey {
        if self.id.is_empty() {
            EntranceKey::new(&Self::derived_id(owner), index)
        } else {
            EntranceKey::new(&self.id, index)
        }
    }

    /// HandleEntranceTrigger: один overlap tick пары (projectile, entrance)
    ///
    /// Порядок:
    /// 1. валидный индекс + exit pose (иначе no-op)
    /// 2. per-entrance cooldown (no-op, cache не трогаем)
    /// 3. crossing predicates; reject → только обновить cache
    /// 4. accept → redirect, stamp, cache от post-teleport позиции
    pub fn handle_entrance_trigger(
        &self,
        owner: Entity,
        entrance_index: usize,
        geometry: &EntranceGeometry,
        projectile: &mut Projectile,
        transform: &mut Transform,
        now: f32,
    ) -> TriggerOutcome {
        let Some(entrance) = self.entrances.get(entrance_index) else {
            return TriggerOutcome::InvalidEntrance;
        };
        let (Some(_), Some(exit)) = (entrance.exit, geometry.exit) else {
            return TriggerOutcome::Disabled;
        };

        let key = self.entrance_key(owner, entrance_index);
        let cooldown = self.settings.safety.per_entrance_cooldown;
        if projectile
            .transit
            .as_ref()
            .is_some_and(|stamp| stamp.cooldown_active(&key, now, cooldown))
        {
            return TriggerOutcome::CoolingDown;
        }

        let position = transform.translation;
        let velocity = projectile.velocity;
        let sample = CrossingSample {
            prev_dist: projectile
                .transit
                .as_ref()
                .and_then(|stamp| stamp.signed_distance(&key))
                .unwrap_or(0.0),
            cur_dist: geometry.plane.signed_distance(position),
            dot: inward_cosine(velocity, geometry.plane.inward),
        };

        let Some(reason) =
            sample.acceptance(entrance.min_enter_dot, self.settings.safety.inside_epsilon)
        else {
            projectile.transit_mut().remember_distance(&key, sample.cur_dist);
            return TriggerOutcome::Rejected {
                signed_distance: sample.cur_dist,
            };
        };

        let redirect = compute_redirect(&self.settings.redirect, &exit, position, velocity);
        transform.translation = redirect.position;
        projectile.redirect(transform, redirect.velocity);

        let stamp = projectile.transit_mut();
        stamp.record_teleport(key.clone(), now);
        stamp.remember_distance(&key, geometry.plane.signed_distance(redirect.position));

        TriggerOutcome::Teleported(Teleport {
            key,
            reason,
            position: redirect.position,
            velocity: redirect.velocity,
        })
    }

    pub fn rotation_state(&self) -> RotationState {
        if self.rotation.is_some() {
            RotationState::Rotating
        } else {
            RotationState::Idle
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation.is_some()
    }

    /// TriggerRotateCW: false если поворот уже идёт
    pub fn trigger_rotate_cw(&mut self, transform: &Transform, pivot_world: Vec3) -> bool {
        if self.rotation.is_some() {
            return false;
        }
        self.rotation = Some(QuarterTurn::new(
            *transform,
            pivot_world,
            self.settings.rotation.duration_secs,
        ));
        true
    }

    pub fn advance_rotation(&mut self, transform: &mut Transform, dt: f32) -> RotationProgress {
        let Some(turn) = self.rotation.as_mut() else {
            return RotationProgress::Idle;
        };

        if turn.advance(transform, dt) {
            self.rotation = None;
            RotationProgress::Finished
        } else {
            RotationProgress::Turning {
                rotated_degrees: turn.rotated_degrees(),
            }
        }
    }
}
