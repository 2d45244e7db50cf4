//! Поворот tube на 90° по часовой стрелке (вид сверху)
//!
//! Single-flight: пока идёт поворот, новые запросы игнорируются (без очереди).
//! Поза на каждом тике считается от стартовой позы (start.rotate_around),
//! поэтому накопления ошибки нет, а на финише угол ровно 90°.

use bevy::prelude::*;

use super::components::{RotationProgress, Tube};
use super::events::{RotateTubeRequest, TubeRotationFinished};
use crate::logger;

pub const QUARTER_TURN_DEGREES: f32 = 90.0;

/// Остаток, при котором поворот добивается до ровно 90°
pub const SNAP_TOLERANCE_DEGREES: f32 = 1e-3;

/// Нижний порог длительности (защита от деления на 0)
pub const MIN_ROTATION_DURATION: f32 = 1e-4;

/// Активный поворот (timer/task record, продвигается раз в тик)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarterTurn {
    /// World pivot, зафиксированный на старте
    pivot: Vec3,
    start: Transform,
    /// Градусы в секунду
    rate: f32,
    rotated: f32,
}

impl QuarterTurn {
    pub fn new(start: Transform, pivot: Vec3, duration_secs: f32) -> Self {
        Self {
            pivot,
            start,
            rate: QUARTER_TURN_DEGREES / duration_secs.max(MIN_ROTATION_DURATION),
            rotated: 0.0,
        }
    }

    pub fn rotated_degrees(&self) -> f32 {
        self.rotated
    }

    pub fn remaining_degrees(&self) -> f32 {
        QUARTER_TURN_DEGREES - self.rotated
    }

    pub fn is_complete(&self) -> bool {
        self.rotated >= QUARTER_TURN_DEGREES
    }

    /// Шаг на dt секунд, пишет позу в transform. true = поворот закончен
    pub fn advance(&mut self, transform: &mut Transform, dt: f32) -> bool {
        let step = (self.rate * dt.max(0.0)).min(self.remaining_degrees());
        self.rotated += step;

        if self.remaining_degrees() <= SNAP_TOLERANCE_DEGREES {
            self.rotated = QUARTER_TURN_DEGREES;
        }

        *transform = self.pose_at(self.rotated);
        self.is_complete()
    }

    /// Поза после поворота на `degrees` от старта (CW = отрицательный угол вокруг +Y)
    pub fn pose_at(&self, degrees: f32) -> Transform {
        let mut pose = self.start;
        pose.rotate_around(self.pivot, Quat::from_rotation_y(-degrees.to_radians()));
        pose
    }

    pub fn final_pose(&self) -> Transform {
        self.pose_at(QUARTER_TURN_DEGREES)
    }
}

/// Обработка RotateTubeRequest → старт поворота (если tube Idle)
///
/// Pivot: world позиция pivot entity, либо сам tube.
pub fn start_tube_rotations(
    mut requests: EventReader<RotateTubeRequest>,
    mut tubes: Query<(&mut Tube, &Transform, &GlobalTransform)>,
    pivots: Query<&GlobalTransform>,
) {
    for request in requests.read() {
        let Ok((mut tube, transform, global)) = tubes.get_mut(request.tube) else {
            logger::log(&format!("RotateTubeRequest: {:?} is not a tube", request.tube));
            continue;
        };

        let pivot = tube
            .pivot
            .and_then(|pivot| pivots.get(pivot).ok())
            .map(|pivot| pivot.translation())
            .unwrap_or_else(|| global.translation());

        if tube.trigger_rotate_cw(transform, pivot) {
            logger::log(&format!(
                "Tube {} rotating CW around {:?}",
                tube.id(),
                pivot
            ));
        }
    }
}

/// Продвигает активные повороты (variable tick)
pub fn advance_tube_rotations(
    time: Res<Time>,
    mut tubes: Query<(Entity, &mut Tube, &mut Transform)>,
    mut finished: EventWriter<TubeRotationFinished>,
) {
    let dt = time.delta_secs();

    for (entity, mut tube, mut transform) in tubes.iter_mut() {
        if !tube.is_rotating() {
            continue;
        }

        if tube.advance_rotation(&mut transform, dt) == RotationProgress::Finished {
            logger::log(&format!("Tube {} rotation finished", tube.id()));
            finished.write(TubeRotationFinished { tube: entity });
        }
    }
}
