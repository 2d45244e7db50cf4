//! Entrance crossing detection
//!
//! Overlap события дискретны по кадрам, быстрый тонкий projectile может
//! "проскочить" sensor. Поэтому вход принимается по OR трёх предикатов:
//! 1. crossed_from_outside: знак signed distance сменился между тиками
//! 2. deep_inside: projectile уже глубоко за плоскостью входа
//! 3. moving_inward: летит внутрь и уже на/за плоскостью
//!
//! Signed distance: > 0 снаружи (ещё не дошёл до плоскости), < 0 внутри.

use bevy::prelude::*;

/// Порог квадрата скорости, ниже которого направление считаем "правильным" (dot = 1)
pub const SPEED_EPSILON_SQ: f32 = 1e-6;

/// Плоскость входа: центр sensor'а + inward направление в world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrancePlane {
    pub center: Vec3,
    /// Unit vector "внутрь tube"
    pub inward: Vec3,
}

impl EntrancePlane {
    pub fn new(center: Vec3, inward: Vec3) -> Self {
        Self {
            center,
            inward: inward.normalize_or_zero(),
        }
    }

    /// Положительная снаружи, отрицательная за плоскостью входа
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        (self.center - point).dot(self.inward)
    }
}

/// Косинус между направлением полёта и inward
///
/// Почти неподвижный projectile считается направленным правильно.
pub fn inward_cosine(velocity: Vec3, inward: Vec3) -> f32 {
    if velocity.length_squared() < SPEED_EPSILON_SQ {
        return 1.0;
    }
    velocity.normalize().dot(inward)
}

/// Почему вход принят (первый сработавший предикат)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    CrossedFromOutside,
    DeepInside,
    MovingInward,
}

/// Один geometric sample для пары (projectile, entrance)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingSample {
    /// Из TransitStamp; 0.0 если entrance видим впервые
    pub prev_dist: f32,
    pub cur_dist: f32,
    pub dot: f32,
}

impl CrossingSample {
    pub fn crossed_from_outside(&self) -> bool {
        self.prev_dist > 0.0 && self.cur_dist <= 0.0
    }

    pub fn deep_inside(&self, inside_epsilon: f32) -> bool {
        self.cur_dist <= -inside_epsilon
    }

    pub fn moving_inward(&self, min_enter_dot: f32) -> bool {
        self.dot >= min_enter_dot && self.cur_dist <= 0.0
    }

    /// None = reject
    pub fn acceptance(&self, min_enter_dot: f32, inside_epsilon: f32) -> Option<AcceptReason> {
        if self.crossed_from_outside() {
            Some(AcceptReason::CrossedFromOutside)
        } else if self.deep_inside(inside_epsilon) {
            Some(AcceptReason::DeepInside)
        } else if self.moving_inward(min_enter_dot) {
            Some(AcceptReason::MovingInward)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_accepted_for_any_dot() {
        for dot in [-1.0, -0.3, 0.0, 0.2, 1.0] {
            let sample = CrossingSample { prev_dist: 0.5, cur_dist: -0.1, dot };
            assert_eq!(
                sample.acceptance(0.35, 0.03),
                Some(AcceptReason::CrossedFromOutside),
                "dot = {}",
                dot
            );
        }
    }

    #[test]
    fn test_directional_rejection() {
        let sample = CrossingSample { prev_dist: -0.1, cur_dist: -0.01, dot: 0.2 };
        assert_eq!(sample.acceptance(0.35, 0.03), None);
    }

    #[test]
    fn test_deep_inside_without_crossing() {
        // Пропущенные кадры: первый sample уже глубоко внутри
        let sample = CrossingSample { prev_dist: 0.0, cur_dist: -0.2, dot: -1.0 };
        assert_eq!(sample.acceptance(0.5, 0.03), Some(AcceptReason::DeepInside));
    }

    #[test]
    fn test_moving_inward_at_plane() {
        let sample = CrossingSample { prev_dist: 0.0, cur_dist: 0.0, dot: 0.9 };
        assert_eq!(sample.acceptance(0.5, 0.03), Some(AcceptReason::MovingInward));
    }

    #[test]
    fn test_outside_rejected_even_when_aimed() {
        let sample = CrossingSample { prev_dist: 0.0, cur_dist: 0.4, dot: 1.0 };
        assert_eq!(sample.acceptance(0.5, 0.03), None);
    }

    #[test]
    fn test_signed_distance_sign_convention() {
        let plane = EntrancePlane::new(Vec3::ZERO, Vec3::NEG_Z * 3.0);

        // Ещё не дошли (z > 0 при inward = -Z) → снаружи
        assert!((plane.signed_distance(Vec3::new(0.0, 0.0, 0.5)) - 0.5).abs() < 1e-6);
        // Прошли плоскость → внутри
        assert!((plane.signed_distance(Vec3::new(0.0, 0.0, -0.2)) + 0.2).abs() < 1e-6);
        // Смещение вдоль плоскости не влияет
        assert!(plane.signed_distance(Vec3::new(5.0, 1.0, 0.0)).abs() < 1e-6);
    }

    #[test]
    fn test_inward_cosine_near_zero_speed() {
        assert_eq!(inward_cosine(Vec3::splat(1e-5), Vec3::Z), 1.0);
        assert!((inward_cosine(Vec3::new(0.0, 0.0, 40.0), Vec3::Z) - 1.0).abs() < 1e-6);
        assert!((inward_cosine(Vec3::new(40.0, 0.0, 0.0), Vec3::Z)).abs() < 1e-6);
    }
}
