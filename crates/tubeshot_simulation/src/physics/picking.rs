//! Pointer picking: клик по геометрии tube → RotateTubeRequest
//!
//! Ray cast по всем слоям, sensor'ы включены. Попадание засчитывается,
//! если collider лежит в иерархии tube'а.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::hierarchy::find_in_ancestors;
use crate::logger;
use crate::tube::{RotateTubeRequest, Tube};

/// Максимальная дистанция ray cast'а (метры)
pub const PICK_MAX_DISTANCE: f32 = 500.0;

/// Нажатие указателя в world space (камера → луч считается снаружи)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct PointerPressed {
    pub origin: Vec3,
    pub direction: Vec3,
}

pub fn pick_tubes_with_pointer(
    mut presses: EventReader<PointerPressed>,
    rapier: ReadRapierContext,
    tubes: Query<(), With<Tube>>,
    parents: Query<&ChildOf>,
    mut requests: EventWriter<RotateTubeRequest>,
) {
    let Ok(context) = rapier.single() else {
        presses.clear();
        return;
    };

    for press in presses.read() {
        let direction = press.direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            continue;
        }

        let Some((hit, distance)) = context.cast_ray(
            press.origin,
            direction,
            PICK_MAX_DISTANCE,
            true,
            QueryFilter::default(),
        ) else {
            continue;
        };

        let Some((tube, _)) = find_in_ancestors(hit, &parents, |entity| tubes.contains(entity).then_some(())) else {
            continue;
        };

        logger::log(&format!("Pointer hit {:?} at {:.2}m → rotate tube {:?}", hit, distance, tube));
        requests.write(RotateTubeRequest { tube });
    }
}
