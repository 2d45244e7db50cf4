//! Rapier → core события
//!
//! - CollisionEvent::Started с sensor'ом entrance → EntranceTriggered(Began)
//! - пока пара пересекается → EntranceTriggered(Continuing) каждый fixed тик
//! - Started без sensor флага с projectile'ом → ProjectileContact
//!
//! Rapier шлёт только начало/конец пересечения, "continuing" синтезируем сами.

use std::collections::BTreeSet;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use bevy_rapier3d::rapier::prelude::CollisionEventFlags;

use crate::projectile::{Projectile, ProjectileContact};
use crate::tube::{EntranceTrigger, EntranceTriggered, OverlapPhase};

/// Пары (sensor, body), которые сейчас пересекаются
///
/// BTreeSet → детерминированный порядок Continuing событий.
#[derive(Resource, Debug, Default)]
pub struct OverlapTracker {
    pairs: BTreeSet<(Entity, Entity)>,
}

impl OverlapTracker {
    /// true если пара новая
    pub fn begin(&mut self, sensor: Entity, body: Entity) -> bool {
        self.pairs.insert((sensor, body))
    }

    pub fn end(&mut self, sensor: Entity, body: Entity) -> bool {
        self.pairs.remove(&(sensor, body))
    }

    pub fn contains(&self, sensor: Entity, body: Entity) -> bool {
        self.pairs.contains(&(sensor, body))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(Entity, Entity) -> bool) {
        self.pairs.retain(|(sensor, body)| keep(*sensor, *body));
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, Entity)> + '_ {
        self.pairs.iter().copied()
    }
}

/// Какая из двух сторон sensor entrance, а какая тело
fn entrance_pair(
    a: Entity,
    b: Entity,
    triggers: &Query<&EntranceTrigger>,
) -> Option<(Entity, EntranceTrigger, Entity)> {
    if let Ok(trigger) = triggers.get(a) {
        return Some((a, *trigger, b));
    }
    if let Ok(trigger) = triggers.get(b) {
        return Some((b, *trigger, a));
    }
    None
}

/// Continuing для пар, пересекавшихся на прошлом тике
///
/// Запускается ДО relay_collision_events, чтобы новая пара получила только Began.
pub fn emit_continuing_overlaps(
    mut tracker: ResMut<OverlapTracker>,
    triggers: Query<&EntranceTrigger>,
    alive: Query<()>,
    mut entrance_events: EventWriter<EntranceTriggered>,
) {
    if tracker.is_empty() {
        return;
    }

    // Despawn'нутые тела / sensor'ы без relay больше не отслеживаем
    tracker.retain(|sensor, body| triggers.contains(sensor) && alive.contains(body));

    for (sensor, body) in tracker.iter() {
        let Ok(trigger) = triggers.get(sensor) else {
            continue;
        };
        entrance_events.write(EntranceTriggered {
            tube: trigger.owner,
            entrance_index: trigger.index,
            sensor,
            body,
            phase: OverlapPhase::Continuing,
        });
    }
}

pub fn relay_collision_events(
    mut collisions: EventReader<CollisionEvent>,
    mut tracker: ResMut<OverlapTracker>,
    triggers: Query<&EntranceTrigger>,
    projectiles: Query<(), With<Projectile>>,
    mut entrance_events: EventWriter<EntranceTriggered>,
    mut contacts: EventWriter<ProjectileContact>,
) {
    for event in collisions.read() {
        match event {
            CollisionEvent::Started(a, b, flags) => {
                if let Some((sensor, trigger, body)) = entrance_pair(*a, *b, &triggers) {
                    if tracker.begin(sensor, body) {
                        entrance_events.write(EntranceTriggered {
                            tube: trigger.owner,
                            entrance_index: trigger.index,
                            sensor,
                            body,
                            phase: OverlapPhase::Began,
                        });
                    }
                    continue;
                }

                // Sensor без relay (не entrance) не считается solid контактом
                if flags.contains(CollisionEventFlags::SENSOR) {
                    continue;
                }

                for (projectile, other) in [(*a, *b), (*b, *a)] {
                    if projectiles.contains(projectile) {
                        contacts.write(ProjectileContact { projectile, other });
                    }
                }
            }
            CollisionEvent::Stopped(a, b, _) => {
                if let Some((sensor, _, body)) = entrance_pair(*a, *b, &triggers) {
                    tracker.end(sensor, body);
                }
            }
        }
    }
}
