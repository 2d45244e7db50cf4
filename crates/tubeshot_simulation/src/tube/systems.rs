//! Tube handler: EntranceTriggered → Tube::handle_entrance_trigger
//!
//! Строго последовательная обработка событий в одном system'е,
//! поэтому TransitStamp одного projectile'а никогда не трогают два handler'а сразу.

use bevy::prelude::*;

use super::components::{EntranceGeometry, TriggerOutcome, Tube};
use super::events::{EntranceTriggered, ProjectileTeleported};
use super::suppression::SuppressedPairs;
use crate::logger;
use crate::projectile::Projectile;

pub fn handle_entrance_triggers(
    mut triggers: EventReader<EntranceTriggered>,
    tubes: Query<&Tube>,
    globals: Query<&GlobalTransform>,
    mut projectiles: Query<(&mut Projectile, &mut Transform)>,
    mut suppressed: ResMut<SuppressedPairs>,
    mut teleported: EventWriter<ProjectileTeleported>,
    time: Res<Time>,
) {
    let now = time.elapsed_secs();

    for trigger in triggers.read() {
        if suppressed.is_suppressed(trigger.body, trigger.sensor) {
            continue;
        }

        let Ok(tube) = tubes.get(trigger.tube) else {
            continue;
        };

        // Не projectile (enemy, props внутри sensor'а) → не наше дело
        let Ok((mut projectile, mut transform)) = projectiles.get_mut(trigger.body) else {
            continue;
        };
        if !projectile.is_alive() {
            continue;
        }

        let Some(entrance) = tube.entrance(trigger.entrance_index) else {
            logger::log_warning(&format!(
                "Tube {}: entrance index {} out of range ({} entrances)",
                tube.id(),
                trigger.entrance_index,
                tube.entrances().len()
            ));
            continue;
        };

        let Some(sensor_global) = entrance.sensor.and_then(|sensor| globals.get(sensor).ok()) else {
            continue;
        };
        let exit_global = entrance.exit.and_then(|exit| globals.get(exit).ok());
        let geometry = EntranceGeometry::resolve(entrance, sensor_global, exit_global);

        let outcome = tube.handle_entrance_trigger(
            trigger.tube,
            trigger.entrance_index,
            &geometry,
            &mut projectile,
            &mut transform,
            now,
        );

        if let TriggerOutcome::Teleported(teleport) = outcome {
            suppressed.suppress(
                trigger.body,
                trigger.sensor,
                tube.settings.safety.per_entrance_cooldown,
            );

            logger::log(&format!(
                "Projectile {:?} → {} ({:?}), exit {:?}, speed {:.2}",
                trigger.body,
                teleport.key,
                teleport.reason,
                teleport.position,
                teleport.velocity.length()
            ));

            teleported.write(ProjectileTeleported {
                projectile: trigger.body,
                tube: trigger.tube,
                entrance_index: trigger.entrance_index,
                reason: teleport.reason,
                position: teleport.position,
                velocity: teleport.velocity,
            });
        }
    }
}
