//! Projectile системы: lifetime, terminal contacts, alignment, lifecycle tracking

use bevy::prelude::*;

use super::components::{align_to_velocity, ActiveProjectiles, Projectile, SurfaceTag};
use super::events::{DestroyCause, EnemyHit, ProjectileContact, ProjectileDestroyed, ProjectileSpawned};
use crate::config::{ContactPolicy, ProjectileConfig};
use crate::hierarchy::find_in_ancestors;
use crate::logger;

/// Реакция на solid контакт
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactResponse {
    HitEnemy,
    Destroy,
    PassThrough,
}

/// Enemy → hit + destroy; Wall/TubeSide → destroy; без тега → по политике
pub fn classify_contact(tag: Option<SurfaceTag>, policy: ContactPolicy) -> ContactResponse {
    match (tag, policy) {
        (Some(SurfaceTag::Enemy), _) => ContactResponse::HitEnemy,
        (Some(SurfaceTag::Wall | SurfaceTag::TubeSide), _) => ContactResponse::Destroy,
        (None, ContactPolicy::Destroy) => ContactResponse::Destroy,
        (None, ContactPolicy::Ignore) => ContactResponse::PassThrough,
    }
}

/// Идемпотентное уничтожение: despawn + событие только на первом вызове
pub fn destroy_projectile(
    commands: &mut Commands,
    entity: Entity,
    projectile: &mut Projectile,
    cause: DestroyCause,
    destroyed: &mut EventWriter<ProjectileDestroyed>,
) -> bool {
    if !projectile.mark_destroyed() {
        return false;
    }

    commands.entity(entity).despawn();
    destroyed.write(ProjectileDestroyed {
        projectile: entity,
        cause,
    });
    true
}

/// Lifetime countdown (fixed tick)
pub fn tick_projectile_lifetimes(
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Projectile)>,
    mut destroyed: EventWriter<ProjectileDestroyed>,
    time: Res<Time>,
) {
    let delta = time.delta();

    for (entity, mut projectile) in projectiles.iter_mut() {
        if !projectile.is_alive() {
            continue;
        }

        if projectile.tick_lifetime(delta) {
            logger::log(&format!("Projectile {:?} expired", entity));
            destroy_projectile(&mut commands, entity, &mut projectile, DestroyCause::Expired, &mut destroyed);
        }
    }
}

/// Terminal collision handling
///
/// SurfaceTag ищется вверх по иерархии от collider'а.
pub fn handle_projectile_contacts(
    mut commands: Commands,
    mut contacts: EventReader<ProjectileContact>,
    mut projectiles: Query<&mut Projectile>,
    tags: Query<&SurfaceTag>,
    parents: Query<&ChildOf>,
    config: Res<ProjectileConfig>,
    mut hits: EventWriter<EnemyHit>,
    mut destroyed: EventWriter<ProjectileDestroyed>,
) {
    for contact in contacts.read() {
        let Ok(mut projectile) = projectiles.get_mut(contact.projectile) else {
            continue;
        };
        if !projectile.is_alive() {
            continue;
        }

        let tagged = find_in_ancestors(contact.other, &parents, |entity| tags.get(entity).ok().copied());
        let response = classify_contact(tagged.map(|(_, tag)| tag), config.unmatched_contact);

        match response {
            ContactResponse::HitEnemy => {
                let enemy = tagged.map(|(entity, _)| entity).unwrap_or(contact.other);
                hits.write(EnemyHit {
                    enemy,
                    projectile: contact.projectile,
                });
                logger::log(&format!("Projectile {:?} hit enemy {:?}", contact.projectile, enemy));
                destroy_projectile(
                    &mut commands,
                    contact.projectile,
                    &mut projectile,
                    DestroyCause::HitEnemy,
                    &mut destroyed,
                );
            }
            ContactResponse::Destroy => {
                destroy_projectile(
                    &mut commands,
                    contact.projectile,
                    &mut projectile,
                    DestroyCause::Obstacle,
                    &mut destroyed,
                );
            }
            ContactResponse::PassThrough => {}
        }
    }
}

/// Ориентация вдоль velocity, каждый fixed тик
pub fn align_projectiles(mut projectiles: Query<(&Projectile, &mut Transform)>) {
    for (projectile, mut transform) in projectiles.iter_mut() {
        if projectile.is_alive() {
            align_to_velocity(&mut transform, projectile.velocity);
        }
    }
}

/// Запоминает projectile'ы, чьё уничтожение уже объявлено destroy_projectile
pub fn note_reported_destructions(
    mut destroyed: EventReader<ProjectileDestroyed>,
    mut active: ResMut<ActiveProjectiles>,
) {
    for event in destroyed.read() {
        // Despawned шлёт сам tracker, entity к этому моменту уже снят
        if event.cause != DestroyCause::Despawned {
            active.mark_reported(event.projectile);
        }
    }
}

/// Active count + ProjectileSpawned / ProjectileDestroyed
///
/// Считает по Added/RemovedComponents, поэтому despawn из любого места
/// тоже уменьшает счётчик. Если despawn прошёл мимо destroy_projectile,
/// ProjectileDestroyed(Despawned) шлём здесь: счётчик и событие всегда парные.
pub fn track_projectile_lifecycle(
    spawned: Query<Entity, Added<Projectile>>,
    mut removed: RemovedComponents<Projectile>,
    mut active: ResMut<ActiveProjectiles>,
    mut spawned_events: EventWriter<ProjectileSpawned>,
    mut destroyed_events: EventWriter<ProjectileDestroyed>,
) {
    for entity in spawned.iter() {
        if active.register(entity) {
            spawned_events.write(ProjectileSpawned { projectile: entity });
        }
    }

    for entity in removed.read() {
        let reported = active.take_reported(entity);
        if active.unregister(entity) && !reported {
            logger::log(&format!("Projectile {:?} despawned externally", entity));
            destroyed_events.write(ProjectileDestroyed {
                projectile: entity,
                cause: DestroyCause::Despawned,
            });
        }
    }
}
