//! Поиск вверх по иерархии (ChildOf)
//!
//! Collider часто висит на child entity, а тег/owner на родителе.

use bevy::prelude::*;

/// Защита от циклов / слишком глубоких сцен
pub const MAX_HIERARCHY_DEPTH: usize = 32;

/// Первый entity (начиная с `start`), для которого `visit` вернул Some
pub fn find_ancestor<T>(
    start: Entity,
    mut visit: impl FnMut(Entity) -> Option<T>,
    mut parent_of: impl FnMut(Entity) -> Option<Entity>,
) -> Option<(Entity, T)> {
    let mut current = start;

    for _ in 0..MAX_HIERARCHY_DEPTH {
        if let Some(found) = visit(current) {
            return Some((current, found));
        }
        current = parent_of(current)?;
    }

    None
}

/// find_ancestor поверх Query<&ChildOf>
pub fn find_in_ancestors<T>(
    start: Entity,
    parents: &Query<&ChildOf>,
    visit: impl FnMut(Entity) -> Option<T>,
) -> Option<(Entity, T)> {
    find_ancestor(start, visit, |entity| {
        parents.get(entity).ok().map(|child_of| child_of.parent())
    })
}
