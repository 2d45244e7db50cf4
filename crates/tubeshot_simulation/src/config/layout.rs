//! Level layout (JSON): tube'ы, стены, враги, launcher
//!
//! Координаты хранятся как `[f32; 3]`, поворот tube'а только вокруг Y.
//! Entrance/exit/борта задаются в локальных координатах tube'а.

use std::fmt;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ProjectileConfig, TubeSettings};
use crate::physics::collision;
use crate::projectile::SurfaceTag;
use crate::tube::{Entrance, Tube};

/// Встроенный демо-уровень
pub const DEMO_LEVEL_JSON: &str = include_str!("../../assets/demo_level.json");

#[derive(Debug)]
pub enum LayoutError {
    Parse(serde_json::Error),
    InvalidTube { tube: String, reason: String },
    InvalidEntrance { tube: String, entrance: String, reason: String },
    InvalidProjectile(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Parse(err) => write!(f, "level layout parse error: {}", err),
            LayoutError::InvalidTube { tube, reason } => {
                write!(f, "tube '{}': {}", tube, reason)
            }
            LayoutError::InvalidEntrance { tube, entrance, reason } => {
                write!(f, "tube '{}' entrance '{}': {}", tube, entrance, reason)
            }
            LayoutError::InvalidProjectile(reason) => write!(f, "projectile config: {}", reason),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayoutError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(err: serde_json::Error) -> Self {
        LayoutError::Parse(err)
    }
}

fn default_sensor_half_extents() -> [f32; 3] {
    [0.4, 0.4, 0.4]
}

fn default_inward() -> [f32; 3] {
    [0.0, 0.0, -1.0]
}

fn default_forward() -> [f32; 3] {
    [0.0, 0.0, -1.0]
}

fn default_min_enter_dot() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntranceLayout {
    #[serde(default)]
    pub name: String,
    pub sensor_offset: [f32; 3],
    #[serde(default = "default_sensor_half_extents")]
    pub sensor_half_extents: [f32; 3],
    /// Смещение box'а sensor'а от его entity (локально)
    #[serde(default)]
    pub sensor_center: [f32; 3],
    #[serde(default)]
    pub sensor_yaw_degrees: f32,
    /// None → entrance без exit (выключен, только диагностика)
    #[serde(default)]
    pub exit_offset: Option<[f32; 3]>,
    #[serde(default = "default_forward")]
    pub exit_forward: [f32; 3],
    #[serde(default = "default_inward")]
    pub local_inward: [f32; 3],
    #[serde(default = "default_min_enter_dot")]
    pub min_enter_dot: f32,
}

/// Solid борт tube'а
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeSideLayout {
    pub offset: [f32; 3],
    pub half_extents: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeLayout {
    /// Пустой → выводится из Entity
    #[serde(default)]
    pub id: String,
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_degrees: f32,
    /// World позиция pivot'а (отдельный root entity)
    #[serde(default)]
    pub pivot: Option<[f32; 3]>,
    #[serde(default)]
    pub settings: TubeSettings,
    #[serde(default)]
    pub sides: Vec<TubeSideLayout>,
    pub entrances: Vec<EntranceLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallLayout {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyLayout {
    #[serde(default)]
    pub name: String,
    pub position: [f32; 3],
    pub radius: f32,
}

/// Откуда и как стреляет демо launcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherLayout {
    pub position: [f32; 3],
    pub direction: [f32; 3],
    /// m/s
    pub speed: f32,
    pub shots: u32,
    pub interval_secs: f32,
    /// Случайный разброс по yaw (градусы, ±)
    pub spread_degrees: f32,
}

impl Default for LauncherLayout {
    fn default() -> Self {
        Self {
            position: [0.0, 0.5, 10.0],
            direction: [0.0, 0.0, -1.0],
            speed: 40.0,
            shots: 10,
            interval_secs: 0.5,
            spread_degrees: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelLayout {
    pub name: String,
    pub tubes: Vec<TubeLayout>,
    pub walls: Vec<WallLayout>,
    pub enemies: Vec<EnemyLayout>,
    pub launcher: LauncherLayout,
    pub projectile: ProjectileConfig,
}

impl LevelLayout {
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let layout: LevelLayout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn demo() -> Result<Self, LayoutError> {
        Self::from_json(DEMO_LEVEL_JSON)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        self.projectile
            .validate()
            .map_err(LayoutError::InvalidProjectile)?;

        for tube in &self.tubes {
            tube.settings.validate().map_err(|reason| LayoutError::InvalidTube {
                tube: tube.id.clone(),
                reason,
            })?;

            for entrance in &tube.entrances {
                let invalid = |reason: &str| LayoutError::InvalidEntrance {
                    tube: tube.id.clone(),
                    entrance: entrance.name.clone(),
                    reason: reason.to_string(),
                };

                if !(0.0..=1.0).contains(&entrance.min_enter_dot) {
                    return Err(invalid("min_enter_dot must be in [0, 1]"));
                }
                if Vec3::from_array(entrance.local_inward).length_squared() < 1e-6 {
                    return Err(invalid("local_inward must be non-zero"));
                }
                if entrance.exit_offset.is_some() {
                    let forward = Vec3::from_array(entrance.exit_forward);
                    if forward.length_squared() < 1e-6 {
                        return Err(invalid("exit_forward must be non-zero"));
                    }
                    // Плоский redirect обнулил бы вертикальный forward
                    if tube.settings.redirect.clamp_to_xz && forward.xz().length_squared() < 1e-6 {
                        return Err(invalid("exit_forward must have a horizontal part when clamp_to_xz is set"));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Что было создано spawn_level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnedLevel {
    pub tubes: Vec<Entity>,
    pub pivots: Vec<Entity>,
    pub walls: Vec<Entity>,
    pub enemies: Vec<Entity>,
}

/// Box sensor'а; смещённый box собирается как compound
fn sensor_collider(half_extents: [f32; 3], center: Vec3) -> Collider {
    let [hx, hy, hz] = half_extents;
    if center == Vec3::ZERO {
        Collider::cuboid(hx, hy, hz)
    } else {
        Collider::compound(vec![(center, Quat::IDENTITY, Collider::cuboid(hx, hy, hz))])
    }
}

fn yaw(degrees: f32) -> Quat {
    Quat::from_rotation_y(degrees.to_radians())
}

/// Spawn уровня через Commands
///
/// Tube: root entity, его children это sensor'ы, exit'ы и борта.
/// Tube компонент вставляется последним, setup (relay, диагностика) в PreUpdate.
pub fn spawn_level(commands: &mut Commands, layout: &LevelLayout) -> SpawnedLevel {
    let mut spawned = SpawnedLevel::default();

    for tube_layout in &layout.tubes {
        let tube_entity = commands
            .spawn((
                Name::new(format!("Tube {}", tube_layout.id)),
                Transform::from_translation(Vec3::from_array(tube_layout.position))
                    .with_rotation(yaw(tube_layout.yaw_degrees)),
            ))
            .id();

        for side in &tube_layout.sides {
            let [hx, hy, hz] = side.half_extents;
            commands.spawn((
                Transform::from_translation(Vec3::from_array(side.offset)),
                Collider::cuboid(hx, hy, hz),
                SurfaceTag::TubeSide,
                collision::environment_groups(),
                ChildOf(tube_entity),
            ));
        }

        let mut entrances = Vec::with_capacity(tube_layout.entrances.len());
        for entrance_layout in &tube_layout.entrances {
            let sensor_center = Vec3::from_array(entrance_layout.sensor_center);
            let sensor = commands
                .spawn((
                    Name::new(format!("Entrance {}", entrance_layout.name)),
                    Transform::from_translation(Vec3::from_array(entrance_layout.sensor_offset))
                        .with_rotation(yaw(entrance_layout.sensor_yaw_degrees)),
                    sensor_collider(entrance_layout.sensor_half_extents, sensor_center),
                    Sensor,
                    ActiveEvents::COLLISION_EVENTS,
                    collision::tube_sensor_groups(),
                    ChildOf(tube_entity),
                ))
                .id();

            let mut entrance = Entrance::new(entrance_layout.name.clone())
                .with_sensor(sensor)
                .with_sensor_center(sensor_center)
                .with_local_inward(Vec3::from_array(entrance_layout.local_inward))
                .with_min_enter_dot(entrance_layout.min_enter_dot);

            if let Some(offset) = entrance_layout.exit_offset {
                let exit = commands
                    .spawn((
                        Transform::from_translation(Vec3::from_array(offset))
                            .looking_to(Vec3::from_array(entrance_layout.exit_forward), Vec3::Y),
                        ChildOf(tube_entity),
                    ))
                    .id();
                entrance = entrance.with_exit(exit);
            }

            entrances.push(entrance);
        }

        let mut tube = Tube::new(tube_layout.id.clone(), entrances, tube_layout.settings);
        if let Some(pivot_position) = tube_layout.pivot {
            // Pivot не должен быть child tube'а (иначе крутится вместе с ним)
            let pivot = commands
                .spawn((
                    Name::new(format!("Pivot {}", tube_layout.id)),
                    Transform::from_translation(Vec3::from_array(pivot_position)),
                ))
                .id();
            tube = tube.with_pivot(pivot);
            spawned.pivots.push(pivot);
        }

        commands.entity(tube_entity).insert(tube);
        spawned.tubes.push(tube_entity);
    }

    for wall in &layout.walls {
        let [hx, hy, hz] = wall.half_extents;
        let entity = commands
            .spawn((
                Transform::from_translation(Vec3::from_array(wall.position)),
                Collider::cuboid(hx, hy, hz),
                SurfaceTag::Wall,
                collision::environment_groups(),
            ))
            .id();
        spawned.walls.push(entity);
    }

    for enemy in &layout.enemies {
        let entity = commands
            .spawn((
                Name::new(format!("Enemy {}", enemy.name)),
                Transform::from_translation(Vec3::from_array(enemy.position)),
                Collider::ball(enemy.radius),
                SurfaceTag::Enemy,
                collision::enemy_groups(),
            ))
            .id();
        spawned.enemies.push(entity);
    }

    spawned
}
