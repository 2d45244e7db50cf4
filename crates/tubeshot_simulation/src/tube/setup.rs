//! Setup нового tube: id, EntranceTrigger relay на sensor'ах, диагностика
//!
//! Проблемы конфигурации только логируются (warning), игра продолжается.
//! Entrance без exit просто никогда не срабатывает.

use std::fmt;

use bevy::prelude::*;
use bevy_rapier3d::prelude::Sensor;

use super::components::{EntranceTrigger, Tube};
use crate::logger;

/// Что известно о sensor entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    /// Overlap-only (есть Sensor marker)
    Overlap,
    /// Collider без Sensor marker, будет блокировать движение
    Solid,
    /// Entity не существует
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupDiagnostic {
    NoEntrances { tube: String },
    MissingSensor { tube: String, entrance: String },
    MissingExit { tube: String, entrance: String },
    SensorNotFound { tube: String, entrance: String, sensor: Entity },
    SolidSensor { tube: String, entrance: String, sensor: Entity },
}

impl fmt::Display for SetupDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupDiagnostic::NoEntrances { tube } => {
                write!(f, "tube '{}' has no entrances", tube)
            }
            SetupDiagnostic::MissingSensor { tube, entrance } => {
                write!(f, "tube '{}' entrance '{}' has no sensor volume", tube, entrance)
            }
            SetupDiagnostic::MissingExit { tube, entrance } => {
                write!(f, "tube '{}' entrance '{}' has no exit pose (disabled)", tube, entrance)
            }
            SetupDiagnostic::SensorNotFound { tube, entrance, sensor } => {
                write!(f, "tube '{}' entrance '{}' sensor {:?} does not exist", tube, entrance, sensor)
            }
            SetupDiagnostic::SolidSensor { tube, entrance, sensor } => {
                write!(
                    f,
                    "tube '{}' entrance '{}' sensor {:?} is solid (must be overlap-only)",
                    tube, entrance, sensor
                )
            }
        }
    }
}

/// Проверка конфигурации tube
pub fn diagnose_tube(tube: &Tube, sensor_status: impl Fn(Entity) -> SensorStatus) -> Vec<SetupDiagnostic> {
    let mut diagnostics = Vec::new();
    let tube_id = tube.id().to_string();

    if tube.entrances().is_empty() {
        diagnostics.push(SetupDiagnostic::NoEntrances { tube: tube_id });
        return diagnostics;
    }

    for entrance in tube.entrances() {
        let name = entrance.name.clone();

        match entrance.sensor {
            None => diagnostics.push(SetupDiagnostic::MissingSensor {
                tube: tube_id.clone(),
                entrance: name.clone(),
            }),
            Some(sensor) => match sensor_status(sensor) {
                SensorStatus::Overlap => {}
                SensorStatus::Solid => diagnostics.push(SetupDiagnostic::SolidSensor {
                    tube: tube_id.clone(),
                    entrance: name.clone(),
                    sensor,
                }),
                SensorStatus::Missing => diagnostics.push(SetupDiagnostic::SensorNotFound {
                    tube: tube_id.clone(),
                    entrance: name.clone(),
                    sensor,
                }),
            },
        }

        if entrance.exit.is_none() {
            diagnostics.push(SetupDiagnostic::MissingExit {
                tube: tube_id.clone(),
                entrance: name,
            });
        }
    }

    diagnostics
}

/// PreUpdate: новые tube'ы получают id и relay на sensor'ах
pub fn setup_new_tubes(
    mut commands: Commands,
    mut tubes: Query<(Entity, &mut Tube), Added<Tube>>,
    sensors: Query<Has<Sensor>>,
) {
    for (entity, mut tube) in tubes.iter_mut() {
        tube.ensure_id(entity);

        let diagnostics = diagnose_tube(&tube, |sensor| match sensors.get(sensor) {
            Ok(true) => SensorStatus::Overlap,
            Ok(false) => SensorStatus::Solid,
            Err(_) => SensorStatus::Missing,
        });
        for diagnostic in &diagnostics {
            logger::log_warning(&format!("Tube setup: {}", diagnostic));
        }

        for (index, entrance) in tube.entrances().iter().enumerate() {
            let Some(sensor) = entrance.sensor else {
                continue;
            };
            if let Ok(mut sensor_commands) = commands.get_entity(sensor) {
                sensor_commands.insert(EntranceTrigger { owner: entity, index });
            }
        }

        logger::log_info(&format!(
            "Tube {} ready: {} entrances, {} diagnostics",
            tube.id(),
            tube.entrances().len(),
            diagnostics.len()
        ));
    }
}
