//! Tube integration test
//!
//! Полный ECS pipeline без Rapier: события overlap'а пишем в мир напрямую.
//!
//! Проверяем:
//! - Basic transit (позиция, скорость, TransitStamp, ProjectileTeleported)
//! - Blocked re-entry + suppression пары
//! - Независимость entrance'ов одного tube
//! - Поворот ровно на 90° и single-flight
//! - Setup: relay на sensor'ах, диагностика не блокирует

use bevy::ecs::schedule::{LogLevel as AmbiguityLevel, ScheduleBuildSettings};
use bevy::prelude::*;
use bevy_rapier3d::prelude::Sensor;
use tubeshot_simulation::tube::SuppressedPairs;
use tubeshot_simulation::*;

struct TubeRig {
    tube: Entity,
    sensors: Vec<Entity>,
    exits: Vec<Entity>,
}

/// Tube в начале координат: entrance "south" (sensor z=+1, внутрь -Z, exit в (3,0,0) смотрит в +X)
/// и entrance "west" (sensor x=-1, внутрь +X, exit в (0,0,-3) смотрит в -Z)
fn spawn_tube_rig(app: &mut App, pivot: Option<Vec3>) -> TubeRig {
    let world = app.world_mut();
    let tube = world.spawn(Transform::default()).id();

    let south_sensor = world
        .spawn((Transform::from_xyz(0.0, 0.0, 1.0), Sensor, ChildOf(tube)))
        .id();
    let south_exit = world
        .spawn((
            Transform::from_xyz(3.0, 0.0, 0.0).looking_to(Vec3::X, Vec3::Y),
            ChildOf(tube),
        ))
        .id();

    // Sensor без поворота, inward задаём явно (+X)
    let west_sensor = world
        .spawn((Transform::from_xyz(-1.0, 0.0, 0.0), Sensor, ChildOf(tube)))
        .id();
    let west_exit = world
        .spawn((
            Transform::from_xyz(0.0, 0.0, -3.0).looking_to(Vec3::NEG_Z, Vec3::Y),
            ChildOf(tube),
        ))
        .id();

    let entrances = vec![
        Entrance::new("south")
            .with_sensor(south_sensor)
            .with_exit(south_exit)
            .with_min_enter_dot(0.35),
        Entrance::new("west")
            .with_sensor(west_sensor)
            .with_exit(west_exit)
            .with_local_inward(Vec3::X)
            .with_min_enter_dot(0.35),
    ];

    let mut tube_component = Tube::new("tube-a", entrances, TubeSettings::default());
    if let Some(position) = pivot {
        let pivot_entity = world.spawn(Transform::from_translation(position)).id();
        tube_component = tube_component.with_pivot(pivot_entity);
    }
    world.entity_mut(tube).insert(tube_component);

    TubeRig {
        tube,
        sensors: vec![south_sensor, west_sensor],
        exits: vec![south_exit, west_exit],
    }
}

fn spawn_fired_projectile(app: &mut App, position: Vec3, velocity: Vec3) -> Entity {
    let mut transform = Transform::from_translation(position);
    let mut projectile = Projectile::new();
    projectile.fire(&mut transform, velocity, 6.0);
    app.world_mut().spawn((projectile, transform)).id()
}

fn trigger(app: &mut App, rig: &TubeRig, entrance_index: usize, body: Entity, phase: OverlapPhase) {
    app.world_mut().send_event(EntranceTriggered {
        tube: rig.tube,
        entrance_index,
        sensor: rig.sensors[entrance_index],
        body,
        phase,
    });
}

fn teleport_events(app: &App) -> Vec<ProjectileTeleported> {
    let events = app.world().resource::<Events<ProjectileTeleported>>();
    events.get_cursor().read(events).copied().collect()
}

/// Собирает TubeRotationFinished за весь прогон
#[derive(Resource, Default)]
struct FinishedRotations(Vec<Entity>);

fn collect_finished_rotations(
    mut events: EventReader<TubeRotationFinished>,
    mut finished: ResMut<FinishedRotations>,
) {
    finished.0.extend(events.read().map(|event| event.tube));
}

/// Headless app + tube; первый update = setup (без fixed тика)
fn create_tube_app(pivot: Option<Vec3>) -> (App, TubeRig) {
    let mut app = create_headless_app(42);
    let rig = spawn_tube_rig(&mut app, pivot);
    app.update();
    (app, rig)
}

#[test]
fn test_basic_transit() {
    let (mut app, rig) = create_tube_app(None);
    let projectile = spawn_fired_projectile(&mut app, Vec3::new(0.0, 0.0, 0.99), Vec3::new(0.0, 0.0, -40.0));

    trigger(&mut app, &rig, 0, projectile, OverlapPhase::Began);
    app.update();

    let events = teleport_events(&app);
    assert_eq!(events.len(), 1, "Ожидался ровно один телепорт");
    let event = events[0];
    assert_eq!(event.projectile, projectile);
    assert_eq!(event.entrance_index, 0);
    assert!((event.position - Vec3::new(3.05, 0.0, 0.0)).length() < 1e-4, "exit position = {:?}", event.position);
    assert!((event.velocity - Vec3::new(40.0, 0.0, 0.0)).length() < 1e-3);

    let projectile_state = app.world().get::<Projectile>(projectile).unwrap();
    assert!((projectile_state.speed() - 40.0).abs() < 1e-3);
    assert_eq!(projectile_state.velocity.y, 0.0);

    let stamp = projectile_state.transit.as_ref().unwrap();
    assert_eq!(stamp.last_entrance_key.as_ref().unwrap().as_str(), "tube-a#0");
    assert!(stamp.last_time > 0.0);

    // После телепорта projectile продолжил лететь от exit вдоль +X (integrate в том же тике)
    let transform = app.world().get::<Transform>(projectile).unwrap();
    assert!(transform.translation.x > 3.05);
    assert!((transform.forward().as_vec3() - Vec3::X).length() < 1e-4);
}

#[test]
fn test_blocked_reentry_and_suppression() {
    let (mut app, rig) = create_tube_app(None);
    let projectile = spawn_fired_projectile(&mut app, Vec3::new(0.0, 0.0, 0.99), Vec3::new(0.0, 0.0, -40.0));

    trigger(&mut app, &rig, 0, projectile, OverlapPhase::Began);
    app.update();
    assert_eq!(teleport_events(&app).len(), 1);
    assert!(app
        .world()
        .resource::<SuppressedPairs>()
        .is_suppressed(projectile, rig.sensors[0]));

    let stamp_before = app.world().get::<Projectile>(projectile).unwrap().transit.clone();
    let velocity_before = app.world().get::<Projectile>(projectile).unwrap().velocity;

    // Повторный overlap того же entrance сразу после телепорта
    trigger(&mut app, &rig, 0, projectile, OverlapPhase::Continuing);
    app.update();

    let projectile_state = app.world().get::<Projectile>(projectile).unwrap();
    assert_eq!(projectile_state.transit, stamp_before);
    assert_eq!(projectile_state.velocity, velocity_before);

    // Suppression живёт per_entrance_cooldown (0.12s ≈ 8 тиков)
    for _ in 0..10 {
        app.update();
    }
    assert!(app.world().resource::<SuppressedPairs>().is_empty());
}

#[test]
fn test_sibling_entrance_is_independent() {
    let (mut app, rig) = create_tube_app(None);
    let projectile = spawn_fired_projectile(&mut app, Vec3::new(0.0, 0.0, 0.99), Vec3::new(0.0, 0.0, -40.0));

    trigger(&mut app, &rig, 0, projectile, OverlapPhase::Began);
    app.update();

    // Ставим projectile сразу за плоскостью west entrance (inward = +X)
    app.world_mut().get_mut::<Transform>(projectile).unwrap().translation = Vec3::new(-0.9, 0.0, 0.0);
    trigger(&mut app, &rig, 1, projectile, OverlapPhase::Began);
    app.update();

    let events = teleport_events(&app);
    let west = events.iter().find(|event| event.entrance_index == 1);
    let west = west.expect("west entrance не сработал во время cooldown south");
    assert!((west.position - Vec3::new(0.0, 0.0, -3.05)).length() < 1e-4);

    let stamp = app.world().get::<Projectile>(projectile).unwrap().transit.clone().unwrap();
    assert_eq!(stamp.last_entrance_key.as_ref().unwrap().as_str(), "tube-a#1");
    assert_eq!(stamp.tracked_entrances(), 2);
}

#[test]
fn test_events_for_non_projectiles_are_ignored() {
    let (mut app, rig) = create_tube_app(None);
    let prop = app.world_mut().spawn(Transform::from_xyz(0.0, 0.0, 0.99)).id();

    trigger(&mut app, &rig, 0, prop, OverlapPhase::Began);
    app.update();

    assert!(teleport_events(&app).is_empty());
    assert_eq!(
        app.world().get::<Transform>(prop).unwrap().translation,
        Vec3::new(0.0, 0.0, 0.99)
    );
}

#[test]
fn test_out_of_range_entrance_index_is_ignored() {
    let (mut app, rig) = create_tube_app(None);
    let projectile = spawn_fired_projectile(&mut app, Vec3::new(0.0, 0.0, 0.99), Vec3::new(0.0, 0.0, -40.0));

    // Relay с битым индексом: sensor настоящий, entrance'а 7 у tube нет
    app.world_mut().send_event(EntranceTriggered {
        tube: rig.tube,
        entrance_index: 7,
        sensor: rig.sensors[0],
        body: projectile,
        phase: OverlapPhase::Began,
    });
    app.update();

    assert!(teleport_events(&app).is_empty());
    let projectile_state = app.world().get::<Projectile>(projectile).unwrap();
    assert!(projectile_state.transit.is_none(), "TransitStamp не должен появиться");
    assert_eq!(projectile_state.velocity, Vec3::new(0.0, 0.0, -40.0));
    assert!(app.world().resource::<SuppressedPairs>().is_empty());
}

#[test]
fn test_terminal_contact_resolves_before_entrance() {
    let (mut app, rig) = create_tube_app(None);
    let projectile = spawn_fired_projectile(&mut app, Vec3::new(0.0, 0.0, 0.99), Vec3::new(0.0, 0.0, -40.0));
    let side = app.world_mut().spawn((Transform::default(), SurfaceTag::TubeSide)).id();

    // Борт и вход в одном тике: контакт терминальный, телепорта нет
    trigger(&mut app, &rig, 0, projectile, OverlapPhase::Began);
    app.world_mut().send_event(ProjectileContact { projectile, other: side });
    app.update();

    assert!(teleport_events(&app).is_empty());
    assert!(app.world().get_entity(projectile).is_err());
    assert!(app.world().resource::<SuppressedPairs>().is_empty());
}

#[test]
fn test_fixed_tick_has_no_ambiguous_systems() {
    let mut app = create_headless_app(42);
    app.edit_schedule(FixedUpdate, |schedule| {
        schedule.set_build_settings(ScheduleBuildSettings {
            ambiguity_detection: AmbiguityLevel::Error,
            ..default()
        });
    });

    // Первый update без fixed тика, schedule строится на втором
    app.update();
    app.update();
}

#[test]
fn test_rotation_quarter_turn_single_flight() {
    let (mut app, rig) = create_tube_app(Some(Vec3::new(1.0, 0.0, 0.0)));
    app.init_resource::<FinishedRotations>()
        .add_systems(Update, collect_finished_rotations);

    app.world_mut().send_event(RotateTubeRequest { tube: rig.tube });
    app.world_mut().send_event(RotateTubeRequest { tube: rig.tube });
    app.update();

    // Запрос во время поворота тоже отбрасывается
    app.world_mut().send_event(RotateTubeRequest { tube: rig.tube });

    for _ in 0..30 {
        app.update();
    }

    let finished = &app.world().resource::<FinishedRotations>().0;
    assert_eq!(finished, &vec![rig.tube], "Ровно один поворот");

    let tube = app.world().get::<Tube>(rig.tube).unwrap();
    assert!(!tube.is_rotating());

    let transform = app.world().get::<Transform>(rig.tube).unwrap();
    let angle = Quat::IDENTITY.angle_between(transform.rotation).to_degrees();
    assert!((angle - 90.0).abs() < 1e-3, "angle = {}", angle);
    // CW вокруг pivot (1,0,0): начало координат уходит в (1,0,-1)
    assert!((transform.translation - Vec3::new(1.0, 0.0, -1.0)).length() < 1e-4);
}

#[test]
fn test_transit_after_rotation_uses_new_geometry() {
    let (mut app, rig) = create_tube_app(None);
    app.world_mut().send_event(RotateTubeRequest { tube: rig.tube });
    for _ in 0..20 {
        app.update();
    }

    // После CW поворота south sensor (0,0,1) → (-1,0,0), inward -Z → +X; exit (3,0,0) → (0,0,3), forward +X → +Z
    let sensor = app.world().get::<GlobalTransform>(rig.sensors[0]).unwrap().translation();
    assert!((sensor - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-4, "sensor = {:?}", sensor);
    let exit = app.world().get::<GlobalTransform>(rig.exits[0]).unwrap();
    assert!((exit.forward().as_vec3() - Vec3::Z).length() < 1e-4);

    let projectile = spawn_fired_projectile(&mut app, Vec3::new(-0.99, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0));
    trigger(&mut app, &rig, 0, projectile, OverlapPhase::Began);
    app.update();

    let events = teleport_events(&app);
    assert_eq!(events.len(), 1);
    assert!((events[0].position - Vec3::new(0.0, 0.0, 3.05)).length() < 1e-3);
    assert!((events[0].velocity - Vec3::new(0.0, 0.0, 40.0)).length() < 1e-2);
}

#[test]
fn test_setup_attaches_relays_and_derives_id() {
    let mut app = create_headless_app(7);
    let world = app.world_mut();
    let tube = world.spawn(Transform::default()).id();
    let sensor = world.spawn((Transform::from_xyz(0.0, 0.0, 1.0), Sensor, ChildOf(tube))).id();
    // Solid "sensor" и entrance без exit: только диагностика
    let solid = world.spawn((Transform::from_xyz(0.0, 0.0, -1.0), ChildOf(tube))).id();
    let exit = world.spawn((Transform::from_xyz(2.0, 0.0, 0.0), ChildOf(tube))).id();
    world.entity_mut(tube).insert(Tube::new(
        "",
        vec![
            Entrance::new("ok").with_sensor(sensor).with_exit(exit),
            Entrance::new("broken").with_sensor(solid),
        ],
        TubeSettings::default(),
    ));

    app.update();

    let tube_component = app.world().get::<Tube>(tube).unwrap();
    assert_eq!(tube_component.id(), Tube::derived_id(tube));

    assert_eq!(
        app.world().get::<EntranceTrigger>(sensor),
        Some(&EntranceTrigger { owner: tube, index: 0 })
    );
    assert_eq!(
        app.world().get::<EntranceTrigger>(solid),
        Some(&EntranceTrigger { owner: tube, index: 1 })
    );
}

#[test]
fn test_demo_level_spawns_wired_tubes() {
    fn setup(mut commands: Commands) {
        let layout = LevelLayout::demo().unwrap();
        spawn_level(&mut commands, &layout);
    }

    let mut app = create_headless_app(1);
    app.add_systems(Startup, setup);
    app.update();
    app.update();

    let world = app.world_mut();
    let mut tubes = world.query::<(Entity, &Tube)>();
    let tubes: Vec<(Entity, String, usize, Option<Entity>)> = tubes
        .iter(world)
        .map(|(entity, tube)| (entity, tube.id().to_string(), tube.entrances().len(), tube.pivot))
        .collect();
    assert_eq!(tubes.len(), 1);
    let (tube, id, entrance_count, pivot) = tubes[0].clone();
    assert_eq!(id, "tube-center");

    let mut triggers = world.query_filtered::<&EntranceTrigger, With<Sensor>>();
    let mut indices: Vec<usize> = triggers
        .iter(world)
        .filter(|trigger| trigger.owner == tube)
        .map(|trigger| trigger.index)
        .collect();
    indices.sort();
    assert_eq!(indices, (0..entrance_count).collect::<Vec<_>>());

    // Pivot: отдельный root entity, не child tube'а
    let pivot = pivot.expect("demo tube задаёт pivot");
    assert!(world.get::<ChildOf>(pivot).is_none());
}
