//! Headless симуляция Tubeshot
//!
//! Грузит встроенный демо-уровень, стреляет из launcher'а с seeded разбросом
//! и крутит Rapier + tube redirector без рендера.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use rand::Rng;

use tubeshot_simulation::config::LauncherLayout;
use tubeshot_simulation::{
    create_headless_app, set_log_level, spawn_level, spawn_projectile, ActiveProjectiles, DeterministicRng, EnemyHit,
    LevelLayout, LogLevel, ProjectileConfig, ProjectileDestroyed, ProjectileTeleported, RotateTubeRequest,
    SpawnedLevel, TubeshotSet,
};

const TOTAL_TICKS: u32 = 1000;
const ROTATE_AT_TICK: u32 = 240;

#[derive(Resource)]
struct DemoLevel {
    layout: LevelLayout,
    spawned: SpawnedLevel,
}

#[derive(Resource)]
struct Launcher {
    layout: LauncherLayout,
    timer: Timer,
    fired: u32,
}

#[derive(Resource, Default)]
struct DemoStats {
    teleports: u32,
    enemy_hits: u32,
    destroyed: u32,
}

fn setup_level(mut commands: Commands, mut level: ResMut<DemoLevel>) {
    let spawned = spawn_level(&mut commands, &level.layout);
    println!(
        "Level '{}': {} tubes, {} walls, {} enemies",
        level.layout.name,
        spawned.tubes.len(),
        spawned.walls.len(),
        spawned.enemies.len()
    );
    level.spawned = spawned;
}

fn fire_launcher(
    mut commands: Commands,
    time: Res<Time>,
    mut launcher: ResMut<Launcher>,
    mut rng: ResMut<DeterministicRng>,
    config: Res<ProjectileConfig>,
) {
    if launcher.fired >= launcher.layout.shots {
        return;
    }
    if !launcher.timer.tick(time.delta()).just_finished() {
        return;
    }

    let spread = launcher.layout.spread_degrees.abs();
    let jitter = if spread > 0.0 {
        rng.rng.gen_range(-spread..=spread)
    } else {
        0.0
    };

    let aim = Vec3::from_array(launcher.layout.direction).normalize_or(Vec3::NEG_Z);
    let direction = Quat::from_rotation_y(jitter.to_radians()) * aim;
    let position = Vec3::from_array(launcher.layout.position);

    spawn_projectile(&mut commands, position, direction * launcher.layout.speed, &config);
    launcher.fired += 1;
}

fn collect_stats(
    mut stats: ResMut<DemoStats>,
    mut teleported: EventReader<ProjectileTeleported>,
    mut hits: EventReader<EnemyHit>,
    mut destroyed: EventReader<ProjectileDestroyed>,
) {
    stats.teleports += teleported.read().count() as u32;
    stats.enemy_hits += hits.read().count() as u32;
    stats.destroyed += destroyed.read().count() as u32;
}

fn main() {
    let seed = 42;
    println!("Starting Tubeshot headless simulation (seed: {})", seed);

    let layout = match LevelLayout::demo() {
        Ok(layout) => layout,
        Err(err) => {
            eprintln!("Failed to load demo level: {}", err);
            std::process::exit(1);
        }
    };

    let launcher = Launcher {
        timer: Timer::from_seconds(layout.launcher.interval_secs.max(1.0 / 60.0), TimerMode::Repeating),
        layout: layout.launcher.clone(),
        fired: 0,
    };

    let mut app = create_headless_app(seed);
    // Per-projectile debug строки на 1000 тиков не нужны
    set_log_level(LogLevel::Info);
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
        .insert_resource(layout.projectile)
        .insert_resource(launcher)
        .insert_resource(DemoLevel {
            layout,
            spawned: SpawnedLevel::default(),
        })
        .init_resource::<DemoStats>()
        .add_systems(Startup, setup_level)
        .add_systems(FixedUpdate, fire_launcher.before(TubeshotSet::Timers))
        .add_systems(Update, collect_stats);

    for tick in 0..TOTAL_TICKS {
        if tick == ROTATE_AT_TICK {
            let tubes = app.world().resource::<DemoLevel>().spawned.tubes.clone();
            for tube in tubes {
                // Второй запрос в том же кадре должен быть отброшен (single-flight)
                app.world_mut().send_event(RotateTubeRequest { tube });
                app.world_mut().send_event(RotateTubeRequest { tube });
            }
        }

        app.update();

        if tick % 100 == 0 {
            let active = app.world().resource::<ActiveProjectiles>().count();
            let stats = app.world().resource::<DemoStats>();
            println!(
                "Tick {}: {} active projectiles, {} teleports, {} enemy hits, {} destroyed",
                tick, active, stats.teleports, stats.enemy_hits, stats.destroyed
            );
        }
    }

    println!("Simulation complete!");
}
