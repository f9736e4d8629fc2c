// The built-in disaster pool. Stage metadata opts into disasters by name;
// unknown names fail the stage load.

use rand::Rng;

use crate::domain::behaviour::Positioned;
use crate::domain::catalog::PropKind;
use crate::domain::catalog::weapons::WeaponKind;
use crate::domain::prop::{Loot, PropOverrides};
use crate::domain::tuning::HazardTuning;
use crate::use_cases::scene::Scene;
use crate::use_cases::scheduler::Disaster;

/// Resolves a stage-data disaster name against the pool.
pub fn disaster_by_name(name: &str) -> Option<Disaster> {
    match name {
        "carpet_bombing" => Some(carpet_bombing()),
        "supply_drop" => Some(supply_drop()),
        "floor_is_lava" => Some(floor_is_lava()),
        _ => None,
    }
}

pub fn carpet_bombing() -> Disaster {
    Disaster {
        name: "carpet_bombing",
        announcement: "carpet bombing inbound, take cover",
        duration: 160,
        begin: noop,
        tick: carpet_bombing_tick,
        end: noop,
    }
}

fn carpet_bombing_tick(scene: &mut Scene, elapsed: u64) {
    if elapsed % 8 != 0 {
        return;
    }
    let max_x = (scene.layout().width_px() - 32.0).max(1.0);
    let x = scene.rng().gen_range(0.0..max_x);
    scene.spawn_prop_action(
        PropKind::Bomb,
        PropOverrides {
            positioned: Some(Positioned::new(x, -64.0)),
            ..Default::default()
        },
    );
}

pub fn supply_drop() -> Disaster {
    Disaster {
        name: "supply_drop",
        announcement: "supply drop incoming",
        duration: 200,
        begin: noop,
        tick: supply_drop_tick,
        end: noop,
    }
}

fn supply_drop_tick(scene: &mut Scene, elapsed: u64) {
    if elapsed % 50 != 0 {
        return;
    }
    let max_x = (scene.layout().width_px() - 32.0).max(1.0);
    let x = scene.rng().gen_range(0.0..max_x);
    // Mostly weapons, the odd medkit.
    if scene.rng().gen_range(0..4) == 0 {
        scene.spawn_prop_action(
            PropKind::Medkit,
            PropOverrides {
                positioned: Some(Positioned::new(x, -48.0)),
                ..Default::default()
            },
        );
    } else {
        let pool = WeaponKind::pickups();
        let weapon = pool[scene.rng().gen_range(0..pool.len())];
        scene.spawn_prop_action(
            PropKind::WeaponCrate,
            PropOverrides {
                positioned: Some(Positioned::new(x, -48.0)),
                loot: Some(Loot { weapon }),
                ..Default::default()
            },
        );
    }
}

pub fn floor_is_lava() -> Disaster {
    Disaster {
        name: "floor_is_lava",
        announcement: "the floor is lava",
        duration: 150,
        begin: noop,
        tick: floor_is_lava_tick,
        end: noop,
    }
}

fn floor_is_lava_tick(scene: &mut Scene, elapsed: u64) {
    if elapsed % 6 != 0 {
        return;
    }
    let cols = scene.layout().cols() as i64;
    let col = scene.rng().gen_range(0..cols.max(1));
    let surfaces = scene.layout().surface_rows(col);
    if surfaces.is_empty() {
        return;
    }
    let row = surfaces[scene.rng().gen_range(0..surfaces.len())];
    // The flame occupies the cell above the standable tile.
    let (x, y) = scene.layout().cell_origin(col, row - 1);
    let lifetime = HazardTuning::default().flame_lifetime_ticks;
    let expires_at = scene.current_tick() + lifetime;
    scene.spawn_prop_action(
        PropKind::Flame,
        PropOverrides {
            positioned: Some(Positioned::new(x, y)),
            expires_at: Some(expires_at),
            ..Default::default()
        },
    );
}

fn noop(_scene: &mut Scene) {}
