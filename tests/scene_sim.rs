// Deterministic scene simulations against a recording sink: no sockets,
// no tick task, just `apply_command` and `tick` over a small test stage.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;

use parapet_server::domain::behaviour::{
    BehaviourPatch, DamageablePatch, Facing, InputStatus, Positioned,
};
use parapet_server::domain::catalog::weapons::WeaponKind;
use parapet_server::domain::catalog::{DestroyReason, PropKind};
use parapet_server::domain::prop::{ClientId, Loot, PropOverrides};
use parapet_server::use_cases::leaderboard::MatchLeaderboard;
use parapet_server::use_cases::scene::Scene;
use parapet_server::use_cases::stage::parse_stage;
use parapet_server::use_cases::types::{
    DiffBatch, SceneCommand, SceneOutput, SceneSink, Target,
};

/// Sink that records every output for later inspection.
#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<SceneOutput>>>);

impl SceneSink for RecordingSink {
    fn deliver(&mut self, output: SceneOutput) {
        self.0.lock().unwrap().push(output);
    }
}

impl RecordingSink {
    fn drain(&self) -> Vec<SceneOutput> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

// 16 by 7 cells with a solid floor on the bottom row.
const GRID: &str = "................\n\
                    ................\n\
                    ................\n\
                    ................\n\
                    ................\n\
                    ................\n\
                    ################";

// One spawn point at cell (7, 5), resting on the floor, so every avatar
// lands on the same spot.
const SPAWN_EXTRA: &str = r#"{ "spawnPoints": [[7, 5]] }"#;
const SPAWN_X: f64 = 224.0;
const SPAWN_Y: f64 = 160.0;

fn stage_json(time_limit: u64, extra: &str) -> String {
    format!(
        r#"{{
            "stageName": "Proving Grounds",
            "stageSystemName": "proving_grounds",
            "gridSize": 32,
            "author": "tests",
            "timeLimit": {time_limit},
            "extra": {extra}
        }}"#
    )
}

fn scene_with(extra: &str, disaster_interval: u64, seed: u64) -> (Scene, RecordingSink) {
    let sink = RecordingSink::default();
    let stage = parse_stage(&stage_json(0, extra), GRID).expect("test stage");
    let scene = Scene::new(
        stage,
        disaster_interval,
        Box::new(sink.clone()),
        Box::new(MatchLeaderboard::default()),
        StdRng::seed_from_u64(seed),
    );
    (scene, sink)
}

fn join(scene: &mut Scene, name: &str) -> ClientId {
    let client_id = ClientId::new();
    scene.apply_command(SceneCommand::Connect {
        client_id,
        name_tag: name.to_string(),
    });
    client_id
}

fn act(scene: &mut Scene, client_id: ClientId, code: &str, status: InputStatus) {
    scene.apply_command(SceneCommand::Action {
        client_id,
        code: code.to_string(),
        status,
    });
}

fn broadcast_batches(outputs: &[SceneOutput]) -> Vec<&DiffBatch> {
    outputs
        .iter()
        .filter_map(|output| match output {
            SceneOutput::Diff {
                target: Target::All,
                batch,
            } => Some(batch),
            _ => None,
        })
        .collect()
}

fn sounds(outputs: &[SceneOutput]) -> Vec<String> {
    outputs
        .iter()
        .filter_map(|output| match output {
            SceneOutput::Arbitrary { kind, payload, .. } if kind == "sound" => {
                payload["sound"].as_str().map(String::from)
            }
            _ => None,
        })
        .collect()
}

fn has_notification(outputs: &[SceneOutput], message: &str, kind: &str) -> bool {
    outputs.iter().any(|output| matches!(
        output,
        SceneOutput::Notification { message: m, kind: k, .. } if m == message && k == kind
    ))
}

fn avatar_y(scene: &Scene, client_id: ClientId) -> f64 {
    scene
        .controlled_prop(client_id)
        .and_then(|p| p.positioned.as_ref())
        .map(|p| p.pos_y)
        .expect("live avatar")
}

#[test]
fn connecting_spawns_an_avatar_and_owes_a_full_sync() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 7);
    let ana = join(&mut scene, "Ana");

    assert!(has_notification(&sink.drain(), "Ana joined the scene", "info"));

    scene.tick();
    let outputs = sink.drain();

    let batches = broadcast_batches(&outputs);
    assert_eq!(batches.len(), 1);
    let batch = batches[0];
    assert_eq!(batch.load.len(), 1);
    let snapshot = batch.load.values().next().expect("avatar snapshot");
    assert_eq!(snapshot.kind, "player");
    assert_eq!(
        snapshot.behaviours.name_tagged.as_ref().map(|n| n.tag.as_str()),
        Some("Ana")
    );
    assert_eq!(
        snapshot.behaviours.controlled.as_ref().map(|c| c.client_id),
        Some(ana)
    );
    assert!(batch.anim.iter().any(|a| a.name == "spawn"));

    // The personal snapshot arrives alongside the broadcast, addressed to
    // the newcomer only.
    let full = outputs
        .iter()
        .find_map(|output| match output {
            SceneOutput::Diff {
                target: Target::Client(c),
                batch,
            } if *c == ana => Some(batch),
            _ => None,
        })
        .expect("full sync for the new client");
    assert_eq!(full.load.len(), 1);
    assert!(scene.controlled_prop(ana).is_some());
}

#[test]
fn sync_command_sends_a_targeted_full_snapshot() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 9);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    sink.drain();

    scene.apply_command(SceneCommand::Sync { client_id: ana });
    scene.tick();
    let outputs = sink.drain();

    let full = outputs
        .iter()
        .find_map(|output| match output {
            SceneOutput::Diff {
                target: Target::Client(c),
                batch,
            } if *c == ana => Some(batch),
            _ => None,
        })
        .expect("requested snapshot");
    assert_eq!(full.load.len(), scene.prop_count());
}

#[test]
fn walking_emits_position_and_facing_updates_then_goes_quiet() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 11);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    sink.drain();

    act(&mut scene, ana, "left", InputStatus::Pressed);
    scene.tick();
    let outputs = sink.drain();
    let batches = broadcast_batches(&outputs);
    assert_eq!(batches.len(), 1);
    let update = batches[0].update.values().next().expect("avatar update");
    let positioned = update.positioned.as_ref().expect("position patch");
    assert!(positioned.pos_x.expect("posX") < SPAWN_X);
    let drawable = update.drawable.as_ref().expect("facing patch");
    assert_eq!(drawable.facing, Some(Facing::Left));

    // A grounded, idle avatar produces nothing.
    act(&mut scene, ana, "left", InputStatus::Released);
    scene.tick();
    assert!(sink.drain().is_empty());
}

#[test]
fn update_patches_track_the_state_a_full_snapshot_reports() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 53);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    let outputs = sink.drain();

    // Seed a client-side mirror from the first load snapshot.
    let batches = broadcast_batches(&outputs);
    let (avatar, snapshot) = batches[0].load.iter().next().expect("initial snapshot");
    let avatar = avatar.clone();
    let positioned = snapshot.behaviours.positioned.as_ref().expect("positioned");
    let mut mirror_x = positioned.pos_x;
    let mut mirror_y = positioned.pos_y;
    let mut mirror_facing = snapshot.behaviours.drawable.as_ref().expect("drawable").facing;
    let mut mirror_hp = snapshot.behaviours.damageable.as_ref().expect("damageable").hp;

    // Walk left while taking a hit, folding every update patch into the
    // mirror as a client would.
    act(&mut scene, ana, "left", InputStatus::Pressed);
    let avatar_id = scene.controlled_prop(ana).expect("avatar").id;
    scene.mutate_prop_behaviour_action(
        avatar_id,
        BehaviourPatch::Damageable(DamageablePatch {
            hp: Some(40),
            last_damager: None,
        }),
    );
    for _ in 0..6 {
        scene.tick();
        for batch in broadcast_batches(&sink.drain()) {
            let Some(update) = batch.update.get(&avatar) else {
                continue;
            };
            if let Some(p) = &update.positioned {
                if let Some(x) = p.pos_x {
                    mirror_x = x;
                }
                if let Some(y) = p.pos_y {
                    mirror_y = y;
                }
            }
            if let Some(p) = &update.drawable {
                if let Some(facing) = p.facing {
                    mirror_facing = facing;
                }
            }
            if let Some(p) = &update.damageable {
                if let Some(hp) = p.hp {
                    mirror_hp = hp;
                }
            }
        }
    }
    act(&mut scene, ana, "left", InputStatus::Released);
    scene.tick();
    assert!(broadcast_batches(&sink.drain()).is_empty());

    // A fresh full snapshot lands exactly where the mirror converged.
    scene.apply_command(SceneCommand::Sync { client_id: ana });
    scene.tick();
    let outputs = sink.drain();
    let full = outputs
        .iter()
        .find_map(|output| match output {
            SceneOutput::Diff {
                target: Target::Client(c),
                batch,
            } if *c == ana => Some(batch),
            _ => None,
        })
        .expect("requested snapshot");
    let snapshot = full.load.get(&avatar).expect("avatar snapshot");
    let positioned = snapshot.behaviours.positioned.as_ref().expect("positioned");
    assert_eq!(positioned.pos_x, mirror_x);
    assert_eq!(positioned.pos_y, mirror_y);
    assert_eq!(
        snapshot.behaviours.drawable.as_ref().map(|d| d.facing),
        Some(mirror_facing)
    );
    assert_eq!(
        snapshot.behaviours.damageable.as_ref().map(|d| d.hp),
        Some(mirror_hp)
    );
    assert_eq!(mirror_facing, Facing::Left);
    assert_eq!(mirror_hp, 40);
    assert!(mirror_x < SPAWN_X);
}

#[test]
fn jump_rises_at_least_two_cells_and_returns_to_the_same_tile() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 13);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    sink.drain();
    assert_eq!(avatar_y(&scene, ana), SPAWN_Y);

    act(&mut scene, ana, "jump", InputStatus::Pressed);
    let mut heights = Vec::new();
    for _ in 0..40 {
        scene.tick();
        heights.push(avatar_y(&scene, ana));
    }

    let peak = heights.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(
        peak <= SPAWN_Y - 64.0,
        "jump peak {peak} should clear two cells above {SPAWN_Y}"
    );

    // Monotonic up, monotonic down, then resting on the starting tile.
    let apex = heights.iter().position(|y| *y == peak).expect("apex");
    assert!(heights[..=apex].windows(2).all(|w| w[1] <= w[0]));
    let landing = apex
        + heights[apex..]
            .iter()
            .position(|y| *y == SPAWN_Y)
            .expect("returns to the platform");
    assert!(heights[apex..=landing].windows(2).all(|w| w[1] >= w[0]));
    assert!(heights[landing..].iter().all(|y| *y == SPAWN_Y));

    assert!(sounds(&sink.drain()).iter().any(|s| s == "jump"));
}

#[test]
fn melee_battle_feeds_kills_and_respawns_the_victim() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 17);
    let ana = join(&mut scene, "Ana");
    let ben = join(&mut scene, "Ben");
    scene.tick();
    sink.drain();
    let ben_avatar = scene.controlled_prop(ben).expect("ben avatar").id.to_string();

    // Step left once so the swing arc reaches the co-located victim.
    act(&mut scene, ana, "left", InputStatus::Pressed);
    scene.tick();
    act(&mut scene, ana, "left", InputStatus::Released);
    scene.tick();
    sink.drain();

    // Swing until the kill lands; the cooldown drops most of the presses.
    let mut ticks: Vec<Vec<SceneOutput>> = Vec::new();
    let mut killed = false;
    while !killed && ticks.len() < 120 {
        act(&mut scene, ana, "fire", InputStatus::Pressed);
        scene.tick();
        let produced = sink.drain();
        killed = produced.iter().any(|output| {
            matches!(output, SceneOutput::Notification { kind, .. } if kind == "warning")
        });
        ticks.push(produced);
    }
    assert!(killed, "melee never finished the victim");

    let death_tick = ticks.last().expect("at least one tick");
    assert!(has_notification(
        death_tick,
        "Ben was taken out by Ana",
        "warning"
    ));
    let death_batches = broadcast_batches(death_tick);
    assert!(death_batches.iter().any(|b| b.delete.contains(&ben_avatar)));
    assert!(death_batches
        .iter()
        .any(|b| b.anim.iter().any(|a| a.id == ben_avatar && a.name == "death")));
    assert!(sounds(death_tick).iter().any(|s| s == "death"));
    assert!(scene.controlled_prop(ben).is_none());

    // The swing itself was visible along the way.
    assert!(ticks.iter().any(|t| sounds(t).iter().any(|s| s == "swing")));
    assert!(ticks.iter().any(|t| {
        broadcast_batches(t)
            .iter()
            .any(|b| b.anim.iter().any(|a| a.name == "swing"))
    }));

    // No batch both loads and updates one prop, and deleted props carry
    // nothing else in their final batch.
    for tick_outputs in &ticks {
        for batch in broadcast_batches(tick_outputs) {
            for id in batch.update.keys() {
                assert!(!batch.load.contains_key(id), "load and update share {id}");
            }
            for id in &batch.delete {
                assert!(!batch.load.contains_key(id), "load and delete share {id}");
                assert!(!batch.update.contains_key(id), "update and delete share {id}");
            }
        }
    }

    // Input from the dead client is dropped while the respawn is pending.
    act(&mut scene, ben, "right", InputStatus::Pressed);
    assert!(scene.controlled_prop(ben).is_none());

    // The replacement avatar arrives after the respawn delay, under the
    // same client id but a fresh prop id.
    let mut respawned = None;
    for _ in 0..120 {
        scene.tick();
        let produced = sink.drain();
        if let Some(prop) = scene.controlled_prop(ben) {
            let id = prop.id.to_string();
            assert!(broadcast_batches(&produced)
                .iter()
                .any(|b| b.load.contains_key(&id)));
            respawned = Some(id);
            break;
        }
    }
    let respawned = respawned.expect("victim respawns");
    assert_ne!(respawned, ben_avatar);
}

#[test]
fn own_slashes_never_hurt_the_swinger() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 47);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    sink.drain();

    // Face left so the swing arc sweeps back across the swinger's own box.
    act(&mut scene, ana, "left", InputStatus::Pressed);
    scene.tick();
    act(&mut scene, ana, "left", InputStatus::Released);
    scene.tick();
    sink.drain();

    let mut swings = 0;
    for _ in 0..30 {
        act(&mut scene, ana, "fire", InputStatus::Pressed);
        scene.tick();
        swings += sounds(&sink.drain()).iter().filter(|s| *s == "swing").count();
    }
    assert_eq!(swings, 3, "cooldown should admit three swings in thirty ticks");

    // Three connecting swings would be far past lethal; the shared
    // collision group keeps them off their owner.
    let hp = scene
        .controlled_prop(ana)
        .and_then(|p| p.damageable.as_ref())
        .map(|d| d.hp);
    assert_eq!(hp, Some(100));
}

#[test]
fn unowned_blasts_kill_without_attribution() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 19);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    sink.drain();

    // Three ownerless grenades dropped onto the avatar add up past its
    // hit points once they detonate.
    for _ in 0..3 {
        scene.spawn_prop_action(
            PropKind::Grenade,
            PropOverrides {
                positioned: Some(Positioned::new(SPAWN_X, 120.0)),
                ..Default::default()
            },
        );
    }

    let mut saw_boom = false;
    let mut saw_blast = false;
    let mut destroyed = false;
    for _ in 0..20 {
        scene.tick();
        let produced = sink.drain();
        saw_boom |= sounds(&produced).iter().any(|s| s == "boom");
        saw_blast |= broadcast_batches(&produced)
            .iter()
            .any(|b| b.load.values().any(|s| s.kind == "blast"));
        destroyed = has_notification(&produced, "Ana was destroyed", "warning");
        if destroyed {
            break;
        }
    }
    assert!(saw_boom, "detonation cue never played");
    assert!(saw_blast, "blast prop never loaded");
    assert!(destroyed, "unattributed kill feed entry missing");
    assert!(scene.controlled_prop(ana).is_none());
}

#[test]
fn preloaded_weapon_crate_arms_the_first_toucher() {
    let extra = r#"{
        "spawnPoints": [[7, 5]],
        "preload": [ { "kind": "weapon_crate", "cell": [7, 5], "weapon": "scatter" } ]
    }"#;
    let (mut scene, sink) = scene_with(extra, 0, 31);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    let outputs = sink.drain();

    // The pickup resolves on the first shared tick: crate gone, pocket
    // already armed inside the avatar's load snapshot.
    assert!(outputs.iter().any(|output| matches!(
        output,
        SceneOutput::Notification { message, kind, target }
            if message == "picked up the scatter" && kind == "info" && *target == Target::Client(ana)
    )));
    assert!(sounds(&outputs).iter().any(|s| s == "pickup"));

    let batches = broadcast_batches(&outputs);
    assert_eq!(batches.len(), 1);
    let batch = batches[0];
    assert_eq!(batch.delete.len(), 1, "the consumed crate is deleted");
    let snapshot = batch.load.values().next().expect("avatar snapshot");
    let pocket = snapshot.behaviours.pocket.as_ref().expect("pocket view");
    assert_eq!(pocket.current, WeaponKind::Scatter);

    // Firing the scatter releases a three pellet volley.
    act(&mut scene, ana, "fire", InputStatus::Pressed);
    scene.tick();
    let outputs = sink.drain();
    let pellets = broadcast_batches(&outputs)
        .iter()
        .flat_map(|b| b.load.values())
        .filter(|s| s.kind == "pellet")
        .count();
    assert_eq!(pellets, 3);
    assert!(sounds(&outputs).iter().any(|s| s == "scatter_fire"));
}

#[test]
fn medkit_skips_the_healthy_and_heals_the_wounded() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 41);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    sink.drain();
    let avatar = scene.controlled_prop(ana).expect("avatar").id;

    scene.spawn_prop_action(
        PropKind::Medkit,
        PropOverrides {
            positioned: Some(Positioned::new(SPAWN_X, SPAWN_Y)),
            ..Default::default()
        },
    );
    scene.tick();
    let outputs = sink.drain();
    assert!(sounds(&outputs).iter().all(|s| s != "heal"));
    assert!(broadcast_batches(&outputs).iter().all(|b| b.delete.is_empty()));

    scene.mutate_prop_behaviour_action(
        avatar,
        BehaviourPatch::Damageable(DamageablePatch {
            hp: Some(40),
            last_damager: None,
        }),
    );
    scene.tick();
    let outputs = sink.drain();
    assert!(sounds(&outputs).iter().any(|s| s == "heal"));
    assert!(broadcast_batches(&outputs).iter().any(|b| !b.delete.is_empty()));
    let healed = scene
        .controlled_prop(ana)
        .and_then(|p| p.damageable.as_ref())
        .map(|d| d.hp);
    assert_eq!(healed, Some(75));
}

#[test]
fn items_ignore_props_outside_their_whitelist() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 61);
    join(&mut scene, "Ana");
    scene.tick();
    sink.drain();

    // A medkit and a crate stacked on the same tile, far from the avatar.
    // Both admit only players, so the overlapping pair never reacts.
    scene.spawn_prop_action(
        PropKind::Medkit,
        PropOverrides {
            positioned: Some(Positioned::new(64.0, 160.0)),
            ..Default::default()
        },
    );
    scene.spawn_prop_action(
        PropKind::WeaponCrate,
        PropOverrides {
            positioned: Some(Positioned::new(64.0, 160.0)),
            loot: Some(Loot {
                weapon: WeaponKind::Pistol,
            }),
            ..Default::default()
        },
    );

    for _ in 0..10 {
        scene.tick();
        let outputs = sink.drain();
        assert!(sounds(&outputs)
            .iter()
            .all(|s| s != "pickup" && s != "heal"));
        assert!(broadcast_batches(&outputs).iter().all(|b| b.delete.is_empty()));
    }
    assert_eq!(scene.props().filter(|p| p.kind == PropKind::Medkit).count(), 1);
    assert_eq!(
        scene.props().filter(|p| p.kind == PropKind::WeaponCrate).count(),
        1
    );
}

#[test]
fn item_spawner_replaces_a_consumed_child_after_its_interval() {
    let extra = r#"{
        "spawnPoints": [[2, 5]],
        "preload": [ { "kind": "item_spawner", "cell": [12, 5], "item": "medkit", "interval": 4 } ]
    }"#;
    let (mut scene, sink) = scene_with(extra, 0, 37);

    scene.tick();
    let outputs = sink.drain();
    let first = broadcast_batches(&outputs)
        .iter()
        .flat_map(|b| &b.load)
        .find(|(_, s)| s.kind == "medkit")
        .map(|(id, _)| id.clone())
        .expect("spawner produces a medkit");

    let first_id = scene
        .props()
        .find(|p| p.id.to_string() == first)
        .map(|p| p.id)
        .expect("medkit prop");
    scene.destroy_prop_action(first_id, DestroyReason::Removed);

    let mut waited = 0;
    let replacement = loop {
        scene.tick();
        let outputs = sink.drain();
        let load = broadcast_batches(&outputs)
            .iter()
            .flat_map(|b| &b.load)
            .find(|(_, s)| s.kind == "medkit")
            .map(|(id, _)| id.clone());
        if let Some(id) = load {
            break id;
        }
        waited += 1;
        assert!(waited < 12, "spawner never replaced its child");
    };
    assert_ne!(replacement, first);
}

#[test]
fn floor_is_lava_announces_once_and_spawns_flames() {
    let extra = r#"{ "spawnPoints": [[7, 5]], "disasters": ["floor_is_lava"] }"#;
    let (mut scene, sink) = scene_with(extra, 5, 23);

    let mut announcements = 0;
    let mut sirens = 0;
    let mut flame_loads = 0;
    for _ in 0..30 {
        scene.tick();
        let outputs = sink.drain();
        announcements += outputs
            .iter()
            .filter(|output| matches!(
                output,
                SceneOutput::Notification { message, kind, .. }
                    if message == "the floor is lava" && kind == "disaster"
            ))
            .count();
        sirens += sounds(&outputs).iter().filter(|s| *s == "siren").count();
        flame_loads += broadcast_batches(&outputs)
            .iter()
            .flat_map(|b| b.load.values())
            .filter(|s| s.kind == "flame")
            .count();
    }

    // One disaster at a time: no second announcement while it runs.
    assert_eq!(announcements, 1);
    assert_eq!(sirens, 1);
    assert!(flame_loads > 0, "lava never spawned a flame");
}

#[test]
fn scheduler_stays_idle_without_disasters() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 5, 59);
    join(&mut scene, "Ana");

    for _ in 0..16 {
        scene.tick();
        let outputs = sink.drain();
        assert!(!outputs.iter().any(|output| matches!(
            output,
            SceneOutput::Notification { kind, .. } if kind == "disaster"
        )));
        assert!(sounds(&outputs).iter().all(|s| s != "siren"));
    }
}

#[test]
fn time_limit_is_announced_exactly_once() {
    let sink = RecordingSink::default();
    let stage = parse_stage(&stage_json(4, SPAWN_EXTRA), GRID).expect("test stage");
    let mut scene = Scene::new(
        stage,
        0,
        Box::new(sink.clone()),
        Box::new(MatchLeaderboard::default()),
        StdRng::seed_from_u64(29),
    );

    let mut announcements = 0;
    for _ in 0..10 {
        scene.tick();
        announcements += sink
            .drain()
            .iter()
            .filter(|output| matches!(
                output,
                SceneOutput::Notification { message, kind, .. }
                    if message == "the stage time limit has been reached" && kind == "warning"
            ))
            .count();
    }
    assert_eq!(announcements, 1);
}

#[test]
fn disconnect_despawns_and_rejoining_spawns_fresh() {
    let (mut scene, sink) = scene_with(SPAWN_EXTRA, 0, 43);
    let ana = join(&mut scene, "Ana");
    scene.tick();
    sink.drain();
    let avatar = scene.controlled_prop(ana).expect("avatar").id.to_string();

    // A second connect for a client with a live avatar is ignored.
    let count = scene.prop_count();
    scene.apply_command(SceneCommand::Connect {
        client_id: ana,
        name_tag: "Ana".to_string(),
    });
    scene.tick();
    sink.drain();
    assert_eq!(scene.prop_count(), count);

    scene.apply_command(SceneCommand::Disconnect { client_id: ana });
    assert!(has_notification(&sink.drain(), "Ana left the scene", "info"));
    scene.tick();
    let outputs = sink.drain();
    assert!(broadcast_batches(&outputs)
        .iter()
        .any(|b| b.delete.contains(&avatar)));
    assert!(scene.controlled_prop(ana).is_none());

    scene.apply_command(SceneCommand::Connect {
        client_id: ana,
        name_tag: "Ana".to_string(),
    });
    scene.tick();
    sink.drain();
    let fresh = scene.controlled_prop(ana).expect("rejoined avatar");
    assert_ne!(fresh.id.to_string(), avatar);
}
