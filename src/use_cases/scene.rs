// The authoritative scene: owns every prop, advances the simulation one
// tick at a time, and folds all visible changes into per-tick diffs for
// the communicator.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::info;

use crate::domain::behaviour::{BehaviourPatch, Controlled, InputStatus, NameTagged, PatchSet, Positioned};
use crate::domain::catalog::{self, CreateReason, DestroyReason, HookCtx, PropKind, QueuedAction};
use crate::domain::layout::TileLayout;
use crate::domain::prop::{ClientId, Prop, PropId, PropOverrides};
use crate::domain::tuning::PlayerTuning;
use crate::use_cases::leaderboard::Leaderboard;
use crate::use_cases::scheduler::Scheduler;
use crate::use_cases::stage::Stage;
use crate::use_cases::types::{
    AnimTrigger, DiffBatch, SceneCommand, SceneOutput, SceneSink, Target,
};

struct RespawnTicket {
    client_id: ClientId,
    name_tag: String,
    at_tick: u64,
}

pub struct Scene {
    layout: TileLayout,
    spawn_points: Vec<(f64, f64)>,
    time_limit: u64,
    time_limit_announced: bool,
    props: HashMap<PropId, Prop>,
    /// Insertion order of live props; the tick and collision passes walk it.
    order: Vec<PropId>,
    current_tick: u64,
    rng: StdRng,
    scheduler: Scheduler,
    action_queue: VecDeque<QueuedAction>,
    sink: Box<dyn SceneSink>,
    leaderboard: Box<dyn Leaderboard>,
    respawns: Vec<RespawnTicket>,
    pending_sync: Vec<ClientId>,
    created: Vec<PropId>,
    updates: HashMap<PropId, PatchSet>,
    destroyed: Vec<PropId>,
    anims: Vec<AnimTrigger>,
}

impl Scene {
    /// Builds a scene over `stage`, spawning its preload props.
    pub fn new(
        stage: Stage,
        disaster_interval: u64,
        sink: Box<dyn SceneSink>,
        leaderboard: Box<dyn Leaderboard>,
        rng: StdRng,
    ) -> Self {
        let mut scene = Self {
            layout: stage.layout,
            spawn_points: stage.spawn_points,
            time_limit: stage.meta.time_limit,
            time_limit_announced: false,
            props: HashMap::new(),
            order: Vec::new(),
            current_tick: 0,
            rng,
            scheduler: Scheduler::new(stage.disasters, disaster_interval),
            action_queue: VecDeque::new(),
            sink,
            leaderboard,
            respawns: Vec::new(),
            pending_sync: Vec::new(),
            created: Vec::new(),
            updates: HashMap::new(),
            destroyed: Vec::new(),
            anims: Vec::new(),
        };
        for preload in stage.preload {
            scene.spawn_with_reason(preload.kind, preload.overrides, CreateReason::StagePreload);
        }
        scene
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    pub fn prop(&self, id: PropId) -> Option<&Prop> {
        self.props.get(&id)
    }

    pub fn props(&self) -> impl Iterator<Item = &Prop> {
        self.order.iter().filter_map(|id| self.props.get(id))
    }

    pub fn prop_count(&self) -> usize {
        self.props.len()
    }

    /// The avatar currently owned by `client_id`, if it is alive.
    pub fn controlled_prop(&self, client_id: ClientId) -> Option<&Prop> {
        self.props().find(|p| p.client_id() == Some(client_id))
    }

    /// Random position from the stage's spawn points.
    pub fn pick_spawn_point(&mut self) -> (f64, f64) {
        if self.spawn_points.is_empty() {
            return (self.layout.width_px() / 2.0, 0.0);
        }
        self.spawn_points[self.rng.gen_range(0..self.spawn_points.len())]
    }

    /// Scene-wide randomness source, shared so seeded runs stay
    /// reproducible.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    // -- inbound -----------------------------------------------------------

    pub fn apply_command(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::Connect {
                client_id,
                name_tag,
            } => self.connect_action(client_id, &name_tag),
            SceneCommand::Disconnect { client_id } => self.disconnect_action(client_id),
            SceneCommand::Action {
                client_id,
                code,
                status,
            } => self.client_action(client_id, &code, status),
            SceneCommand::Sync { client_id } => self.request_sync(client_id),
        }
    }

    /// Spawns an avatar for a newly admitted client and owes it a full
    /// snapshot with the next diff. Silently ignores clients that already
    /// own an avatar or are waiting on a respawn.
    pub fn connect_action(&mut self, client_id: ClientId, name_tag: &str) {
        if self.controlled_prop(client_id).is_some()
            || self.respawns.iter().any(|t| t.client_id == client_id)
        {
            return;
        }
        self.spawn_player(client_id, name_tag.to_string(), CreateReason::Connected);
        self.request_sync(client_id);
        self.send_notification(
            &format!("{name_tag} joined the scene"),
            "info",
            Target::All,
        );
        info!(%client_id, name = name_tag, players = self.player_count(), "client joined scene");
    }

    /// Removes the client's avatar and any pending respawn.
    pub fn disconnect_action(&mut self, client_id: ClientId) {
        let ticket_name = self
            .respawns
            .iter()
            .find(|t| t.client_id == client_id)
            .map(|t| t.name_tag.clone());
        self.respawns.retain(|t| t.client_id != client_id);
        self.pending_sync.retain(|c| *c != client_id);

        let avatar_id = self.controlled_prop(client_id).map(|p| p.id);
        let avatar_name = self
            .controlled_prop(client_id)
            .and_then(|p| p.name_tag().map(String::from));
        if let Some(id) = avatar_id {
            self.destroy_prop_action(id, DestroyReason::Disconnected);
        }
        let Some(name) = avatar_name.or(ticket_name) else {
            return;
        };
        self.send_notification(&format!("{name} left the scene"), "info", Target::All);
        info!(%client_id, name, players = self.player_count(), "client left scene");
    }

    /// Routes one input event to the client's avatar. Without a live
    /// avatar the input is dropped.
    pub fn client_action(&mut self, client_id: ClientId, code: &str, status: InputStatus) {
        let Some(id) = self.controlled_prop(client_id).map(|p| p.id) else {
            return;
        };
        if let Some(prop) = self.props.get_mut(&id) {
            catalog::on_receive(prop, code, status);
        }
    }

    pub fn request_sync(&mut self, client_id: ClientId) {
        if !self.pending_sync.contains(&client_id) {
            self.pending_sync.push(client_id);
        }
    }

    // -- actions -----------------------------------------------------------

    /// Creates a prop of `kind` with its catalog defaults overlaid by
    /// `overrides`, runs its creation hook, and records it for the diff.
    pub fn spawn_prop_action(&mut self, kind: PropKind, overrides: PropOverrides) -> PropId {
        self.spawn_with_reason(kind, overrides, CreateReason::Spawned)
    }

    fn spawn_with_reason(
        &mut self,
        kind: PropKind,
        overrides: PropOverrides,
        reason: CreateReason,
    ) -> PropId {
        let mut prop = catalog::default_prop(kind);
        overrides.apply(&mut prop);
        if let Some(pos) = prop.positioned.as_mut() {
            pos.last_sent = Some(pos.rounded());
        }
        let id = prop.id;
        self.props.insert(id, prop);
        self.order.push(id);
        self.created.push(id);
        self.run_on_created(id, reason);
        self.drain_actions();
        id
    }

    /// Removes a prop, records its delete, and lets its kind react. A
    /// killed avatar also feeds the kill feed and schedules a respawn.
    pub fn destroy_prop_action(&mut self, id: PropId, reason: DestroyReason) {
        let Some(mut prop) = self.props.remove(&id) else {
            return;
        };
        self.order.retain(|p| *p != id);
        // A prop created and destroyed within one tick leaves only its
        // delete entry.
        self.created.retain(|p| *p != id);
        self.updates.remove(&id);
        self.destroyed.push(id);

        if reason == DestroyReason::Killed {
            self.handle_kill(&prop);
        }

        let mut ctx = HookCtx {
            tick: self.current_tick,
            layout: &self.layout,
            others: &self.props,
            rng: &mut self.rng,
            queue: &mut self.action_queue,
        };
        catalog::on_destroyed(&mut prop, reason, &mut ctx);
        self.drain_actions();
    }

    /// Applies a partial patch to one behaviour of a live prop and records
    /// it for the diff. Missing props and missing behaviours are no-ops.
    pub fn mutate_prop_behaviour_action(&mut self, id: PropId, patch: BehaviourPatch) {
        let Some(prop) = self.props.get_mut(&id) else {
            return;
        };
        if !patch.apply(prop) {
            return;
        }
        self.updates.entry(id).or_default().merge(&patch);
    }

    /// Queues a one-shot animation trigger. Props deleted this same tick
    /// may still flash their final animation.
    pub fn animate_prop_action(&mut self, id: PropId, name: &str) {
        if !self.props.contains_key(&id) && !self.destroyed.contains(&id) {
            return;
        }
        self.anims.push(AnimTrigger {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Out-of-band notification, delivered immediately.
    pub fn send_notification(&mut self, message: &str, kind: &str, target: Target) {
        self.sink.deliver(SceneOutput::Notification {
            target,
            message: message.to_string(),
            kind: kind.to_string(),
        });
    }

    /// Out-of-band `{type, data}` message for kinds the scene does not
    /// model, delivered immediately.
    pub fn send_arbitrary_message(&mut self, kind: &str, payload: serde_json::Value, target: Target) {
        self.sink.deliver(SceneOutput::Arbitrary {
            target,
            kind: kind.to_string(),
            payload,
        });
    }

    /// Fire-and-forget sound effect cue for every client.
    pub fn produce_sound(&mut self, sound: &str) {
        self.send_arbitrary_message("sound", serde_json::json!({ "sound": sound }), Target::All);
    }

    // -- tick pipeline -----------------------------------------------------

    /// Advances the simulation one step: scheduler, respawns, entity pass,
    /// collision pass, then diff composition.
    pub fn tick(&mut self) {
        let mut scheduler = std::mem::take(&mut self.scheduler);
        scheduler.on_tick(self);
        self.scheduler = scheduler;

        self.process_respawns();

        // Props spawned during the pass wait for the next tick.
        let ids = self.order.clone();
        for id in ids {
            self.run_on_tick(id);
        }

        self.collision_pass();

        if self.time_limit > 0
            && self.current_tick >= self.time_limit
            && !self.time_limit_announced
        {
            self.time_limit_announced = true;
            self.send_notification("the stage time limit has been reached", "warning", Target::All);
        }

        self.compose_diff();
        self.current_tick += 1;
    }

    fn process_respawns(&mut self) {
        let tick = self.current_tick;
        let (due, later): (Vec<_>, Vec<_>) = self
            .respawns
            .drain(..)
            .partition(|ticket| ticket.at_tick <= tick);
        self.respawns = later;
        for ticket in due {
            self.spawn_player(ticket.client_id, ticket.name_tag, CreateReason::Respawned);
        }
    }

    fn spawn_player(&mut self, client_id: ClientId, name_tag: String, reason: CreateReason) -> PropId {
        let (x, y) = self.pick_spawn_point();
        self.spawn_with_reason(
            PropKind::Player,
            PropOverrides {
                positioned: Some(Positioned::new(x, y)),
                controlled: Some(Controlled::new(client_id)),
                name_tagged: Some(NameTagged { tag: name_tag }),
                ..Default::default()
            },
            reason,
        )
    }

    fn player_count(&self) -> usize {
        self.props.values().filter(|p| p.controlled.is_some()).count()
    }

    fn handle_kill(&mut self, prop: &Prop) {
        let Some(ctrl) = &prop.controlled else {
            return;
        };
        let victim = prop.name_tag().unwrap_or("someone").to_string();
        let killer = prop.damageable.as_ref().and_then(|d| d.last_damager.clone());
        match &killer {
            Some(killer) => {
                self.send_notification(
                    &format!("{victim} was taken out by {killer}"),
                    "warning",
                    Target::All,
                );
                self.leaderboard.record_kill(killer, &victim);
            }
            None => {
                self.send_notification(&format!("{victim} was destroyed"), "warning", Target::All);
            }
        }
        info!(
            client_id = %ctrl.client_id,
            victim,
            killer = killer.as_deref().unwrap_or(""),
            "avatar destroyed"
        );
        self.respawns.push(RespawnTicket {
            client_id: ctrl.client_id,
            name_tag: victim,
            at_tick: self.current_tick + PlayerTuning::default().respawn_delay_ticks,
        });
    }

    // -- hooks -------------------------------------------------------------

    fn run_on_created(&mut self, id: PropId, reason: CreateReason) {
        let Some(mut prop) = self.props.remove(&id) else {
            return;
        };
        let mut ctx = HookCtx {
            tick: self.current_tick,
            layout: &self.layout,
            others: &self.props,
            rng: &mut self.rng,
            queue: &mut self.action_queue,
        };
        catalog::on_created(&mut prop, reason, &mut ctx);
        self.props.insert(id, prop);
    }

    fn run_on_tick(&mut self, id: PropId) {
        let Some(mut prop) = self.props.remove(&id) else {
            return;
        };
        let mut ctx = HookCtx {
            tick: self.current_tick,
            layout: &self.layout,
            others: &self.props,
            rng: &mut self.rng,
            queue: &mut self.action_queue,
        };
        catalog::on_tick(&mut prop, &mut ctx);
        self.props.insert(id, prop);
        self.drain_actions();
    }

    /// Collects the overlapping pairs once, then dispatches both sides
    /// with liveness and whitelist checks per dispatch.
    fn collision_pass(&mut self) {
        let mut entries = Vec::new();
        for id in &self.order {
            let Some(prop) = self.props.get(id) else {
                continue;
            };
            let Some(aabb) = prop.footprint() else {
                continue;
            };
            let group = prop
                .collidable
                .as_ref()
                .and_then(|c| c.col_group.clone());
            entries.push((*id, aabb, group));
        }

        let mut pairs = Vec::new();
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (a, b) = (&entries[i], &entries[j]);
                if let (Some(ga), Some(gb)) = (&a.2, &b.2) {
                    if ga == gb {
                        continue;
                    }
                }
                if a.1.overlaps(&b.1) {
                    pairs.push((a.0, b.0));
                }
            }
        }

        for (a, b) in pairs {
            self.run_on_collide(a, b);
            self.run_on_collide(b, a);
        }
    }

    fn run_on_collide(&mut self, subject: PropId, object: PropId) {
        let admits = match (self.props.get(&subject), self.props.get(&object)) {
            (Some(s), Some(o)) => s.collidable.as_ref().is_some_and(|c| c.admits(o.kind)),
            // One side died earlier in the pass.
            _ => return,
        };
        if !admits {
            return;
        }
        let Some(mut prop) = self.props.remove(&subject) else {
            return;
        };
        {
            let Some(other) = self.props.get(&object) else {
                self.props.insert(subject, prop);
                return;
            };
            let mut ctx = HookCtx {
                tick: self.current_tick,
                layout: &self.layout,
                others: &self.props,
                rng: &mut self.rng,
                queue: &mut self.action_queue,
            };
            catalog::on_collide(&mut prop, other, &mut ctx);
        }
        self.props.insert(subject, prop);
        self.drain_actions();
    }

    /// Applies queued hook actions until none remain. Actions may queue
    /// further actions; the loop follows them to quiescence.
    fn drain_actions(&mut self) {
        while let Some(action) = self.action_queue.pop_front() {
            match action {
                QueuedAction::Spawn { kind, overrides } => {
                    self.spawn_prop_action(kind, overrides);
                }
                QueuedAction::Destroy { id, reason } => self.destroy_prop_action(id, reason),
                QueuedAction::Mutate { id, patch } => {
                    self.mutate_prop_behaviour_action(id, patch)
                }
                QueuedAction::Animate { id, name } => self.animate_prop_action(id, &name),
                QueuedAction::Notify {
                    message,
                    kind,
                    target,
                } => {
                    let target = target.map(Target::Client).unwrap_or(Target::All);
                    self.send_notification(&message, kind, target);
                }
                QueuedAction::Sound { sound } => self.produce_sound(&sound),
            }
        }
    }

    // -- replication -------------------------------------------------------

    /// Folds the tick's accumulated changes into one broadcast batch, plus
    /// a personal full snapshot for every client owed a sync.
    fn compose_diff(&mut self) {
        let created = std::mem::take(&mut self.created);
        let updates = std::mem::take(&mut self.updates);
        let destroyed = std::mem::take(&mut self.destroyed);
        let anims = std::mem::take(&mut self.anims);
        let pending = std::mem::take(&mut self.pending_sync);

        let mut batch = DiffBatch {
            anim: anims,
            ..Default::default()
        };
        for id in &created {
            if let Some(prop) = self.props.get(id) {
                batch.load.insert(id.to_string(), prop.snapshot());
            }
        }
        for (id, set) in updates {
            // Mutations of a prop spawned this tick are already inside its
            // load snapshot.
            if created.contains(&id) {
                continue;
            }
            batch.update.insert(id.to_string(), set);
        }
        batch.delete = destroyed.iter().map(|id| id.to_string()).collect();

        if !batch.is_empty() {
            self.sink.deliver(SceneOutput::Diff {
                target: Target::All,
                batch,
            });
        }

        for client in pending {
            let mut full = DiffBatch::default();
            for prop in self.props() {
                full.load.insert(prop.id.to_string(), prop.snapshot());
            }
            self.sink.deliver(SceneOutput::Diff {
                target: Target::Client(client),
                batch: full,
            });
        }
    }
}

/// Owns the scene on a dedicated task: drains queued commands, then steps
/// the simulation, once per tick interval.
pub async fn scene_task(
    mut scene: Scene,
    mut commands: mpsc::Receiver<SceneCommand>,
    tick_interval: Duration,
) {
    info!(
        tick_ms = tick_interval.as_millis() as u64,
        "scene task started"
    );
    let mut interval = tokio::time::interval(tick_interval);
    loop {
        interval.tick().await;
        while let Ok(command) = commands.try_recv() {
            scene.apply_command(command);
        }
        scene.tick();
    }
}
