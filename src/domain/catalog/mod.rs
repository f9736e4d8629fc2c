// The closed prop catalog. Every kind the scene can spawn is listed here,
// together with the lifecycle hook dispatch and the queued-action type
// hooks use to feed changes back into the scene.

pub mod hazards;
pub mod items;
pub mod player;
pub mod projectiles;
pub mod spawners;
pub mod weapons;

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;

use crate::domain::behaviour::{
    BehaviourPatch, DamageablePatch, InputStatus, Positioned,
};
use crate::domain::layout::TileLayout;
use crate::domain::prop::{ClientId, Prop, PropId, PropOverrides};

/// Every prop kind the scene knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    Player,
    Bullet,
    Pellet,
    Grenade,
    Blast,
    Slash,
    WeaponCrate,
    Medkit,
    ItemSpawner,
    Bomb,
    Flame,
}

impl PropKind {
    /// Resolves a kind by its stage-data name. Unknown names are a data
    /// error at the caller.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "player" => Some(PropKind::Player),
            "bullet" => Some(PropKind::Bullet),
            "pellet" => Some(PropKind::Pellet),
            "grenade" => Some(PropKind::Grenade),
            "blast" => Some(PropKind::Blast),
            "slash" => Some(PropKind::Slash),
            "weapon_crate" => Some(PropKind::WeaponCrate),
            "medkit" => Some(PropKind::Medkit),
            "item_spawner" => Some(PropKind::ItemSpawner),
            "bomb" => Some(PropKind::Bomb),
            "flame" => Some(PropKind::Flame),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PropKind::Player => "player",
            PropKind::Bullet => "bullet",
            PropKind::Pellet => "pellet",
            PropKind::Grenade => "grenade",
            PropKind::Blast => "blast",
            PropKind::Slash => "slash",
            PropKind::WeaponCrate => "weapon_crate",
            PropKind::Medkit => "medkit",
            PropKind::ItemSpawner => "item_spawner",
            PropKind::Bomb => "bomb",
            PropKind::Flame => "flame",
        }
    }
}

/// Why a prop came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateReason {
    StagePreload,
    Spawned,
    Connected,
    Respawned,
}

/// Why a prop is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    Killed,
    Expired,
    Consumed,
    Disconnected,
    Removed,
}

/// Scene change requested by a hook. The scene applies the queue right
/// after the hook that pushed it returns.
#[derive(Debug)]
pub enum QueuedAction {
    Spawn {
        kind: PropKind,
        overrides: PropOverrides,
    },
    Destroy {
        id: PropId,
        reason: DestroyReason,
    },
    Mutate {
        id: PropId,
        patch: BehaviourPatch,
    },
    Animate {
        id: PropId,
        name: String,
    },
    Notify {
        message: String,
        kind: &'static str,
        target: Option<ClientId>,
    },
    Sound {
        sound: String,
    },
}

/// What a hook sees of the scene: read access to every other prop, the
/// layout, and a queue for the changes it wants made.
pub struct HookCtx<'a> {
    pub tick: u64,
    pub layout: &'a TileLayout,
    pub others: &'a HashMap<PropId, Prop>,
    pub rng: &'a mut StdRng,
    pub queue: &'a mut VecDeque<QueuedAction>,
}

impl HookCtx<'_> {
    pub fn spawn(&mut self, kind: PropKind, overrides: PropOverrides) {
        self.queue.push_back(QueuedAction::Spawn { kind, overrides });
    }

    pub fn destroy(&mut self, id: PropId, reason: DestroyReason) {
        self.queue.push_back(QueuedAction::Destroy { id, reason });
    }

    pub fn mutate(&mut self, id: PropId, patch: BehaviourPatch) {
        self.queue.push_back(QueuedAction::Mutate { id, patch });
    }

    pub fn animate(&mut self, id: PropId, name: &str) {
        self.queue.push_back(QueuedAction::Animate {
            id,
            name: name.to_string(),
        });
    }

    pub fn notify(&mut self, message: String, kind: &'static str, target: Option<ClientId>) {
        self.queue.push_back(QueuedAction::Notify {
            message,
            kind,
            target,
        });
    }

    pub fn sound(&mut self, sound: &str) {
        self.queue.push_back(QueuedAction::Sound {
            sound: sound.to_string(),
        });
    }

    /// Display name of the prop `id`, when it is still alive and tagged.
    pub fn name_of(&self, id: PropId) -> Option<String> {
        self.others
            .get(&id)
            .and_then(|p| p.name_tag())
            .map(|t| t.to_string())
    }
}

/// Builds a prop of `kind` with its catalog default behaviours.
pub fn default_prop(kind: PropKind) -> Prop {
    let mut prop = Prop::new(kind);
    match kind {
        PropKind::Player => player::defaults(&mut prop),
        PropKind::Bullet | PropKind::Pellet | PropKind::Grenade | PropKind::Blast
        | PropKind::Slash => projectiles::defaults(&mut prop),
        PropKind::WeaponCrate | PropKind::Medkit => items::defaults(&mut prop),
        PropKind::ItemSpawner => spawners::defaults(&mut prop),
        PropKind::Bomb | PropKind::Flame => hazards::defaults(&mut prop),
    }
    prop
}

pub fn on_created(prop: &mut Prop, reason: CreateReason, ctx: &mut HookCtx) {
    match prop.kind {
        PropKind::Player => player::on_created(prop, reason, ctx),
        PropKind::Blast => projectiles::blast_on_created(prop, ctx),
        _ => {}
    }
}

pub fn on_tick(prop: &mut Prop, ctx: &mut HookCtx) {
    match prop.kind {
        PropKind::Player => player::on_tick(prop, ctx),
        PropKind::Bullet | PropKind::Pellet | PropKind::Grenade | PropKind::Blast
        | PropKind::Slash => projectiles::on_tick(prop, ctx),
        PropKind::WeaponCrate | PropKind::Medkit => items::on_tick(prop, ctx),
        PropKind::ItemSpawner => spawners::on_tick(prop, ctx),
        PropKind::Bomb => hazards::bomb_on_tick(prop, ctx),
        PropKind::Flame => hazards::flame_on_tick(prop, ctx),
    }
}

pub fn on_collide(prop: &mut Prop, other: &Prop, ctx: &mut HookCtx) {
    match prop.kind {
        PropKind::Bullet | PropKind::Pellet | PropKind::Slash => {
            projectiles::hit_on_collide(prop, other, ctx)
        }
        PropKind::Grenade => projectiles::grenade_on_collide(prop, other, ctx),
        PropKind::WeaponCrate => items::crate_on_collide(prop, other, ctx),
        PropKind::Medkit => items::medkit_on_collide(prop, other, ctx),
        PropKind::Bomb => hazards::bomb_on_collide(prop, other, ctx),
        PropKind::Flame => hazards::flame_on_collide(prop, other, ctx),
        _ => {}
    }
}

pub fn on_destroyed(prop: &mut Prop, reason: DestroyReason, ctx: &mut HookCtx) {
    match prop.kind {
        PropKind::Grenade => projectiles::grenade_on_destroyed(prop, reason, ctx),
        _ => {}
    }
}

/// Routes one client input event into the prop's controlled fragment.
pub fn on_receive(prop: &mut Prop, code: &str, status: InputStatus) {
    if prop.kind == PropKind::Player {
        player::on_receive(prop, code, status);
    }
}

/// Queues a position mutation when the integer-rounded position moved
/// since the last report. Shared by everything that travels.
pub(crate) fn report_position(id: PropId, pos: &mut Positioned, ctx: &mut HookCtx) {
    let rounded = pos.rounded();
    if pos.last_sent == Some(rounded) {
        return;
    }
    pos.last_sent = Some(rounded);
    ctx.mutate(
        id,
        BehaviourPatch::Positioned(crate::domain::behaviour::PositionedPatch {
            pos_x: Some(rounded.0 as f64),
            pos_y: Some(rounded.1 as f64),
        }),
    );
}

/// Queues damage against `victim` and tags it with the damager's display
/// name for the kill feed. The victim notices a lethal total on its next
/// tick and retires itself.
pub(crate) fn deal_damage(victim: &Prop, amount: i32, damager: Option<String>, ctx: &mut HookCtx) {
    let Some(damageable) = &victim.damageable else {
        return;
    };
    deal_damage_to(victim.id, damageable.hp, amount, damager, ctx);
}

/// Same as [`deal_damage`] for callers that already detached the victim's
/// id and hit points from the prop map.
pub(crate) fn deal_damage_to(
    id: PropId,
    current_hp: i32,
    amount: i32,
    damager: Option<String>,
    ctx: &mut HookCtx,
) {
    ctx.mutate(
        id,
        BehaviourPatch::Damageable(DamageablePatch {
            hp: Some(current_hp - amount),
            last_damager: damager,
        }),
    );
    ctx.animate(id, "hurt");
}

/// Name used in the kill feed for damage dealt by `prop`: its master's
/// name tag when the master is still around, otherwise its own.
pub(crate) fn damager_name(prop: &Prop, ctx: &HookCtx) -> Option<String> {
    prop.master()
        .and_then(|m| ctx.name_of(m))
        .or_else(|| prop.name_tag().map(|t| t.to_string()))
}
