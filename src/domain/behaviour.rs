// Behaviour fragments: the typed capability data a prop may carry, plus the
// partial patches the mutate path records for replication.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::PropKind;
use crate::domain::catalog::weapons::WeaponKind;
use crate::domain::prop::{ClientId, PropId};

/// Horizontal orientation used by drawables and aiming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// Unit direction on the X axis (+1.0 right, -1.0 left).
    pub fn dir(self) -> f64 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// World position in pixels. The anchor is the top-left corner of the
/// nominal sprite cell; collidables describe their box relative to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Positioned {
    pub pos_x: f64,
    pub pos_y: f64,
    // Last integer position reported through the mutate path. Replication
    // bookkeeping only, never on the wire.
    #[serde(skip)]
    pub last_sent: Option<(i64, i64)>,
}

impl Positioned {
    pub fn new(pos_x: f64, pos_y: f64) -> Self {
        Self {
            pos_x,
            pos_y,
            last_sent: None,
        }
    }

    pub fn rounded(&self) -> (i64, i64) {
        (self.pos_x.round() as i64, self.pos_y.round() as i64)
    }
}

/// Client-side rendering hints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawable {
    pub sprite: String,
    pub facing: Facing,
}

impl Drawable {
    pub fn new(sprite: &str) -> Self {
        Self {
            sprite: sprite.to_string(),
            facing: Facing::Right,
        }
    }
}

/// Collision box relative to the position anchor. `col_group` excludes
/// mutual collisions within a group (a projectile and its owner);
/// `whitelist` restricts which prop kinds may trigger this side's
/// collision hook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collidable {
    pub size_x: f64,
    pub size_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<&'static str>>,
}

impl Collidable {
    pub fn new(size_x: f64, size_y: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            size_x,
            size_y,
            offset_x,
            offset_y,
            col_group: None,
            whitelist: None,
        }
    }

    pub fn with_whitelist(mut self, kinds: Vec<&'static str>) -> Self {
        self.whitelist = Some(kinds);
        self
    }

    /// True when `kind` may trigger this collidable's hook.
    pub fn admits(&self, kind: PropKind) -> bool {
        match &self.whitelist {
            Some(kinds) => kinds.contains(&kind.name()),
            None => true,
        }
    }
}

/// Hit points. `last_damager` remembers the display name of whoever dealt
/// the most recent damage, for the kill feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Damageable {
    pub hp: i32,
    pub max_hp: i32,
    #[serde(skip)]
    pub last_damager: Option<String>,
}

impl Damageable {
    pub fn new(max_hp: i32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            last_damager: None,
        }
    }
}

/// Damage dealt on contact, per collision pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Damaging {
    pub damage: i32,
}

/// Input state routed from a connected client. Only the owning client id is
/// replicated; held keys and pending edge events are server-side.
#[derive(Debug, Clone)]
pub struct Controlled {
    pub client_id: ClientId,
    pub held: HeldInputs,
    pub pending: PendingInputs,
}

impl Controlled {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            held: HeldInputs::default(),
            pending: PendingInputs::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeldInputs {
    pub left: bool,
    pub right: bool,
    pub duck: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PendingInputs {
    pub jump: bool,
    pub fire: bool,
    pub switch: bool,
}

impl PendingInputs {
    /// Consumes all edge events accumulated since the last tick.
    pub fn take(&mut self) -> PendingInputs {
        std::mem::take(self)
    }
}

/// `pressed`/`released` state of a client input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputStatus {
    Pressed,
    Released,
}

/// Velocities in pixels per tick plus the flags the layout resolver keeps
/// up to date. `drop_through` marks deliberate descent through semi tiles.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Moving {
    pub vel_x: f64,
    pub vel_y: f64,
    pub grounded: bool,
    pub drop_through: bool,
}

/// Periodic child production. The child carries a `has_master` back
/// reference; the spawner stays idle while that child is alive.
#[derive(Debug, Clone)]
pub struct Spawner {
    pub child_kind: PropKind,
    pub crate_weapon: Option<WeaponKind>,
    pub interval: u64,
    pub next_spawn_tick: u64,
}

/// Back reference to the prop that created this one.
#[derive(Debug, Clone, Copy)]
pub struct HasMaster {
    pub master: PropId,
}

/// Display name shown above the prop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameTagged {
    pub tag: String,
}

/// Tick at which the owning kind retires the prop.
#[derive(Debug, Clone, Copy)]
pub struct Expires {
    pub at_tick: u64,
}

// ---------------------------------------------------------------------------
// Partial patches. These are what the mutate action applies and what the
// update member of a diff carries: only the fields that actually changed.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_y: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawablePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<Facing>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageablePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp: Option<i32>,
    // Kill attribution travels with the damage but stays off the wire.
    #[serde(skip)]
    pub last_damager: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vel_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vel_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_through: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameTaggedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PocketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapons: Option<Vec<WeaponKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<WeaponKind>,
}

/// One named behaviour patch, the unit the mutate action accepts.
#[derive(Debug, Clone)]
pub enum BehaviourPatch {
    Positioned(PositionedPatch),
    Drawable(DrawablePatch),
    Damageable(DamageablePatch),
    Moving(MovingPatch),
    NameTagged(NameTaggedPatch),
    Pocket(PocketPatch),
}

impl BehaviourPatch {
    pub fn name(&self) -> &'static str {
        match self {
            BehaviourPatch::Positioned(_) => "positioned",
            BehaviourPatch::Drawable(_) => "drawable",
            BehaviourPatch::Damageable(_) => "damageable",
            BehaviourPatch::Moving(_) => "moving",
            BehaviourPatch::NameTagged(_) => "nameTagged",
            BehaviourPatch::Pocket(_) => "pocket",
        }
    }

    /// Writes the patched fields into the matching fragment. Returns false
    /// when the prop does not carry that behaviour, leaving it untouched.
    pub fn apply(&self, prop: &mut crate::domain::prop::Prop) -> bool {
        match self {
            BehaviourPatch::Positioned(p) => {
                let Some(f) = prop.positioned.as_mut() else {
                    return false;
                };
                if let Some(x) = p.pos_x {
                    f.pos_x = x;
                }
                if let Some(y) = p.pos_y {
                    f.pos_y = y;
                }
            }
            BehaviourPatch::Drawable(p) => {
                let Some(f) = prop.drawable.as_mut() else {
                    return false;
                };
                if let Some(sprite) = &p.sprite {
                    f.sprite = sprite.clone();
                }
                if let Some(facing) = p.facing {
                    f.facing = facing;
                }
            }
            BehaviourPatch::Damageable(p) => {
                let Some(f) = prop.damageable.as_mut() else {
                    return false;
                };
                if let Some(hp) = p.hp {
                    f.hp = hp.min(f.max_hp);
                }
                if let Some(damager) = &p.last_damager {
                    f.last_damager = Some(damager.clone());
                }
            }
            BehaviourPatch::Moving(p) => {
                let Some(f) = prop.moving.as_mut() else {
                    return false;
                };
                if let Some(vx) = p.vel_x {
                    f.vel_x = vx;
                }
                if let Some(vy) = p.vel_y {
                    f.vel_y = vy;
                }
                if let Some(grounded) = p.grounded {
                    f.grounded = grounded;
                }
                if let Some(drop) = p.drop_through {
                    f.drop_through = drop;
                }
            }
            BehaviourPatch::NameTagged(p) => {
                let Some(f) = prop.name_tagged.as_mut() else {
                    return false;
                };
                if let Some(tag) = &p.tag {
                    f.tag = tag.clone();
                }
            }
            BehaviourPatch::Pocket(p) => {
                let Some(pocket) = prop.pocket.as_mut() else {
                    return false;
                };
                match (&p.weapons, p.current) {
                    (Some(kinds), current) => pocket.reconcile(kinds, current),
                    (None, Some(current)) => pocket.select(current),
                    (None, None) => {}
                }
            }
        }
        true
    }
}

/// Per-prop accumulation of patches over one tick. Later writes to the same
/// field overwrite earlier ones; untouched fields stay untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positioned: Option<PositionedPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawable: Option<DrawablePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damageable: Option<DamageablePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moving: Option<MovingPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_tagged: Option<NameTaggedPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pocket: Option<PocketPatch>,
}

impl PatchSet {
    pub fn merge(&mut self, patch: &BehaviourPatch) {
        match patch {
            BehaviourPatch::Positioned(p) => {
                let slot = self.positioned.get_or_insert_with(Default::default);
                overlay(&mut slot.pos_x, &p.pos_x);
                overlay(&mut slot.pos_y, &p.pos_y);
            }
            BehaviourPatch::Drawable(p) => {
                let slot = self.drawable.get_or_insert_with(Default::default);
                overlay(&mut slot.sprite, &p.sprite);
                overlay(&mut slot.facing, &p.facing);
            }
            BehaviourPatch::Damageable(p) => {
                let slot = self.damageable.get_or_insert_with(Default::default);
                overlay(&mut slot.hp, &p.hp);
                overlay(&mut slot.last_damager, &p.last_damager);
            }
            BehaviourPatch::Moving(p) => {
                let slot = self.moving.get_or_insert_with(Default::default);
                overlay(&mut slot.vel_x, &p.vel_x);
                overlay(&mut slot.vel_y, &p.vel_y);
                overlay(&mut slot.grounded, &p.grounded);
                overlay(&mut slot.drop_through, &p.drop_through);
            }
            BehaviourPatch::NameTagged(p) => {
                let slot = self.name_tagged.get_or_insert_with(Default::default);
                overlay(&mut slot.tag, &p.tag);
            }
            BehaviourPatch::Pocket(p) => {
                let slot = self.pocket.get_or_insert_with(Default::default);
                overlay(&mut slot.weapons, &p.weapons);
                overlay(&mut slot.current, &p.current);
            }
        }
    }
}

fn overlay<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *slot = value.clone();
    }
}
