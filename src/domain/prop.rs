// Props are the only entity the scene simulates: an id, a kind, and an
// open set of optional behaviour fragments.

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::domain::behaviour::{
    Collidable, Controlled, Damageable, Damaging, Drawable, Expires, HasMaster, Moving, NameTagged,
    Positioned, Spawner,
};
use crate::domain::catalog::PropKind;
use crate::domain::catalog::weapons::WeaponKind;
use crate::domain::physics::Aabb;
use crate::domain::weapon_pocket::WeaponPocket;

/// Scene-unique prop identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropId(Uuid);

impl PropId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PropId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PropId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Serialize for PropId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identity of a connected client, assigned at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Serialize for ClientId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Pickup payload carried by item props.
#[derive(Debug, Clone, Copy)]
pub struct Loot {
    pub weapon: WeaponKind,
}

#[derive(Debug, Clone)]
pub struct Prop {
    pub id: PropId,
    pub kind: PropKind,
    pub positioned: Option<Positioned>,
    pub drawable: Option<Drawable>,
    pub collidable: Option<Collidable>,
    pub damageable: Option<Damageable>,
    pub damaging: Option<Damaging>,
    pub controlled: Option<Controlled>,
    pub moving: Option<Moving>,
    pub spawner: Option<Spawner>,
    pub has_master: Option<HasMaster>,
    pub name_tagged: Option<NameTagged>,
    pub expires: Option<Expires>,
    pub pocket: Option<WeaponPocket>,
    pub loot: Option<Loot>,
}

impl Prop {
    /// Bare prop with a fresh id and no behaviours. Kind defaults are
    /// filled in by the catalog.
    pub fn new(kind: PropKind) -> Self {
        Self {
            id: PropId::new(),
            kind,
            positioned: None,
            drawable: None,
            collidable: None,
            damageable: None,
            damaging: None,
            controlled: None,
            moving: None,
            spawner: None,
            has_master: None,
            name_tagged: None,
            expires: None,
            pocket: None,
            loot: None,
        }
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.controlled.as_ref().map(|c| c.client_id)
    }

    pub fn master(&self) -> Option<PropId> {
        self.has_master.as_ref().map(|h| h.master)
    }

    pub fn name_tag(&self) -> Option<&str> {
        self.name_tagged.as_ref().map(|n| n.tag.as_str())
    }

    /// World-space collision box, when both position and collidable exist.
    pub fn footprint(&self) -> Option<Aabb> {
        match (&self.positioned, &self.collidable) {
            (Some(pos), Some(col)) => Some(Aabb::from_parts(pos, col)),
            _ => None,
        }
    }

    /// Full client-facing view of this prop, used by diff loads.
    pub fn snapshot(&self) -> PropSnapshot {
        PropSnapshot {
            id: self.id,
            kind: self.kind.name(),
            behaviours: BehaviourSet {
                positioned: self.positioned.clone(),
                drawable: self.drawable.clone(),
                collidable: self.collidable.clone(),
                damageable: self.damageable.clone(),
                damaging: self.damaging.clone(),
                moving: self.moving.clone(),
                controlled: self.controlled.as_ref().map(|c| ControlledView {
                    client_id: c.client_id,
                }),
                name_tagged: self.name_tagged.clone(),
                pocket: self.pocket.as_ref().map(|p| PocketView {
                    current: p.current(),
                    weapons: p.kinds(),
                }),
            },
        }
    }
}

/// Serialized form of a prop inside a diff `load`.
#[derive(Debug, Clone, Serialize)]
pub struct PropSnapshot {
    #[serde(skip)]
    pub id: PropId,
    pub kind: &'static str,
    pub behaviours: BehaviourSet,
}

/// The client-relevant behaviours of one prop. Server-side bookkeeping
/// fragments (spawner, master links, expiry) stay off the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviourSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positioned: Option<Positioned>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawable: Option<Drawable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collidable: Option<Collidable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damageable: Option<Damageable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damaging: Option<Damaging>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moving: Option<Moving>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controlled: Option<ControlledView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_tagged: Option<NameTagged>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pocket: Option<PocketView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlledView {
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
}

#[derive(Debug, Clone, Serialize)]
pub struct PocketView {
    pub current: WeaponKind,
    pub weapons: Vec<WeaponKind>,
}

/// Spawn-time adjustments layered over a kind's catalog defaults. Whole
/// fragments replace; the smaller fields reach into an existing fragment.
#[derive(Debug, Clone, Default)]
pub struct PropOverrides {
    pub positioned: Option<Positioned>,
    pub moving: Option<Moving>,
    pub controlled: Option<Controlled>,
    pub name_tagged: Option<NameTagged>,
    pub damaging: Option<Damaging>,
    pub spawner: Option<Spawner>,
    pub col_group: Option<String>,
    pub master: Option<PropId>,
    pub expires_at: Option<u64>,
    pub loot: Option<Loot>,
}

impl PropOverrides {
    pub fn apply(self, prop: &mut Prop) {
        if let Some(positioned) = self.positioned {
            prop.positioned = Some(positioned);
        }
        if let Some(moving) = self.moving {
            prop.moving = Some(moving);
        }
        if let Some(controlled) = self.controlled {
            prop.controlled = Some(controlled);
        }
        if let Some(name_tagged) = self.name_tagged {
            prop.name_tagged = Some(name_tagged);
        }
        if let Some(damaging) = self.damaging {
            prop.damaging = Some(damaging);
        }
        if let Some(spawner) = self.spawner {
            prop.spawner = Some(spawner);
        }
        if let Some(group) = self.col_group {
            if let Some(col) = prop.collidable.as_mut() {
                col.col_group = Some(group);
            }
        }
        if let Some(master) = self.master {
            prop.has_master = Some(HasMaster { master });
        }
        if let Some(at_tick) = self.expires_at {
            prop.expires = Some(Expires { at_tick });
        }
        if let Some(loot) = self.loot {
            prop.loot = Some(loot);
        }
    }
}
