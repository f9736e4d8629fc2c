// Pure simulation model: props, behaviours, the tile layout, and movement
// resolution. Nothing here knows about sockets or serial formats beyond
// the serde derives on wire-visible fragments.

pub mod behaviour;
pub mod catalog;
pub mod layout;
pub mod physics;
pub mod prop;
pub mod tuning;
pub mod weapon_pocket;

pub use prop::{ClientId, Prop, PropId};
