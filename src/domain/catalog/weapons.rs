// The closed weapon table. Each weapon names its projectile kind, firing
// pattern, and cooldown; firing itself lives with the player entity.

use serde::Serialize;

use crate::domain::catalog::PropKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    Melee,
    Pistol,
    Scatter,
    Launcher,
}

impl WeaponKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "melee" => Some(WeaponKind::Melee),
            "pistol" => Some(WeaponKind::Pistol),
            "scatter" => Some(WeaponKind::Scatter),
            "launcher" => Some(WeaponKind::Launcher),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeaponKind::Melee => "melee",
            WeaponKind::Pistol => "pistol",
            WeaponKind::Scatter => "scatter",
            WeaponKind::Launcher => "launcher",
        }
    }

    /// Weapons that may appear inside a weapon crate. Melee is the fallback
    /// everyone always carries, so crates never grant it.
    pub fn pickups() -> &'static [WeaponKind] {
        &[WeaponKind::Pistol, WeaponKind::Scatter, WeaponKind::Launcher]
    }

    pub fn spec(self) -> &'static WeaponSpec {
        match self {
            WeaponKind::Melee => &MELEE,
            WeaponKind::Pistol => &PISTOL,
            WeaponKind::Scatter => &SCATTER,
            WeaponKind::Launcher => &LAUNCHER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeaponSpec {
    pub cooldown_ticks: u64,
    pub projectile: PropKind,
    /// Projectiles spawned per shot.
    pub shots: u32,
    /// Total vertical spread across the shots, in radians.
    pub spread: f64,
    /// Muzzle speed in pixels per tick. Zero spawns in place.
    pub speed: f64,
    /// Initial upward velocity, for lobbed projectiles.
    pub lob: f64,
    pub sound: &'static str,
    pub anim: &'static str,
}

static MELEE: WeaponSpec = WeaponSpec {
    cooldown_ticks: 12,
    projectile: PropKind::Slash,
    shots: 1,
    spread: 0.0,
    speed: 0.0,
    lob: 0.0,
    sound: "swing",
    anim: "swing",
};

static PISTOL: WeaponSpec = WeaponSpec {
    cooldown_ticks: 9,
    projectile: PropKind::Bullet,
    shots: 1,
    spread: 0.0,
    speed: 14.0,
    lob: 0.0,
    sound: "pistol_fire",
    anim: "fire",
};

static SCATTER: WeaponSpec = WeaponSpec {
    cooldown_ticks: 22,
    projectile: PropKind::Pellet,
    shots: 3,
    spread: 0.35,
    speed: 12.0,
    lob: 0.0,
    sound: "scatter_fire",
    anim: "fire",
};

static LAUNCHER: WeaponSpec = WeaponSpec {
    cooldown_ticks: 30,
    projectile: PropKind::Grenade,
    shots: 1,
    spread: 0.0,
    speed: 7.0,
    lob: -5.0,
    sound: "launcher_fire",
    anim: "fire",
};
