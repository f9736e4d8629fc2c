//! Gameplay tuning values grouped per concern, with defaults tuned for a
//! 32 pixel cell grid at a 32 ms tick.

/// Player movement and survivability.
#[derive(Debug, Clone)]
pub struct PlayerTuning {
    /// Horizontal speed in pixels per tick while grounded.
    pub walk_speed: f64,
    /// Fraction of walk speed available while airborne.
    pub air_control: f64,
    /// Initial upward velocity of a jump. Negative is up.
    pub jump_velocity: f64,
    pub max_hp: i32,
    /// Ticks between death and the replacement avatar.
    pub respawn_delay_ticks: u64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            walk_speed: 4.5,
            air_control: 0.65,
            jump_velocity: -12.0,
            max_hp: 100,
            respawn_delay_ticks: 90,
        }
    }
}

/// Shared vertical physics for everything that falls.
#[derive(Debug, Clone)]
pub struct GravityTuning {
    /// Added to vertical velocity each tick.
    pub gravity: f64,
    /// Terminal fall speed in pixels per tick.
    pub max_fall_speed: f64,
}

impl Default for GravityTuning {
    fn default() -> Self {
        Self {
            gravity: 0.9,
            max_fall_speed: 11.0,
        }
    }
}

/// Pickup and spawner behaviour.
#[derive(Debug, Clone)]
pub struct ItemTuning {
    pub medkit_heal: i32,
    /// Default ticks between a child despawning and the next spawn.
    pub spawner_interval_ticks: u64,
}

impl Default for ItemTuning {
    fn default() -> Self {
        Self {
            medkit_heal: 35,
            spawner_interval_ticks: 320,
        }
    }
}

/// Explosions and disaster hazards.
#[derive(Debug, Clone)]
pub struct HazardTuning {
    pub blast_damage: i32,
    /// Distance from blast center within which props take damage.
    pub blast_radius: f64,
    /// Damage per collision pass while touching a flame.
    pub flame_damage: i32,
    pub flame_lifetime_ticks: u64,
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self {
            blast_damage: 45,
            blast_radius: 56.0,
            flame_damage: 4,
            flame_lifetime_ticks: 100,
        }
    }
}
