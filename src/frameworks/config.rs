use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn game_port() -> u16 {
    env::var("GAME_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4000)
}

pub fn stage_name() -> String {
    env::var("STAGE_NAME").unwrap_or_else(|_| "rooftops".to_string())
}

pub fn stage_dir() -> String {
    env::var("STAGE_DIR").unwrap_or_else(|_| "stages".to_string())
}

pub fn max_players() -> usize {
    env::var("MAX_PLAYERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(12)
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(32);
// Ticks between disaster rolls; just under half a minute at 32ms.
pub const DISASTER_INTERVAL_TICKS: u64 = 900;
