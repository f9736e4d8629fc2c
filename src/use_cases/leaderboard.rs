// Kill tallies. The scene only talks to the trait, so deployments can
// plug in persistence without touching the simulation.

use std::collections::HashMap;

use tracing::debug;

pub trait Leaderboard: Send {
    fn record_kill(&mut self, killer: &str, victim: &str);
    /// Kills credited to `name` so far.
    fn kills(&self, name: &str) -> u32;
}

/// In-memory tally, reset with the process.
#[derive(Debug, Default)]
pub struct MatchLeaderboard {
    kills: HashMap<String, u32>,
}

impl Leaderboard for MatchLeaderboard {
    fn record_kill(&mut self, killer: &str, victim: &str) {
        let total = self.kills.entry(killer.to_string()).or_insert(0);
        *total += 1;
        debug!(killer, victim, total = *total, "kill recorded");
    }

    fn kills(&self, name: &str) -> u32 {
        self.kills.get(name).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_per_killer() {
        let mut board = MatchLeaderboard::default();
        board.record_kill("Ana", "Bob");
        board.record_kill("Ana", "Cid");
        board.record_kill("Bob", "Ana");
        assert_eq!(board.kills("Ana"), 2);
        assert_eq!(board.kills("Bob"), 1);
        assert_eq!(board.kills("Cid"), 0);
    }
}
