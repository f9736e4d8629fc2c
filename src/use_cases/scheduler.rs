// Scene-wide event scheduler. Sits in front of the entity pass each tick
// and runs at most one disaster at a time.

use rand::Rng;
use tracing::info;

use crate::use_cases::scene::Scene;
use crate::use_cases::types::Target;

/// A stage-wide event described by three hooks over the scene. Disasters
/// keep no state of their own; anything they spawn lives as props.
#[derive(Clone)]
pub struct Disaster {
    pub name: &'static str,
    pub announcement: &'static str,
    /// Ticks between the begin and end hooks.
    pub duration: u64,
    pub begin: fn(&mut Scene),
    pub tick: fn(&mut Scene, u64),
    pub end: fn(&mut Scene),
}

impl std::fmt::Debug for Disaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disaster")
            .field("name", &self.name)
            .field("duration", &self.duration)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum SchedulerState {
    #[default]
    Idle,
    Active {
        index: usize,
        started_at: u64,
    },
}

/// Picks a random disaster from the stage's pool every `interval` ticks
/// and drives it to completion. An empty pool stays idle forever.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    disasters: Vec<Disaster>,
    interval: u64,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(disasters: Vec<Disaster>, interval: u64) -> Self {
        Self {
            disasters,
            interval,
            state: SchedulerState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SchedulerState::Active { .. })
    }

    pub fn on_tick(&mut self, scene: &mut Scene) {
        match self.state {
            SchedulerState::Idle => {
                if self.disasters.is_empty() || self.interval == 0 {
                    return;
                }
                let tick = scene.current_tick();
                if tick == 0 || tick % self.interval != 0 {
                    return;
                }
                let index = scene.rng().gen_range(0..self.disasters.len());
                let disaster = &self.disasters[index];
                info!(disaster = disaster.name, tick, "disaster begins");
                scene.send_notification(disaster.announcement, "disaster", Target::All);
                scene.produce_sound("siren");
                (disaster.begin)(scene);
                self.state = SchedulerState::Active {
                    index,
                    started_at: tick,
                };
            }
            SchedulerState::Active { index, started_at } => {
                let disaster = &self.disasters[index];
                let elapsed = scene.current_tick() - started_at;
                if elapsed > disaster.duration {
                    (disaster.end)(scene);
                    info!(disaster = disaster.name, "disaster ends");
                    self.state = SchedulerState::Idle;
                } else {
                    (disaster.tick)(scene, elapsed);
                }
            }
        }
    }
}
