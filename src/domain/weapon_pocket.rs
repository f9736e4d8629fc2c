// Per-player weapon inventory with a hard slot cap. Cooldowns live here so
// weapon switching cannot reset them.

use crate::domain::catalog::weapons::WeaponKind;

pub const POCKET_CAPACITY: usize = 2;

#[derive(Debug, Clone)]
struct PocketSlot {
    kind: WeaponKind,
    ready_at: u64,
}

/// What a pickup did to the pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupOutcome {
    Added,
    Replaced(WeaponKind),
    AlreadyCarried,
}

#[derive(Debug, Clone)]
pub struct WeaponPocket {
    slots: Vec<PocketSlot>,
    current: usize,
}

impl WeaponPocket {
    /// Fresh pocket holding only the melee fallback.
    pub fn new() -> Self {
        Self {
            slots: vec![PocketSlot {
                kind: WeaponKind::Melee,
                ready_at: 0,
            }],
            current: 0,
        }
    }

    pub fn current(&self) -> WeaponKind {
        self.slots[self.current].kind
    }

    pub fn kinds(&self) -> Vec<WeaponKind> {
        self.slots.iter().map(|s| s.kind).collect()
    }

    /// Fires the current weapon if its cooldown has elapsed, arming the
    /// cooldown again. Returns the kind that fired.
    pub fn try_fire(&mut self, tick: u64) -> Option<WeaponKind> {
        let slot = &mut self.slots[self.current];
        if tick < slot.ready_at {
            return None;
        }
        slot.ready_at = tick + slot.kind.spec().cooldown_ticks;
        Some(slot.kind)
    }

    /// Adds a weapon and makes it current. With the pocket full, melee is
    /// evicted first when present, otherwise the selected weapon goes.
    pub fn pick_up(&mut self, kind: WeaponKind, tick: u64) -> PickupOutcome {
        if let Some(i) = self.slots.iter().position(|s| s.kind == kind) {
            self.current = i;
            return PickupOutcome::AlreadyCarried;
        }
        if self.slots.len() < POCKET_CAPACITY {
            self.slots.push(PocketSlot {
                kind,
                ready_at: tick,
            });
            self.current = self.slots.len() - 1;
            return PickupOutcome::Added;
        }
        let evict = self
            .slots
            .iter()
            .position(|s| s.kind == WeaponKind::Melee)
            .unwrap_or(self.current);
        let evicted = self.slots[evict].kind;
        self.slots[evict] = PocketSlot {
            kind,
            ready_at: tick,
        };
        self.current = evict;
        PickupOutcome::Replaced(evicted)
    }

    /// Cycles to the next held weapon.
    pub fn switch_next(&mut self) {
        if !self.slots.is_empty() {
            self.current = (self.current + 1) % self.slots.len();
        }
    }

    /// Selects `kind` if it is held; otherwise the selection stays.
    pub fn select(&mut self, kind: WeaponKind) {
        if let Some(i) = self.slots.iter().position(|s| s.kind == kind) {
            self.current = i;
        }
    }

    /// Rebuilds the pocket to match a replicated weapon list, keeping the
    /// running cooldowns of every kind that survives.
    pub fn reconcile(&mut self, kinds: &[WeaponKind], current: Option<WeaponKind>) {
        let old = std::mem::take(&mut self.slots);
        self.slots = kinds
            .iter()
            .map(|&kind| PocketSlot {
                kind,
                ready_at: old
                    .iter()
                    .find(|s| s.kind == kind)
                    .map(|s| s.ready_at)
                    .unwrap_or(0),
            })
            .collect();
        if self.slots.is_empty() {
            self.slots.push(PocketSlot {
                kind: WeaponKind::Melee,
                ready_at: 0,
            });
        }
        self.current = current
            .and_then(|c| self.slots.iter().position(|s| s.kind == c))
            .unwrap_or(0);
    }
}

impl Default for WeaponPocket {
    fn default() -> Self {
        Self::new()
    }
}
