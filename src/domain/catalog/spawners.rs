// Item spawners. Invisible markers that keep exactly one live child item
// in the world, spawning a replacement after a delay once it is consumed.

use rand::Rng;

use crate::domain::behaviour::Positioned;
use crate::domain::catalog::{HookCtx, PropKind, weapons::WeaponKind};
use crate::domain::prop::{Loot, Prop, PropOverrides};

pub fn defaults(_prop: &mut Prop) {
    // Position and spawner config always come from stage data, so the
    // catalog has nothing to add.
}

pub fn on_tick(prop: &mut Prop, ctx: &mut HookCtx) {
    let id = prop.id;
    let Some(spawner) = prop.spawner.as_mut() else {
        return;
    };

    let child_alive = ctx.others.values().any(|p| p.master() == Some(id));
    if child_alive {
        // Keep the timer pushed out so the replacement lands a full
        // interval after the current child goes away.
        spawner.next_spawn_tick = ctx.tick + spawner.interval;
        return;
    }
    if ctx.tick < spawner.next_spawn_tick {
        return;
    }

    let loot = match spawner.child_kind {
        PropKind::WeaponCrate => {
            let weapon = spawner.crate_weapon.unwrap_or_else(|| {
                let pool = WeaponKind::pickups();
                pool[ctx.rng.gen_range(0..pool.len())]
            });
            Some(Loot { weapon })
        }
        _ => None,
    };
    let positioned = prop
        .positioned
        .clone()
        .map(|p| Positioned::new(p.pos_x, p.pos_y));
    ctx.spawn(
        spawner.child_kind,
        PropOverrides {
            positioned,
            master: Some(id),
            loot,
            ..Default::default()
        },
    );
    spawner.next_spawn_tick = ctx.tick + spawner.interval;
}
