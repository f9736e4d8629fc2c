// Pickup items. Both kinds fall until grounded and are consumed by the
// first player to touch them.

use crate::domain::behaviour::{BehaviourPatch, Collidable, DamageablePatch, Drawable, Moving, PocketPatch};
use crate::domain::catalog::{self, DestroyReason, HookCtx, PropKind};
use crate::domain::physics;
use crate::domain::prop::Prop;
use crate::domain::tuning::{GravityTuning, ItemTuning};

pub fn defaults(prop: &mut Prop) {
    match prop.kind {
        PropKind::WeaponCrate => {
            prop.drawable = Some(Drawable::new("weapon_crate"));
            prop.collidable =
                Some(Collidable::new(24.0, 20.0, 4.0, 12.0).with_whitelist(vec!["player"]));
            prop.moving = Some(Moving::default());
        }
        PropKind::Medkit => {
            prop.drawable = Some(Drawable::new("medkit"));
            prop.collidable =
                Some(Collidable::new(20.0, 14.0, 6.0, 18.0).with_whitelist(vec!["player"]));
            prop.moving = Some(Moving::default());
        }
        _ => {}
    }
}

pub fn on_tick(prop: &mut Prop, ctx: &mut HookCtx) {
    let id = prop.id;
    let (Some(pos), Some(col), Some(mov)) = (
        prop.positioned.as_mut(),
        prop.collidable.as_ref(),
        prop.moving.as_mut(),
    ) else {
        return;
    };
    if mov.grounded {
        return;
    }
    let gravity = GravityTuning::default();
    mov.vel_y = (mov.vel_y + gravity.gravity).min(gravity.max_fall_speed);
    physics::step_movement(ctx.layout, pos, col, mov);
    catalog::report_position(id, pos, ctx);
}

/// Hands the crate's weapon to the touching player and retires the crate.
pub fn crate_on_collide(prop: &mut Prop, other: &Prop, ctx: &mut HookCtx) {
    let Some(loot) = prop.loot else {
        return;
    };
    let Some(pocket) = &other.pocket else {
        return;
    };

    let mut updated = pocket.clone();
    updated.pick_up(loot.weapon, ctx.tick);
    ctx.mutate(
        other.id,
        BehaviourPatch::Pocket(PocketPatch {
            weapons: Some(updated.kinds()),
            current: Some(updated.current()),
        }),
    );
    if let Some(client) = other.client_id() {
        ctx.notify(
            format!("picked up the {}", loot.weapon.name()),
            "info",
            Some(client),
        );
    }
    ctx.sound("pickup");
    ctx.destroy(prop.id, DestroyReason::Consumed);
}

/// Heals the touching player. A full-health player leaves the kit behind.
pub fn medkit_on_collide(prop: &mut Prop, other: &Prop, ctx: &mut HookCtx) {
    let Some(damageable) = &other.damageable else {
        return;
    };
    if damageable.hp >= damageable.max_hp {
        return;
    }
    let healed = (damageable.hp + ItemTuning::default().medkit_heal).min(damageable.max_hp);
    ctx.mutate(
        other.id,
        BehaviourPatch::Damageable(DamageablePatch {
            hp: Some(healed),
            last_damager: None,
        }),
    );
    ctx.sound("heal");
    ctx.destroy(prop.id, DestroyReason::Consumed);
}
