// Disaster hazards: bombs dropped from above and lingering ground flames.

use crate::domain::behaviour::{Collidable, Damaging, Drawable, Moving};
use crate::domain::catalog::{self, DestroyReason, HookCtx, PropKind, projectiles};
use crate::domain::physics;
use crate::domain::prop::Prop;
use crate::domain::tuning::{GravityTuning, HazardTuning};

pub fn defaults(prop: &mut Prop) {
    match prop.kind {
        PropKind::Bomb => {
            prop.drawable = Some(Drawable::new("bomb"));
            prop.collidable =
                Some(Collidable::new(14.0, 18.0, 9.0, 7.0).with_whitelist(vec!["player"]));
            prop.moving = Some(Moving::default());
        }
        PropKind::Flame => {
            prop.drawable = Some(Drawable::new("flame"));
            prop.collidable =
                Some(Collidable::new(24.0, 22.0, 4.0, 10.0).with_whitelist(vec!["player"]));
            prop.damaging = Some(Damaging {
                damage: HazardTuning::default().flame_damage,
            });
        }
        _ => {}
    }
}

/// Bombs fall until they meet a tile, then detonate into a blast.
pub fn bomb_on_tick(prop: &mut Prop, ctx: &mut HookCtx) {
    let id = prop.id;
    {
        let (Some(pos), Some(col), Some(mov)) = (
            prop.positioned.as_mut(),
            prop.collidable.as_ref(),
            prop.moving.as_mut(),
        ) else {
            return;
        };
        let gravity = GravityTuning::default();
        mov.vel_y = (mov.vel_y + gravity.gravity).min(gravity.max_fall_speed);
        let outcome = physics::step_movement(ctx.layout, pos, col, mov);
        catalog::report_position(id, pos, ctx);
        if !outcome.hit_x && !outcome.hit_y {
            return;
        }
    }
    projectiles::spawn_blast(prop, ctx);
    ctx.destroy(id, DestroyReason::Consumed);
}

/// A direct hit detonates the bomb early.
pub fn bomb_on_collide(prop: &mut Prop, other: &Prop, ctx: &mut HookCtx) {
    if other.damageable.is_none() {
        return;
    }
    projectiles::spawn_blast(prop, ctx);
    ctx.destroy(prop.id, DestroyReason::Consumed);
}

pub fn flame_on_tick(prop: &mut Prop, ctx: &mut HookCtx) {
    if let Some(expires) = prop.expires {
        if ctx.tick >= expires.at_tick {
            ctx.destroy(prop.id, DestroyReason::Expired);
        }
    }
}

/// Flames burn whoever stands in them, every collision pass.
pub fn flame_on_collide(prop: &mut Prop, other: &Prop, ctx: &mut HookCtx) {
    let Some(damaging) = &prop.damaging else {
        return;
    };
    if other.damageable.is_none() {
        return;
    }
    catalog::deal_damage(other, damaging.damage, Some("the flames".to_string()), ctx);
}
