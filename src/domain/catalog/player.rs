// Player avatar: input-driven movement, firing, and death detection.

use crate::domain::behaviour::{
    BehaviourPatch, Collidable, Damageable, Drawable, DrawablePatch, Facing, InputStatus, Moving,
    PocketPatch, Positioned,
};
use crate::domain::catalog::{
    self, CreateReason, DestroyReason, HookCtx, projectiles,
};
use crate::domain::physics;
use crate::domain::prop::{Prop, PropOverrides};
use crate::domain::tuning::{GravityTuning, PlayerTuning};
use crate::domain::weapon_pocket::WeaponPocket;

// Muzzle position relative to the player anchor.
const MUZZLE_X: f64 = 14.0;
const MUZZLE_REACH: f64 = 20.0;
const MUZZLE_Y: f64 = 10.0;

pub fn defaults(prop: &mut Prop) {
    prop.drawable = Some(Drawable::new("player"));
    let mut collidable = Collidable::new(24.0, 28.0, 4.0, 4.0);
    // A player never collides with its own projectiles.
    collidable.col_group = Some(prop.id.to_string());
    prop.collidable = Some(collidable);
    prop.damageable = Some(Damageable::new(PlayerTuning::default().max_hp));
    prop.moving = Some(Moving::default());
    prop.pocket = Some(WeaponPocket::new());
}

pub fn on_created(prop: &mut Prop, _reason: CreateReason, ctx: &mut HookCtx) {
    ctx.animate(prop.id, "spawn");
}

pub fn on_receive(prop: &mut Prop, code: &str, status: InputStatus) {
    let Some(ctrl) = prop.controlled.as_mut() else {
        return;
    };
    let pressed = status == InputStatus::Pressed;
    match code {
        "left" => ctrl.held.left = pressed,
        "right" => ctrl.held.right = pressed,
        "duck" => ctrl.held.duck = pressed,
        "jump" if pressed => ctrl.pending.jump = true,
        "fire" if pressed => ctrl.pending.fire = true,
        "switch" if pressed => ctrl.pending.switch = true,
        // Unknown codes and release edges of one-shot inputs fall through.
        _ => {}
    }
}

pub fn on_tick(prop: &mut Prop, ctx: &mut HookCtx) {
    let id = prop.id;
    if let Some(damageable) = &prop.damageable {
        if damageable.hp <= 0 {
            ctx.animate(id, "death");
            ctx.sound("death");
            ctx.destroy(id, DestroyReason::Killed);
            return;
        }
    }

    let Some(ctrl) = prop.controlled.as_mut() else {
        return;
    };
    let held = ctrl.held;
    let pending = ctrl.pending.take();

    let tuning = PlayerTuning::default();
    let gravity = GravityTuning::default();
    let dir = match (held.left, held.right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };

    {
        let (Some(pos), Some(col), Some(mov)) = (
            prop.positioned.as_mut(),
            prop.collidable.as_ref(),
            prop.moving.as_mut(),
        ) else {
            return;
        };

        let control = if mov.grounded { 1.0 } else { tuning.air_control };
        mov.vel_x = dir * tuning.walk_speed * control;
        if pending.jump && mov.grounded {
            mov.vel_y = tuning.jump_velocity;
            ctx.sound("jump");
        }
        if held.duck && mov.grounded {
            mov.drop_through = true;
        }
        mov.vel_y = (mov.vel_y + gravity.gravity).min(gravity.max_fall_speed);
        physics::step_movement(ctx.layout, pos, col, mov);
        catalog::report_position(id, pos, ctx);
    }

    if dir != 0.0 {
        let facing = if dir > 0.0 { Facing::Right } else { Facing::Left };
        if let Some(drawable) = prop.drawable.as_mut() {
            if drawable.facing != facing {
                drawable.facing = facing;
                ctx.mutate(
                    id,
                    BehaviourPatch::Drawable(DrawablePatch {
                        sprite: None,
                        facing: Some(facing),
                    }),
                );
            }
        }
    }

    if pending.switch {
        if let Some(pocket) = prop.pocket.as_mut() {
            pocket.switch_next();
            ctx.mutate(
                id,
                BehaviourPatch::Pocket(PocketPatch {
                    weapons: None,
                    current: Some(pocket.current()),
                }),
            );
        }
    }
    if pending.fire {
        fire_current(prop, ctx);
    }
}

/// Fires the selected weapon if it is off cooldown, spawning its
/// projectiles at the muzzle in the facing direction.
fn fire_current(prop: &mut Prop, ctx: &mut HookCtx) {
    let id = prop.id;
    let Some((px, py)) = prop.positioned.as_ref().map(|p| (p.pos_x, p.pos_y)) else {
        return;
    };
    let facing = prop
        .drawable
        .as_ref()
        .map(|d| d.facing)
        .unwrap_or(Facing::Right);
    let Some(pocket) = prop.pocket.as_mut() else {
        return;
    };
    let Some(weapon) = pocket.try_fire(ctx.tick) else {
        return;
    };

    let spec = weapon.spec();
    let dir = facing.dir();
    for shot in 0..spec.shots {
        let angle = if spec.shots > 1 {
            (shot as f64 / (spec.shots - 1) as f64 - 0.5) * spec.spread
        } else {
            0.0
        };
        ctx.spawn(
            spec.projectile,
            PropOverrides {
                positioned: Some(Positioned::new(
                    px + MUZZLE_X + dir * MUZZLE_REACH,
                    py + MUZZLE_Y,
                )),
                moving: Some(Moving {
                    vel_x: dir * spec.speed * angle.cos(),
                    vel_y: spec.speed * angle.sin() + spec.lob,
                    ..Default::default()
                }),
                col_group: Some(id.to_string()),
                master: Some(id),
                expires_at: Some(ctx.tick + projectiles::lifetime(spec.projectile)),
                ..Default::default()
            },
        );
    }
    ctx.sound(spec.sound);
    ctx.animate(id, spec.anim);
}
