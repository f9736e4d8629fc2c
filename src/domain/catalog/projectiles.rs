// Weapon projectiles. Straight shots retire on their first hit, grenades
// detonate into a blast, and the blast deals its area damage once at
// creation so overlapping passes cannot double it.

use crate::domain::behaviour::{Collidable, Damaging, Drawable, Moving, Positioned};
use crate::domain::catalog::{self, DestroyReason, HookCtx, PropKind};
use crate::domain::physics::{self, Aabb};
use crate::domain::prop::{Prop, PropOverrides};
use crate::domain::tuning::{GravityTuning, HazardTuning};

/// Ticks a projectile of `kind` survives without hitting anything.
pub fn lifetime(kind: PropKind) -> u64 {
    match kind {
        PropKind::Bullet => 40,
        PropKind::Pellet => 22,
        PropKind::Grenade => 55,
        PropKind::Slash => 3,
        PropKind::Blast => 4,
        _ => 0,
    }
}

pub fn defaults(prop: &mut Prop) {
    match prop.kind {
        PropKind::Bullet => {
            prop.drawable = Some(Drawable::new("bullet"));
            prop.collidable =
                Some(Collidable::new(6.0, 6.0, 1.0, 1.0).with_whitelist(vec!["player"]));
            prop.damaging = Some(Damaging { damage: 12 });
            prop.moving = Some(Moving::default());
        }
        PropKind::Pellet => {
            prop.drawable = Some(Drawable::new("pellet"));
            prop.collidable =
                Some(Collidable::new(5.0, 5.0, 1.0, 1.0).with_whitelist(vec!["player"]));
            prop.damaging = Some(Damaging { damage: 7 });
            prop.moving = Some(Moving::default());
        }
        PropKind::Grenade => {
            prop.drawable = Some(Drawable::new("grenade"));
            prop.collidable =
                Some(Collidable::new(10.0, 10.0, 1.0, 1.0).with_whitelist(vec!["player"]));
            prop.moving = Some(Moving::default());
        }
        PropKind::Blast => {
            // Damage is dealt in the creation hook; the prop that remains
            // is only the explosion visual.
            prop.drawable = Some(Drawable::new("blast"));
        }
        PropKind::Slash => {
            // Invisible hitbox in front of the swinging player.
            prop.collidable =
                Some(Collidable::new(26.0, 24.0, 3.0, 4.0).with_whitelist(vec!["player"]));
            prop.damaging = Some(Damaging { damage: 18 });
        }
        _ => {}
    }
}

pub fn on_tick(prop: &mut Prop, ctx: &mut HookCtx) {
    let id = prop.id;
    if let Some(expires) = prop.expires {
        if ctx.tick >= expires.at_tick {
            ctx.destroy(id, DestroyReason::Expired);
            return;
        }
    }

    let (Some(pos), Some(col), Some(mov)) = (
        prop.positioned.as_mut(),
        prop.collidable.as_ref(),
        prop.moving.as_mut(),
    ) else {
        return;
    };

    if prop.kind == PropKind::Grenade {
        let gravity = GravityTuning::default();
        mov.vel_y = (mov.vel_y + gravity.gravity).min(gravity.max_fall_speed);
    }
    let outcome = physics::step_movement(ctx.layout, pos, col, mov);
    catalog::report_position(id, pos, ctx);

    if outcome.hit_x || outcome.hit_y {
        match prop.kind {
            // Grenades detonate against any tile they touch.
            PropKind::Grenade => ctx.destroy(id, DestroyReason::Expired),
            PropKind::Bullet | PropKind::Pellet => {
                ctx.animate(id, "impact");
                ctx.destroy(id, DestroyReason::Expired);
            }
            _ => {}
        }
    }
}

/// Straight projectiles and slashes: damage the victim, then retire.
pub fn hit_on_collide(prop: &mut Prop, other: &Prop, ctx: &mut HookCtx) {
    let Some(damaging) = &prop.damaging else {
        return;
    };
    if other.damageable.is_none() {
        return;
    }
    let damager = catalog::damager_name(prop, ctx);
    catalog::deal_damage(other, damaging.damage, damager, ctx);
    match prop.kind {
        PropKind::Bullet | PropKind::Pellet => {
            ctx.animate(prop.id, "impact");
            ctx.destroy(prop.id, DestroyReason::Consumed);
        }
        // A slash keeps swinging through everyone it reaches.
        _ => {}
    }
}

pub fn grenade_on_collide(prop: &mut Prop, other: &Prop, ctx: &mut HookCtx) {
    if other.damageable.is_none() {
        return;
    }
    ctx.destroy(prop.id, DestroyReason::Consumed);
}

/// Any end of a grenade's life detonates it, including expiry in flight.
pub fn grenade_on_destroyed(prop: &mut Prop, reason: DestroyReason, ctx: &mut HookCtx) {
    if reason == DestroyReason::Disconnected || reason == DestroyReason::Removed {
        return;
    }
    spawn_blast(prop, ctx);
}

/// Spawns a blast centered on `source`, inheriting its collision group and
/// master so the kill feed can still name the shooter.
pub(crate) fn spawn_blast(source: &Prop, ctx: &mut HookCtx) {
    let center = source
        .footprint()
        .map(|fp| fp.center())
        .or_else(|| source.positioned.as_ref().map(|p| (p.pos_x, p.pos_y)));
    let Some((cx, cy)) = center else {
        return;
    };
    ctx.spawn(
        PropKind::Blast,
        PropOverrides {
            positioned: Some(Positioned::new(cx - 24.0, cy - 24.0)),
            master: source.master().or(Some(source.id)),
            expires_at: Some(ctx.tick + lifetime(PropKind::Blast)),
            ..Default::default()
        },
    );
    ctx.sound("boom");
}

/// Area damage happens exactly once, the moment the blast appears.
pub fn blast_on_created(prop: &mut Prop, ctx: &mut HookCtx) {
    let Some(pos) = &prop.positioned else {
        return;
    };
    let hazard = HazardTuning::default();
    let center = (pos.pos_x + 24.0, pos.pos_y + 24.0);
    let group = ctx
        .others
        .get(&prop.master().unwrap_or(prop.id))
        .and_then(|m| m.collidable.as_ref())
        .and_then(|c| c.col_group.clone());
    let damager = catalog::damager_name(prop, ctx);

    let victims: Vec<_> = ctx
        .others
        .values()
        .filter(|p| {
            let own_group = p.collidable.as_ref().and_then(|c| c.col_group.as_ref());
            !(own_group.is_some() && own_group == group.as_ref())
        })
        .filter_map(|p| {
            let hp = p.damageable.as_ref()?.hp;
            let fp = p.footprint()?;
            within_radius(&fp, center, hazard.blast_radius).then_some((p.id, hp))
        })
        .collect();
    for (id, hp) in victims {
        catalog::deal_damage_to(id, hp, hazard.blast_damage, damager.clone(), ctx);
    }
    ctx.animate(prop.id, "explode");
}

fn within_radius(fp: &Aabb, center: (f64, f64), radius: f64) -> bool {
    let nearest_x = center.0.clamp(fp.min_x, fp.max_x);
    let nearest_y = center.1.clamp(fp.min_y, fp.max_y);
    let dx = nearest_x - center.0;
    let dy = nearest_y - center.1;
    dx * dx + dy * dy <= radius * radius
}
