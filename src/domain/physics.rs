// Movement integration against the tile layout. Axes resolve separately,
// X before Y, and blocked movement snaps the collidable's edge to the cell
// boundary it ran into.

use crate::domain::behaviour::{Collidable, Moving, Positioned};
use crate::domain::layout::{Solidity, TileLayout};

// Footprints are half-open in both axes so a box resting exactly on a cell
// boundary does not count as overlapping the next cell.
const EDGE_EPS: f64 = 1e-6;

/// Probe depth below the footprint used to detect ground support.
pub const GROUND_PROBE: f64 = 1.0;

/// Axis-aligned box in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    pub fn from_parts(pos: &Positioned, col: &Collidable) -> Self {
        Self::at(pos.pos_x, pos.pos_y, col)
    }

    /// Footprint of `col` anchored at (x, y).
    pub fn at(x: f64, y: f64, col: &Collidable) -> Self {
        Self {
            min_x: x + col.offset_x,
            min_y: y + col.offset_y,
            max_x: x + col.offset_x + col.size_x,
            max_y: y + col.offset_y + col.size_y,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Inclusive range of cell indices covered by [min, max).
fn cell_span(min: f64, max: f64, cell: f64) -> std::ops::RangeInclusive<i64> {
    let first = (min / cell).floor() as i64;
    let last = ((max - EDGE_EPS) / cell).floor() as i64;
    first..=last.max(first)
}

/// True when `aabb` overlaps a blocking cell. Semi cells block only when
/// `ignore_semi` is false.
pub fn layout_hit(layout: &TileLayout, aabb: &Aabb, ignore_semi: bool) -> bool {
    let cell = layout.cell();
    for row in cell_span(aabb.min_y, aabb.max_y, cell) {
        for col in cell_span(aabb.min_x, aabb.max_x, cell) {
            match layout.solidity(col, row) {
                Solidity::Solid => return true,
                Solidity::Semi if !ignore_semi => return true,
                _ => {}
            }
        }
    }
    false
}

/// What one movement step ran into.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    pub hit_x: bool,
    pub hit_y: bool,
    pub grounded: bool,
    /// Grounded this step after being airborne last step.
    pub landed: bool,
}

/// Advances `pos` by the current velocities, resolving layout collisions
/// per axis and refreshing the grounded and drop-through flags.
pub fn step_movement(
    layout: &TileLayout,
    pos: &mut Positioned,
    col: &Collidable,
    mov: &mut Moving,
) -> StepOutcome {
    let cell = layout.cell();
    let mut outcome = StepOutcome::default();

    // Horizontal pass ignores semi tiles entirely.
    if mov.vel_x != 0.0 {
        let next_x = pos.pos_x + mov.vel_x;
        let fp = Aabb::at(next_x, pos.pos_y, col);
        if layout_hit(layout, &fp, true) {
            if mov.vel_x > 0.0 {
                let right = next_x + col.offset_x + col.size_x;
                let boundary = (right / cell).floor() * cell;
                pos.pos_x = boundary - col.size_x - col.offset_x;
            } else {
                let left = next_x + col.offset_x;
                let boundary = (left / cell).floor() * cell + cell;
                pos.pos_x = boundary - col.offset_x;
            }
            outcome.hit_x = true;
        } else {
            pos.pos_x = next_x;
        }
    }

    // Vertical pass. Semi tiles stop only downward movement, and never
    // while dropping through or already stuck inside solid ground.
    if mov.vel_y != 0.0 {
        let inside_solid = layout_hit(layout, &Aabb::at(pos.pos_x, pos.pos_y, col), true);
        let ignore_semi = mov.drop_through || mov.vel_y < 0.0 || inside_solid;
        let next_y = pos.pos_y + mov.vel_y;
        let fp = Aabb::at(pos.pos_x, next_y, col);
        if layout_hit(layout, &fp, ignore_semi) {
            if mov.vel_y > 0.0 {
                let bottom = next_y + col.offset_y + col.size_y;
                let boundary = (bottom / cell).floor() * cell;
                pos.pos_y = boundary - col.size_y - col.offset_y;
            } else {
                let top = next_y + col.offset_y;
                let boundary = (top / cell).floor() * cell + cell;
                pos.pos_y = boundary - col.offset_y;
            }
            mov.vel_y = 0.0;
            outcome.hit_y = true;
        } else {
            pos.pos_y = next_y;
        }
    }

    // Drop-through intent ends once the footprint is clear of every tile.
    let fp = Aabb::at(pos.pos_x, pos.pos_y, col);
    if mov.drop_through && !layout_hit(layout, &fp, false) {
        mov.drop_through = false;
    }

    let was_grounded = mov.grounded;
    let below = Aabb {
        min_y: fp.max_y,
        max_y: fp.max_y + GROUND_PROBE,
        ..fp
    };
    let inside_solid = layout_hit(layout, &fp, true);
    mov.grounded = !inside_solid && layout_hit(layout, &below, mov.drop_through);
    if mov.grounded {
        mov.drop_through = false;
    }
    outcome.grounded = mov.grounded;
    outcome.landed = mov.grounded && !was_grounded;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layout::default_symbols;

    fn layout(text: &str) -> TileLayout {
        TileLayout::parse(text, &default_symbols(), 32.0).expect("parse layout")
    }

    fn box16() -> Collidable {
        Collidable::new(16.0, 16.0, 0.0, 0.0)
    }

    #[test]
    fn solid_blocks_regardless_of_ignore_flag() {
        let l = layout("#");
        let fp = Aabb {
            min_x: 8.0,
            min_y: 8.0,
            max_x: 24.0,
            max_y: 24.0,
        };
        assert!(layout_hit(&l, &fp, false));
        assert!(layout_hit(&l, &fp, true));
    }

    #[test]
    fn semi_blocks_only_when_not_ignored() {
        let l = layout("=");
        let fp = Aabb {
            min_x: 8.0,
            min_y: 8.0,
            max_x: 24.0,
            max_y: 24.0,
        };
        assert!(layout_hit(&l, &fp, false));
        assert!(!layout_hit(&l, &fp, true));
    }

    #[test]
    fn ghost_never_blocks() {
        let l = layout(".");
        let fp = Aabb {
            min_x: 8.0,
            min_y: 8.0,
            max_x: 24.0,
            max_y: 24.0,
        };
        assert!(!layout_hit(&l, &fp, false));
        assert!(!layout_hit(&l, &fp, true));
    }

    #[test]
    fn edge_contact_does_not_count_as_overlap() {
        let l = layout(".#");
        // Box resting exactly against the wall cell at x = 32.
        let fp = Aabb {
            min_x: 16.0,
            min_y: 0.0,
            max_x: 32.0,
            max_y: 32.0,
        };
        assert!(!layout_hit(&l, &fp, false));
    }

    #[test]
    fn falling_snaps_to_floor_and_grounds() {
        let l = layout("..\n..\n##");
        let mut pos = Positioned::new(4.0, 30.0);
        let col = box16();
        let mut mov = Moving {
            vel_y: 40.0,
            ..Default::default()
        };

        let out = step_movement(&l, &mut pos, &col, &mut mov);
        assert!(out.hit_y);
        assert!(out.grounded);
        assert!(out.landed);
        assert_eq!(pos.pos_y, 48.0);
        assert_eq!(mov.vel_y, 0.0);
    }

    #[test]
    fn walking_into_wall_snaps_to_boundary() {
        let l = layout("..#\n###");
        let mut pos = Positioned::new(40.0, 16.0);
        let col = box16();
        let mut mov = Moving {
            vel_x: 20.0,
            ..Default::default()
        };

        let out = step_movement(&l, &mut pos, &col, &mut mov);
        assert!(out.hit_x);
        assert_eq!(pos.pos_x, 48.0);
    }

    #[test]
    fn upward_movement_passes_through_semi() {
        let l = layout("..\n==\n..");
        let mut pos = Positioned::new(0.0, 40.0);
        let col = box16();
        let mut mov = Moving {
            vel_y: -30.0,
            ..Default::default()
        };

        let out = step_movement(&l, &mut pos, &col, &mut mov);
        assert!(!out.hit_y);
        assert_eq!(pos.pos_y, 10.0);
    }

    #[test]
    fn drop_through_falls_past_semi_and_clears_on_landing() {
        let l = layout("..\n==\n..\n##");
        let col = box16();
        let mut pos = Positioned::new(4.0, 16.0);
        let mut mov = Moving {
            grounded: true,
            ..Default::default()
        };

        // Grounded on the semi platform first.
        mov.vel_y = 4.0;
        step_movement(&l, &mut pos, &col, &mut mov);
        assert!(mov.grounded);
        assert_eq!(pos.pos_y, 16.0);

        // Drop through, then keep falling until the solid floor catches us.
        mov.drop_through = true;
        for _ in 0..20 {
            mov.vel_y = (mov.vel_y + 1.0).min(10.0);
            step_movement(&l, &mut pos, &col, &mut mov);
        }
        assert!(mov.grounded);
        assert!(!mov.drop_through);
        assert_eq!(pos.pos_y, 80.0);
    }
}
