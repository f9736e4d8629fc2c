// Static tile grid backing a stage. Rows are parsed from the stage's text
// file; every cell is solid, semi-solid, or ghost.

use std::collections::HashMap;

/// Collision class of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solidity {
    /// Blocks movement from every direction.
    Solid,
    /// Blocks only downward movement, unless the mover opts out.
    Semi,
    /// Never blocks.
    Ghost,
}

impl Solidity {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "solid" => Some(Solidity::Solid),
            "semi" => Some(Solidity::Semi),
            "ghost" => Some(Solidity::Ghost),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum LayoutError {
    Empty,
    UnknownSymbol(char),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Empty => write!(f, "layout has no rows"),
            LayoutError::UnknownSymbol(c) => write!(f, "unknown tile symbol {c:?}"),
        }
    }
}

/// Immutable tile grid with a fixed cell size in pixels.
#[derive(Debug, Clone)]
pub struct TileLayout {
    rows: Vec<Vec<Solidity>>,
    cols: usize,
    cell: f64,
}

impl TileLayout {
    /// Parses a layout from its text form. Each line is one row; short rows
    /// are treated as ghost-padded to the widest one.
    pub fn parse(
        text: &str,
        symbols: &HashMap<char, Solidity>,
        cell: f64,
    ) -> Result<Self, LayoutError> {
        let mut rows = Vec::new();
        for line in text.lines() {
            let mut row = Vec::with_capacity(line.len());
            for c in line.chars() {
                let solidity = symbols.get(&c).copied().ok_or(LayoutError::UnknownSymbol(c))?;
                row.push(solidity);
            }
            rows.push(row);
        }
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }
        let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        Ok(Self { rows, cols, cell })
    }

    /// Collision class of the cell at (col, row). Cells above and beside the
    /// grid are ghost so props can arc over the top; cells below the bottom
    /// row are solid so nothing falls out of the world.
    pub fn solidity(&self, col: i64, row: i64) -> Solidity {
        if row < 0 {
            return Solidity::Ghost;
        }
        if row >= self.rows.len() as i64 {
            return Solidity::Solid;
        }
        if col < 0 || col >= self.cols as i64 {
            return Solidity::Ghost;
        }
        self.rows[row as usize]
            .get(col as usize)
            .copied()
            .unwrap_or(Solidity::Ghost)
    }

    pub fn cell(&self) -> f64 {
        self.cell
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn width_px(&self) -> f64 {
        self.cols as f64 * self.cell
    }

    pub fn height_px(&self) -> f64 {
        self.rows.len() as f64 * self.cell
    }

    /// Pixel position of a cell's top-left corner.
    pub fn cell_origin(&self, col: i64, row: i64) -> (f64, f64) {
        (col as f64 * self.cell, row as f64 * self.cell)
    }

    /// Rows in `col` whose cell is standable (solid or semi) with a ghost
    /// cell directly above, topmost first.
    pub fn surface_rows(&self, col: i64) -> Vec<i64> {
        let mut rows = Vec::new();
        for row in 0..self.rows.len() as i64 {
            let here = self.solidity(col, row);
            if here != Solidity::Ghost && self.solidity(col, row - 1) == Solidity::Ghost {
                rows.push(row);
            }
        }
        rows
    }
}

/// Symbol table used when stage metadata does not override it.
pub fn default_symbols() -> HashMap<char, Solidity> {
    HashMap::from([
        ('#', Solidity::Solid),
        ('=', Solidity::Semi),
        ('.', Solidity::Ghost),
    ])
}
