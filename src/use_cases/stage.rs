// Stage assets: a text tile grid next to a JSON metadata file, both named
// after the stage's system name. All names referenced by the metadata are
// resolved here, so a bad stage fails at boot instead of mid-match.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::domain::behaviour::{Positioned, Spawner};
use crate::domain::catalog::PropKind;
use crate::domain::catalog::weapons::WeaponKind;
use crate::domain::layout::{self, LayoutError, Solidity, TileLayout};
use crate::domain::prop::{Loot, PropOverrides};
use crate::domain::tuning::ItemTuning;
use crate::use_cases::disasters::disaster_by_name;
use crate::use_cases::scheduler::Disaster;

#[derive(Debug)]
pub enum StageError {
    Io(std::io::Error),
    Meta(serde_json::Error),
    Layout(LayoutError),
    UnknownTileClass(String),
    UnknownPropKind(String),
    UnknownWeapon(String),
    UnknownDisaster(String),
    NoSpawnPoints,
    SpawnPointOutOfBounds(i64, i64),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageError::Io(e) => write!(f, "stage file unreadable: {e}"),
            StageError::Meta(e) => write!(f, "stage metadata invalid: {e}"),
            StageError::Layout(e) => write!(f, "stage layout invalid: {e}"),
            StageError::UnknownTileClass(c) => write!(f, "unknown tile class {c:?}"),
            StageError::UnknownPropKind(k) => write!(f, "unknown prop kind {k:?}"),
            StageError::UnknownWeapon(w) => write!(f, "unknown weapon {w:?}"),
            StageError::UnknownDisaster(d) => write!(f, "unknown disaster {d:?}"),
            StageError::NoSpawnPoints => write!(f, "stage declares no spawn points"),
            StageError::SpawnPointOutOfBounds(c, r) => {
                write!(f, "spawn point ({c}, {r}) outside the grid")
            }
        }
    }
}

impl From<std::io::Error> for StageError {
    fn from(e: std::io::Error) -> Self {
        StageError::Io(e)
    }
}

impl From<serde_json::Error> for StageError {
    fn from(e: serde_json::Error) -> Self {
        StageError::Meta(e)
    }
}

impl From<LayoutError> for StageError {
    fn from(e: LayoutError) -> Self {
        StageError::Layout(e)
    }
}

/// Stage identity shared with clients through `serverSceneMeta`.
#[derive(Debug, Clone)]
pub struct StageMeta {
    pub stage_name: String,
    pub stage_system_name: String,
    pub grid_size: u32,
    pub author: String,
    /// Ticks until the time's-up announcement. Zero disables it.
    pub time_limit: u64,
}

/// A prop the stage places before the first tick.
#[derive(Debug, Clone)]
pub struct PreloadProp {
    pub kind: PropKind,
    pub overrides: PropOverrides,
}

/// Fully resolved stage, ready to hand to a scene.
#[derive(Debug, Clone)]
pub struct Stage {
    pub meta: StageMeta,
    pub layout: TileLayout,
    pub spawn_points: Vec<(f64, f64)>,
    pub preload: Vec<PreloadProp>,
    pub disasters: Vec<Disaster>,
}

impl Stage {
    /// Reads `<dir>/<name>.json` and `<dir>/<name>.txt` and resolves them.
    pub fn load(dir: &str, name: &str) -> Result<Self, StageError> {
        let meta_text = std::fs::read_to_string(Path::new(dir).join(format!("{name}.json")))?;
        let grid_text = std::fs::read_to_string(Path::new(dir).join(format!("{name}.txt")))?;
        parse_stage(&meta_text, &grid_text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageMetaFile {
    stage_name: String,
    stage_system_name: String,
    grid_size: u32,
    #[serde(default)]
    author: String,
    #[serde(default)]
    time_limit: u64,
    #[serde(default)]
    tiles: Option<HashMap<String, String>>,
    #[serde(default)]
    extra: StageExtra,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageExtra {
    #[serde(default)]
    spawn_points: Vec<[i64; 2]>,
    #[serde(default)]
    preload: Vec<PreloadEntry>,
    #[serde(default)]
    disasters: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreloadEntry {
    kind: String,
    cell: [i64; 2],
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    weapon: Option<String>,
    #[serde(default)]
    interval: Option<u64>,
}

/// Parses and cross-checks a stage from its two source texts.
pub fn parse_stage(meta_json: &str, grid_text: &str) -> Result<Stage, StageError> {
    let file: StageMetaFile = serde_json::from_str(meta_json)?;

    let symbols = match &file.tiles {
        Some(map) => {
            let mut symbols = HashMap::new();
            for (symbol, class) in map {
                let Some(c) = symbol.chars().next() else {
                    continue;
                };
                let solidity = Solidity::from_name(class)
                    .ok_or_else(|| StageError::UnknownTileClass(class.clone()))?;
                symbols.insert(c, solidity);
            }
            symbols
        }
        None => layout::default_symbols(),
    };
    let layout = TileLayout::parse(grid_text, &symbols, f64::from(file.grid_size))?;

    if file.extra.spawn_points.is_empty() {
        return Err(StageError::NoSpawnPoints);
    }
    let mut spawn_points = Vec::new();
    for cell in &file.extra.spawn_points {
        let (col, row) = (cell[0], cell[1]);
        if col < 0 || col >= layout.cols() as i64 || row < 0 || row >= layout.rows() as i64 {
            return Err(StageError::SpawnPointOutOfBounds(col, row));
        }
        spawn_points.push(layout.cell_origin(col, row));
    }

    let mut preload = Vec::new();
    for entry in &file.extra.preload {
        let kind = PropKind::from_name(&entry.kind)
            .ok_or_else(|| StageError::UnknownPropKind(entry.kind.clone()))?;
        let (x, y) = layout.cell_origin(entry.cell[0], entry.cell[1]);
        let mut overrides = PropOverrides {
            positioned: Some(Positioned::new(x, y)),
            ..Default::default()
        };
        match kind {
            PropKind::ItemSpawner => {
                let child_name = entry.item.as_deref().unwrap_or("weapon_crate");
                let child_kind = PropKind::from_name(child_name)
                    .ok_or_else(|| StageError::UnknownPropKind(child_name.to_string()))?;
                let crate_weapon = entry
                    .weapon
                    .as_deref()
                    .map(|w| {
                        WeaponKind::from_name(w)
                            .ok_or_else(|| StageError::UnknownWeapon(w.to_string()))
                    })
                    .transpose()?;
                overrides.spawner = Some(Spawner {
                    child_kind,
                    crate_weapon,
                    interval: entry
                        .interval
                        .unwrap_or(ItemTuning::default().spawner_interval_ticks),
                    next_spawn_tick: 0,
                });
            }
            PropKind::WeaponCrate => {
                let weapon = match entry.weapon.as_deref() {
                    Some(w) => WeaponKind::from_name(w)
                        .ok_or_else(|| StageError::UnknownWeapon(w.to_string()))?,
                    None => WeaponKind::Pistol,
                };
                overrides.loot = Some(Loot { weapon });
            }
            _ => {}
        }
        preload.push(PreloadProp { kind, overrides });
    }

    let mut disasters = Vec::new();
    for name in &file.extra.disasters {
        let disaster =
            disaster_by_name(name).ok_or_else(|| StageError::UnknownDisaster(name.clone()))?;
        disasters.push(disaster);
    }

    Ok(Stage {
        meta: StageMeta {
            stage_name: file.stage_name,
            stage_system_name: file.stage_system_name,
            grid_size: file.grid_size,
            author: file.author,
            time_limit: file.time_limit,
        },
        layout,
        spawn_points,
        preload,
        disasters,
    })
}
