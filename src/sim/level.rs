/// Level data: records, validation, text format, built-in levels.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by name)
///   2. Built-in embedded levels
///
/// ## Single-level format (`.txt`):
///   Line 1: `# Level Name`
///   Optional: `% online_ms offline_ms` (blocker auto-toggle timings)
///   Optional: `> help text` (shown for the first seconds of the level)
///   Lines: map rows, all the same width
///
/// ## Tile legend:
///   ' ' = Ground             '=' = Wall
///   'O' = Solid              '#' = Blocker (electrified barrier)
///   '@' = Player spawn       'G' = Pursuer spawn
///   'a' = Artifact           'A' = Artifact on a blocker
///   'o' = Switch (toggles the solid layer)

use std::fmt;
use std::path::Path;

use crate::domain::layer::ToggleSchedule;
use crate::domain::tile::Tile;

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub help: Option<String>,
    pub rows: Vec<String>,
    pub schedule: Option<ToggleSchedule>,
}

// ══════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════

/// Malformed level data. Raised at load time, never mid-game.
#[derive(Clone, Debug, PartialEq)]
pub enum LevelError {
    Empty,
    RaggedRows { row: usize, expected: usize, found: usize },
    UnknownTile { row: usize, col: usize, ch: char },
    NoPlayer,
    MultiplePlayers { first: (usize, usize), second: (usize, usize) },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Empty => write!(f, "level has no map rows"),
            LevelError::RaggedRows { row, expected, found } => {
                write!(f, "row {row} is {found} tiles wide, expected {expected}")
            }
            LevelError::UnknownTile { row, col, ch } => {
                write!(f, "unknown tile {ch:?} at row {row}, column {col}")
            }
            LevelError::NoPlayer => write!(f, "level has no player spawn '@'"),
            LevelError::MultiplePlayers { first, second } => write!(
                f,
                "second player spawn at row {}, column {} (first at row {}, column {})",
                second.0, second.1, first.0, first.1
            ),
        }
    }
}

impl std::error::Error for LevelError {}

// ══════════════════════════════════════════════════════════════
// Validation
// ══════════════════════════════════════════════════════════════

impl LevelDef {
    /// Decode and validate the grid: rectangular, known tiles, one player.
    pub fn tiles(&self) -> Result<Vec<Vec<Tile>>, LevelError> {
        let width = self.rows.first().map_or(0, |r| r.chars().count());
        if width == 0 {
            return Err(LevelError::Empty);
        }

        let mut spawn: Option<(usize, usize)> = None;
        let mut grid = Vec::with_capacity(self.rows.len());

        for (y, row) in self.rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(LevelError::RaggedRows { row: y, expected: width, found });
            }
            let mut tiles = Vec::with_capacity(width);
            for (x, ch) in row.chars().enumerate() {
                let tile = Tile::from_char(ch).ok_or(LevelError::UnknownTile { row: y, col: x, ch })?;
                if tile == Tile::PlayerSpawn {
                    if let Some(first) = spawn {
                        return Err(LevelError::MultiplePlayers { first, second: (y, x) });
                    }
                    spawn = Some((y, x));
                }
                tiles.push(tile);
            }
            grid.push(tiles);
        }

        if spawn.is_none() {
            return Err(LevelError::NoPlayer);
        }
        Ok(grid)
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Levels from `dir` if it holds any valid ones, else the built-ins.
pub fn load_levels(dir: &Path) -> Vec<LevelDef> {
    if dir.is_dir() {
        let levels = load_from_directory(dir);
        if !levels.is_empty() {
            log::info!("loaded {} levels from {}", levels.len(), dir.display());
            return levels;
        }
    }
    embedded_levels()
}

// ══════════════════════════════════════════════════════════════
// Single-level file parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content. Validates the grid.
pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut help = None;
    let mut schedule = None;
    let mut rows = vec![];

    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if rows.is_empty() && line.trim().is_empty() {
            continue;
        }
        if line.starts_with('#') && name.is_empty() && rows.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(rest) = line.strip_prefix("% ") {
            let nums: Vec<f64> = rest.split_whitespace().filter_map(|n| n.parse().ok()).collect();
            if let [online, offline] = nums[..] {
                schedule = ToggleSchedule::new(online, offline);
            }
        } else if let Some(rest) = line.strip_prefix("> ") {
            help = Some(rest.trim().to_string()).filter(|h| !h.is_empty());
        } else {
            rows.push(line.to_string());
        }
    }

    while rows.last().map_or(false, |r| r.is_empty()) {
        rows.pop();
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }

    let def = LevelDef { name, help, rows, schedule };
    def.tiles()?;
    Ok(def)
}

/// Distinguish `# Level Name` from `#G  a#` (blocker row).
/// A name line holds at least one character outside the tile legend,
/// so a `#` line made only of tiles is always map data.
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| Tile::from_char(c).is_none())
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("could not read {}: {e}", dir.display());
            return vec![];
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |x| x == "txt"))
        .collect();
    files.sort();

    let mut levels = vec![];
    for path in files {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                continue;
            }
        };
        match parse_level(&content) {
            Ok(def) => levels.push(def),
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }
    levels
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("The Button", Some("PUSH THE BUTTON"), None, &[
            "                    ",
            "                    ",
            "                    ",
            "                    ",
            "     o   OOOOO      ",
            "         O  GO      ",
            "     @   O a O      ",
            "         O   O      ",
            "         OOOOO      ",
            "                    ",
            "                    ",
            "                    ",
            "                    ",
            "                    ",
            "                    ",
        ]),
        make_embedded("Brownout", Some("GO GO GO"), ToggleSchedule::new(6000.0, 3000.0), &[
            "G                  G",
            "                    ",
            "                    ",
            "                    ",
            "          ###O      ",
            "          #  O      ",
            "     @    #  O      ",
            "          #  O      ",
            "  OOOO====###O      ",
            "  =###=o     O      ",
            "  =#A#=      O      ",
            "  =====OOOOOOO      ",
            "                    ",
            "                    ",
            "G                  G",
        ]),
        make_embedded("Whoa", Some("WHOA"), None, &[
            "     G G G G G G    ",
            "  G               G ",
            "                    ",
            "                    ",
            "G                   ",
            "                   G",
            "                    ",
            "G        @          ",
            "                    ",
            "                   G",
            "G                   ",
            "                    ",
            "                    ",
            "  G              G  ",
            "     G G G G G G    ",
        ]),
    ]
}

fn make_embedded(name: &str, help: Option<&str>, schedule: Option<ToggleSchedule>, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        help: help.map(str::to_string),
        rows: map.iter().map(|s| s.to_string()).collect(),
        schedule,
    }
}
