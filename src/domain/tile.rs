/// Tile legend, layer roles, and the per-role collision grid.
/// Tile semantics are queried via methods, not stored as flags,
/// so the legend is centralized here.

use crate::domain::geometry::Rect;

/// Edge length of one square tile, in world pixels.
pub const TILE_SIZE: f64 = 32.0;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LayerRole {
    Ground,
    Walls,
    Solid,
    Blockers,
}

impl LayerRole {
    /// Draw order: floor first, barriers last.
    pub const ALL: [LayerRole; 4] = [
        LayerRole::Ground,
        LayerRole::Walls,
        LayerRole::Solid,
        LayerRole::Blockers,
    ];

    pub fn index(self) -> usize {
        match self {
            LayerRole::Ground => 0,
            LayerRole::Walls => 1,
            LayerRole::Solid => 2,
            LayerRole::Blockers => 3,
        }
    }
}

/// One character of level data.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Ground,          // ' '
    Wall,            // '='
    Solid,           // 'O'
    Blocker,         // '#'
    PlayerSpawn,     // '@'
    PursuerSpawn,    // 'G'
    Artifact,        // 'a'
    BlockedArtifact, // 'A': artifact sitting on a blocker tile
    Switch,          // 'o'
}

impl Tile {
    pub fn from_char(ch: char) -> Option<Tile> {
        Some(match ch {
            ' ' => Tile::Ground,
            '=' => Tile::Wall,
            'O' => Tile::Solid,
            '#' => Tile::Blocker,
            '@' => Tile::PlayerSpawn,
            'G' => Tile::PursuerSpawn,
            'a' => Tile::Artifact,
            'A' => Tile::BlockedArtifact,
            'o' => Tile::Switch,
            _ => return None,
        })
    }

    /// The layer this tile paints. Spawn markers sit on the floor.
    pub fn role(self) -> LayerRole {
        match self {
            Tile::Wall => LayerRole::Walls,
            Tile::Solid => LayerRole::Solid,
            Tile::Blocker | Tile::BlockedArtifact => LayerRole::Blockers,
            _ => LayerRole::Ground,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// TileGrid
// ══════════════════════════════════════════════════════════════

/// Filled-cell grids for every layer role plus the camera offset.
///
/// Collision queries take rectangles in camera space (world minus
/// `(sx, sy)`), the same convention the renderer draws in.
#[derive(Clone, Debug)]
pub struct TileGrid {
    cols: usize,
    rows: usize,
    cells: [Vec<bool>; 4],
    pub sx: f64,
    pub sy: f64,
}

impl TileGrid {
    /// Build from already-validated rectangular tile rows.
    pub fn from_tiles(tiles: &[Vec<Tile>]) -> Self {
        let rows = tiles.len();
        let cols = tiles.first().map_or(0, |r| r.len());
        let mut cells: [Vec<bool>; 4] = Default::default();
        for grid in cells.iter_mut() {
            *grid = vec![false; cols * rows];
        }
        for (y, row) in tiles.iter().enumerate() {
            for (x, tile) in row.iter().enumerate().take(cols) {
                cells[tile.role().index()][y * cols + x] = true;
            }
        }
        TileGrid { cols, rows, cells, sx: 0.0, sy: 0.0 }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width_px(&self) -> f64 {
        self.cols as f64 * TILE_SIZE
    }

    pub fn height_px(&self) -> f64 {
        self.rows as f64 * TILE_SIZE
    }

    #[inline]
    pub fn is_filled(&self, role: LayerRole, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows && self.cells[role.index()][row * self.cols + col]
    }

    /// Does `rect` (camera space) strictly overlap a filled cell of `role`?
    pub fn layer_collides_with(&self, role: LayerRole, rect: Rect) -> bool {
        if self.cols == 0 || self.rows == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return false;
        }
        let x = rect.x + self.sx;
        let y = rect.y + self.sy;

        let Some((c0, c1)) = span(x, rect.width, self.cols) else { return false };
        let Some((r0, r1)) = span(y, rect.height, self.rows) else { return false };

        (r0..=r1).any(|row| (c0..=c1).any(|col| self.is_filled(role, col, row)))
    }

    /// Filled cells of one role, row-major.
    pub fn filled(&self, role: LayerRole) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.cells[role.index()]
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(move |(i, _)| (i % cols, i / cols))
    }
}

/// Inclusive tile index range strictly overlapped by `[start, start + len)`,
/// clipped to `0..count`.
fn span(start: f64, len: f64, count: usize) -> Option<(usize, usize)> {
    let first = (start / TILE_SIZE).floor();
    let last = ((start + len) / TILE_SIZE).ceil() - 1.0;
    if last < 0.0 || first >= count as f64 {
        return None;
    }
    let first = first.max(0.0) as usize;
    let last = (last as usize).min(count - 1);
    (first <= last).then_some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> TileGrid {
        let tiles: Vec<Vec<Tile>> = rows
            .iter()
            .map(|r| r.chars().map(|c| Tile::from_char(c).unwrap()).collect())
            .collect();
        TileGrid::from_tiles(&tiles)
    }

    #[test]
    fn legend_roles() {
        assert_eq!(Tile::from_char('A').unwrap().role(), LayerRole::Blockers);
        assert_eq!(Tile::from_char('@').unwrap().role(), LayerRole::Ground);
        assert_eq!(Tile::from_char('O').unwrap().role(), LayerRole::Solid);
        assert!(Tile::from_char('x').is_none());
    }

    #[test]
    fn dimensions_follow_grid() {
        let g = grid(&["   ", " = "]);
        assert_eq!(g.width_px(), 96.0);
        assert_eq!(g.height_px(), 64.0);
    }

    #[test]
    fn collision_is_strict_at_tile_edges() {
        let g = grid(&["   ", " = ", "   "]);
        // Wall occupies [32, 64) x [32, 64)
        assert!(g.layer_collides_with(LayerRole::Walls, Rect::new(40.0, 40.0, 4.0, 4.0)));
        assert!(!g.layer_collides_with(LayerRole::Walls, Rect::new(0.0, 0.0, 32.0, 32.0)));
        assert!(!g.layer_collides_with(LayerRole::Walls, Rect::new(64.0, 32.0, 10.0, 10.0)));
        assert!(g.layer_collides_with(LayerRole::Walls, Rect::new(63.9, 32.0, 10.0, 10.0)));
        assert!(!g.layer_collides_with(LayerRole::Solid, Rect::new(40.0, 40.0, 4.0, 4.0)));
    }

    #[test]
    fn collision_adds_camera_offset_back() {
        let mut g = grid(&["   ", " = ", "   "]);
        g.sx = 32.0;
        g.sy = 32.0;
        // Camera-space (8, 8) is world (40, 40), inside the wall.
        assert!(g.layer_collides_with(LayerRole::Walls, Rect::new(8.0, 8.0, 4.0, 4.0)));
        assert!(!g.layer_collides_with(LayerRole::Walls, Rect::new(40.0, 40.0, 4.0, 4.0)));
    }

    #[test]
    fn out_of_grid_rects_never_collide() {
        let g = grid(&["=="]);
        assert!(!g.layer_collides_with(LayerRole::Walls, Rect::new(-50.0, 0.0, 10.0, 10.0)));
        assert!(!g.layer_collides_with(LayerRole::Walls, Rect::new(0.0, 40.0, 10.0, 10.0)));
        assert!(g.layer_collides_with(LayerRole::Walls, Rect::new(-5.0, -5.0, 10.0, 10.0)));
    }

    #[test]
    fn filled_lists_cells_row_major() {
        let g = grid(&["# ", " #"]);
        let cells: Vec<_> = g.filled(LayerRole::Blockers).collect();
        assert_eq!(cells, vec![(0, 0), (1, 1)]);
    }
}
