/// Collision rules: which layers block whom.
///
/// Pure queries over the tile grid and layer states. No side effects.
///
/// ## Collision Truth Table
///
/// A query is true if ANY listed role overlaps the rectangle while
/// that role's layer is online.
///
/// ┌──────────────────────┬─────────────────────┬──────────────────────────┐
/// │ Query                 │ Roles (OR'ed)       │ Who asks                 │
/// ├──────────────────────┼─────────────────────┼──────────────────────────┤
/// │ collides_with_walls   │ Walls ∪ Solid       │ player movement          │
/// │ collides_with_blockers│ Blockers ∪ Solid    │ pursuer movement + stuck │
/// └──────────────────────┴─────────────────────┴──────────────────────────┘
///
/// ### Layer gating
/// ┌──────────┬────────────────────┬──────────────────────────────┐
/// │ Role      │ Schedule           │ Online                       │
/// ├──────────┼────────────────────┼──────────────────────────────┤
/// │ Ground    │ never              │ always (never collides)      │
/// │ Walls     │ never              │ always                       │
/// │ Solid     │ never              │ until a switch toggles it    │
/// │ Blockers  │ level timings      │ alternates, 1200ms flip lag  │
/// └──────────┴────────────────────┴──────────────────────────────┘
///
/// Solid is shared by both queries and ignores the blocker schedule,
/// so a sealed room holds the player and pursuers alike.

use super::entity::PlayerSnapshot;
use super::geometry::{clamp, Rect, Vector2};
use super::layer::Layer;
use super::tile::{LayerRole, TileGrid};

/// Immutable view of the map for entity updates.
pub struct MapView<'a> {
    pub grid: &'a TileGrid,
    pub layers: &'a [Layer; 4],
    pub player: Option<PlayerSnapshot>,
}

impl<'a> MapView<'a> {
    pub fn width(&self) -> f64 {
        self.grid.width_px()
    }

    pub fn height(&self) -> f64 {
        self.grid.height_px()
    }

    pub fn layer(&self, role: LayerRole) -> &'a Layer {
        &self.layers[role.index()]
    }

    pub fn blockers_online(&self) -> bool {
        self.layer(LayerRole::Blockers).is_online()
    }

    /// World-space `bounds` against one role, gated by its layer.
    pub fn collides_with_layer(&self, bounds: Rect, role: LayerRole) -> bool {
        let camera = Vector2::new(-self.grid.sx, -self.grid.sy);
        self.layer(role).is_online() && self.grid.layer_collides_with(role, bounds.translated(camera))
    }

    pub fn collides_with_walls(&self, bounds: Rect) -> bool {
        self.collides_with_layer(bounds, LayerRole::Walls)
            || self.collides_with_layer(bounds, LayerRole::Solid)
    }

    pub fn collides_with_blockers(&self, bounds: Rect) -> bool {
        self.collides_with_layer(bounds, LayerRole::Blockers)
            || self.collides_with_layer(bounds, LayerRole::Solid)
    }

    /// Keep a `width` x `height` box inside the map.
    pub fn clamp_position(&self, pos: Vector2, width: f64, height: f64) -> Vector2 {
        Vector2::new(
            clamp(pos.x, 0.0, self.width() - width),
            clamp(pos.y, 0.0, self.height() - height),
        )
    }
}
