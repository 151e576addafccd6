/// Map: the running state of one level.
///
/// Owns the tile grid, the four layers (indexed by `LayerRole`), the
/// camera and the ordered entity list. Re-created for every level load;
/// the only constructor is [`Map::load`].
///
/// ## Tick order
///
///   1. every entity updates in list order, each seeing a fresh copy of
///      the player taken right before its own update
///   2. every layer advances its timers
///   3. entities with `alive == false` are dropped
///
/// ## Camera
///
/// `(grid.sx, grid.sy)` is the world pixel shown at the viewport's top-left.
/// The camera nudges by `speed` per tick whenever the focus gets closer
/// than [`CAMERA_MARGIN`] to a viewport edge. It is never clamped.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::domain::entity::{Entity, EntityKind, Role, Surface, TickContext};
use crate::domain::geometry::{Rect, Vector2};
use crate::domain::layer::Layer;
use crate::domain::rules::MapView;
use crate::domain::tile::{LayerRole, TileGrid, TILE_SIZE};
use crate::sim::level::{LevelDef, LevelError};

pub const CAMERA_MARGIN: f64 = 200.0;
/// Viewport used until the frontend reports its real size.
pub const DEFAULT_VIEWPORT: (f64, f64) = (640.0, 480.0);

/// Builds the entity for a legend char at a tile's top-left pixel.
pub type EntityFactory = fn(&mut Map, Vector2) -> Entity;

// ══════════════════════════════════════════════════════════════
// Factories
// ══════════════════════════════════════════════════════════════

/// Legend char → entity constructor.
pub struct Factories {
    table: HashMap<char, EntityFactory>,
}

impl Factories {
    pub fn empty() -> Self {
        Factories { table: HashMap::new() }
    }

    /// Player, pursuers, artifacts and switches, placed inside their tile.
    pub fn standard() -> Self {
        let mut f = Factories::empty();
        f.register('@', |_, at| Entity::player(at + Vector2::new(5.0, 0.0)));
        f.register('G', |map, at| Entity::pursuer(at, &mut map.rng));
        f.register('a', |_, at| Entity::artifact(at + Vector2::new(5.0, 5.0)));
        f.register('A', |_, at| Entity::artifact(at + Vector2::new(5.0, 5.0)));
        f.register('o', |_, at| Entity::switch(at + Vector2::new(6.0, 6.0)));
        f
    }

    pub fn register(&mut self, ch: char, factory: EntityFactory) {
        self.table.insert(ch, factory);
    }

    fn get(&self, ch: char) -> Option<EntityFactory> {
        self.table.get(&ch).copied()
    }
}

// ══════════════════════════════════════════════════════════════
// Map
// ══════════════════════════════════════════════════════════════

pub struct Map {
    name: String,
    help: Option<String>,
    grid: TileGrid,
    layers: [Layer; 4],
    entities: Vec<Entity>,
    player: Option<usize>,
    item_total: usize,
    items_collected: usize,
    started_at: f64,
    viewport: (f64, f64),
    rng: Pcg32,
}

impl Map {
    /// Validate `level`, build grid and layers, then spawn entities
    /// row-major through `factories`.
    pub fn load(level: &LevelDef, factories: &Factories, now: f64, seed: u64) -> Result<Map, LevelError> {
        let tiles = level.tiles()?;
        let grid = TileGrid::from_tiles(&tiles);
        let layers = LayerRole::ALL.map(|role| {
            let schedule = if role == LayerRole::Blockers { level.schedule } else { None };
            Layer::new(role, schedule, now)
        });

        let mut map = Map {
            name: level.name.clone(),
            help: level.help.clone(),
            grid,
            layers,
            entities: vec![],
            player: None,
            item_total: 0,
            items_collected: 0,
            started_at: now,
            viewport: DEFAULT_VIEWPORT,
            rng: Pcg32::seed_from_u64(seed),
        };

        for (y, row) in level.rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if let Some(factory) = factories.get(ch) {
                    let at = Vector2::new(x as f64 * TILE_SIZE, y as f64 * TILE_SIZE);
                    let entity = factory(&mut map, at);
                    map.add_entity(entity)?;
                }
            }
        }

        if map.player.is_none() {
            return Err(LevelError::NoPlayer);
        }

        log::info!(
            "loaded level '{}': {}x{} tiles, {} entities, {} artifacts",
            map.name,
            map.grid.cols(),
            map.grid.rows(),
            map.entities.len(),
            map.item_total
        );
        Ok(map)
    }

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), LevelError> {
        match entity.role() {
            Role::Player => {
                if let Some(first) = self.player {
                    return Err(LevelError::MultiplePlayers {
                        first: tile_of(self.entities[first].pos),
                        second: tile_of(entity.pos),
                    });
                }
                self.player = Some(self.entities.len());
            }
            Role::Item => self.item_total += 1,
            Role::Pursuer | Role::Switch => {}
        }
        self.entities.push(entity);
        Ok(())
    }

    // ── Queries ──

    pub fn view(&self) -> MapView<'_> {
        MapView {
            grid: &self.grid,
            layers: &self.layers,
            player: self.player().and_then(Entity::snapshot),
        }
    }

    pub fn collides_with_layer(&self, bounds: Rect, role: LayerRole) -> bool {
        self.view().collides_with_layer(bounds, role)
    }

    pub fn collides_with_walls(&self, bounds: Rect) -> bool {
        self.view().collides_with_walls(bounds)
    }

    pub fn collides_with_blockers(&self, bounds: Rect) -> bool {
        self.view().collides_with_blockers(bounds)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn width(&self) -> f64 {
        self.grid.width_px()
    }

    pub fn height(&self) -> f64 {
        self.grid.height_px()
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn layer(&self, role: LayerRole) -> &Layer {
        &self.layers[role.index()]
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn player_index(&self) -> Option<usize> {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.map(|i| &self.entities[i])
    }

    pub fn is_player_killed(&self) -> bool {
        self.player().and_then(Entity::as_player).map_or(false, |p| p.killed)
    }

    pub fn item_total(&self) -> usize {
        self.item_total
    }

    pub fn items_collected(&self) -> usize {
        self.items_collected
    }

    pub fn is_finished(&self) -> bool {
        self.items_collected == self.item_total
    }

    /// World pixel at the viewport's top-left.
    pub fn camera(&self) -> Vector2 {
        Vector2::new(self.grid.sx, self.grid.sy)
    }

    // ── Mutation ──

    pub fn tick(&mut self, ctx: &TickContext) {
        for i in 0..self.entities.len() {
            let player = self.player.and_then(|p| self.entities[p].snapshot());
            let view = MapView { grid: &self.grid, layers: &self.layers, player };
            self.entities[i].update(&view, ctx, &mut self.rng);
        }

        for layer in self.layers.iter_mut() {
            layer.tick(ctx.now);
        }

        self.entities.retain(|e| e.alive);
        self.player = self.entities.iter().position(|e| e.role() == Role::Player);
    }

    pub fn toggle_layer(&mut self, role: LayerRole, now: f64) {
        self.layers[role.index()].request_toggle(now);
    }

    /// Mark the item at `index` collected. Returns `false` if it was not
    /// a live item.
    pub fn collect_item(&mut self, index: usize) -> bool {
        match self.entities.get_mut(index) {
            Some(e) if e.alive && e.role() == Role::Item => {
                e.alive = false;
                self.items_collected += 1;
                true
            }
            _ => false,
        }
    }

    /// Mark the player killed. Returns `true` only on the first call.
    pub fn kill_player(&mut self) -> bool {
        let Some(i) = self.player else { return false };
        match self.entities[i].as_player_mut() {
            Some(p) if !p.killed => {
                p.killed = true;
                true
            }
            _ => false,
        }
    }

    /// Update a switch's contact state. Returns `true` on the press edge.
    pub fn set_switch(&mut self, index: usize, contact: bool) -> bool {
        match self.entities.get_mut(index).map(|e| &mut e.kind) {
            Some(EntityKind::Switch { pressed }) => {
                let edge = contact && !*pressed;
                *pressed = contact;
                edge
            }
            _ => false,
        }
    }

    /// Send every pursuer into orbit around the player, in list order.
    pub fn start_winning_animation(&mut self) {
        let orbiters = self.entities.iter_mut().filter_map(Entity::as_orbiter_mut);
        for (index, orbiter) in orbiters.enumerate() {
            orbiter.start_orbit(index);
        }
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    /// Scroll toward `focus` (world pixels) when it nears a viewport edge.
    pub fn adjust_camera(&mut self, focus: Vector2, speed: f64) {
        let (view_w, view_h) = self.viewport;
        self.grid.sx += edge_scroll(focus.x, self.grid.sx, view_w, speed);
        self.grid.sy += edge_scroll(focus.y, self.grid.sy, view_h, speed);
    }

    pub fn render(&mut self, surface: &mut dyn Surface) {
        let offset = Vector2::new(-self.grid.sx, -self.grid.sy);

        for role in [LayerRole::Ground, LayerRole::Walls] {
            surface.draw_layer(&self.grid, &self.layers[role.index()], offset);
        }
        for role in [LayerRole::Solid, LayerRole::Blockers] {
            let layer = &self.layers[role.index()];
            if layer.is_visible(&mut self.rng) {
                surface.draw_layer(&self.grid, layer, offset);
            }
        }

        for entity in &self.entities {
            entity.render(surface, offset);
        }
    }
}

fn edge_scroll(focus: f64, camera: f64, view: f64, speed: f64) -> f64 {
    if focus - camera < CAMERA_MARGIN {
        -speed
    } else if (camera + view) - focus < CAMERA_MARGIN {
        speed
    } else {
        0.0
    }
}

/// (row, col) of the tile containing a world position.
fn tile_of(pos: Vector2) -> (usize, usize) {
    ((pos.y / TILE_SIZE).max(0.0) as usize, (pos.x / TILE_SIZE).max(0.0) as usize)
}
