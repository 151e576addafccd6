/// Entities: Player, Pursuer, Artifact, Switch.
///
/// One closed enum over behaviors sharing a common body (top-left
/// position, size, alive flag). `alive == false` means "remove at the
/// end of this tick"; a killed player stays in the list with
/// `Player::killed` set instead.

use rand::Rng;

use super::geometry::{Rect, Vector2};
use super::layer::Layer;
use super::player::{InputSnapshot, Player};
use super::pursuer::Pursuer;
use super::rules::MapView;
use super::tile::TileGrid;

pub const PLAYER_SIZE: (f64, f64) = (22.0, 24.0);
pub const PURSUER_SIZE: (f64, f64) = (28.0, 28.0);
pub const ARTIFACT_SIZE: (f64, f64) = (22.0, 22.0);
pub const SWITCH_SIZE: (f64, f64) = (20.0, 20.0);

/// Role tag used by the map counters and the collision resolver.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Player,
    Pursuer,
    Item,
    Switch,
}

#[derive(Clone, Debug)]
pub enum EntityKind {
    Player(Player),
    Pursuer(Pursuer),
    Artifact,
    /// `pressed` while the player stands on it; a press fires on the edge.
    Switch { pressed: bool },
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub pos: Vector2,
    pub width: f64,
    pub height: f64,
    pub alive: bool,
    pub kind: EntityKind,
}

/// Everything an entity may read during its update besides the map.
#[derive(Clone, Copy, Debug)]
pub struct TickContext {
    pub now: f64,
    pub input: InputSnapshot,
    pub player_speed: f64,
    /// Shared angle of the post-win orbit, advanced by the controller.
    pub orbit_angle: f64,
}

/// Read-only copy of the player taken before each entity update.
#[derive(Clone, Copy, Debug)]
pub struct PlayerSnapshot {
    pub bounds: Rect,
    pub killed: bool,
}

/// Capability for the post-win orbit. Only pursuers implement it.
pub trait Orbiter {
    fn start_orbit(&mut self, index: usize);
}

// ── Rendering contract ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sprite {
    Player { killed: bool },
    Pursuer { stuck: bool },
    Artifact,
    Switch { pressed: bool },
}

/// Drawing target for the map. Positions are camera-translated pixels.
pub trait Surface {
    fn draw_layer(&mut self, grid: &TileGrid, layer: &Layer, offset: Vector2);
    fn draw_sprite(&mut self, sprite: Sprite, bounds: Rect);
}

// ── Construction ──

impl Entity {
    fn new(pos: Vector2, size: (f64, f64), kind: EntityKind) -> Self {
        Entity { pos, width: size.0, height: size.1, alive: true, kind }
    }

    pub fn player(pos: Vector2) -> Self {
        Entity::new(pos, PLAYER_SIZE, EntityKind::Player(Player::default()))
    }

    pub fn pursuer<R: Rng + ?Sized>(pos: Vector2, rng: &mut R) -> Self {
        Entity::new(pos, PURSUER_SIZE, EntityKind::Pursuer(Pursuer::new(rng)))
    }

    pub fn artifact(pos: Vector2) -> Self {
        Entity::new(pos, ARTIFACT_SIZE, EntityKind::Artifact)
    }

    pub fn switch(pos: Vector2) -> Self {
        Entity::new(pos, SWITCH_SIZE, EntityKind::Switch { pressed: false })
    }
}

// ── Queries ──

impl Entity {
    pub fn role(&self) -> Role {
        match self.kind {
            EntityKind::Player(_) => Role::Player,
            EntityKind::Pursuer(_) => Role::Pursuer,
            EntityKind::Artifact => Role::Item,
            EntityKind::Switch { .. } => Role::Switch,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::at(self.pos, self.width, self.height)
    }

    /// Strict AABB overlap against another entity.
    pub fn collides_with(&self, other: &Entity) -> bool {
        self.bounds().overlaps(&other.bounds())
    }

    /// Pursuer pacing at a barrier. Stuck pursuers are harmless.
    pub fn is_stuck(&self) -> bool {
        matches!(&self.kind, EntityKind::Pursuer(p) if p.stuck)
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_orbiter_mut(&mut self) -> Option<&mut dyn Orbiter> {
        match &mut self.kind {
            EntityKind::Pursuer(p) => Some(p),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<PlayerSnapshot> {
        self.as_player().map(|p| PlayerSnapshot { bounds: self.bounds(), killed: p.killed })
    }

    pub fn sprite(&self) -> Sprite {
        match &self.kind {
            EntityKind::Player(p) => Sprite::Player { killed: p.killed },
            EntityKind::Pursuer(p) => Sprite::Pursuer { stuck: p.stuck },
            EntityKind::Artifact => Sprite::Artifact,
            EntityKind::Switch { pressed } => Sprite::Switch { pressed: *pressed },
        }
    }
}

// ── Behavior ──

impl Entity {
    pub fn update<R: Rng + ?Sized>(&mut self, map: &MapView, ctx: &TickContext, rng: &mut R) {
        let bounds = self.bounds();
        match &mut self.kind {
            EntityKind::Player(p) => {
                self.pos = p.update(bounds, map, ctx.input, ctx.player_speed);
            }
            EntityKind::Pursuer(p) => {
                self.pos = p.update(bounds, map, ctx, rng);
            }
            EntityKind::Artifact | EntityKind::Switch { .. } => {}
        }
    }

    pub fn render(&self, surface: &mut dyn Surface, offset: Vector2) {
        surface.draw_sprite(self.sprite(), self.bounds().translated(offset));
    }
}
