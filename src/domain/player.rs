/// Player movement: held-direction input, diagonal normalization,
/// and wall sliding.
///
/// Candidates are tried in order (full move, horizontal only, vertical
/// only). Each is clamped to the map before the wall check; the first
/// free one wins, otherwise the player stays put.

use super::geometry::{Rect, Vector2};
use super::rules::MapView;

/// Pixels per tick along one axis.
pub const PLAYER_SPEED: f64 = 1.5;
/// ~1/sqrt(2): keeps diagonal speed equal to axial speed.
pub const DIAGONAL_FACTOR: f64 = 0.707;

/// Held directions for this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct InputSnapshot {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Player {
    /// Caught by a pursuer. Frozen until the level restarts.
    pub killed: bool,
}

impl Player {
    /// Intended displacement. Left beats right, up beats down.
    pub fn displacement(input: InputSnapshot, speed: f64) -> Vector2 {
        let mut dx = if input.left {
            -speed
        } else if input.right {
            speed
        } else {
            0.0
        };
        let mut dy = if input.up {
            -speed
        } else if input.down {
            speed
        } else {
            0.0
        };
        if dx != 0.0 && dy != 0.0 {
            dx *= DIAGONAL_FACTOR;
            dy *= DIAGONAL_FACTOR;
        }
        Vector2::new(dx, dy)
    }

    /// New top-left position after one tick.
    pub fn update(&self, bounds: Rect, map: &MapView, input: InputSnapshot, speed: f64) -> Vector2 {
        let here = bounds.pos();
        if self.killed {
            return here;
        }
        let d = Player::displacement(input, speed);
        if d == Vector2::ZERO {
            return here;
        }

        let candidates = [d, Vector2::new(d.x, 0.0), Vector2::new(0.0, d.y)];
        for step in candidates {
            if step == Vector2::ZERO {
                continue;
            }
            let pos = map.clamp_position(here + step, bounds.width, bounds.height);
            if !map.collides_with_walls(Rect::at(pos, bounds.width, bounds.height)) {
                return pos;
            }
        }
        here
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::PLAYER_SIZE;
    use crate::domain::rules::test_support::Fixture;
    use proptest::prelude::*;

    const RIGHT: InputSnapshot = InputSnapshot { left: false, right: true, up: false, down: false };
    const DOWN_RIGHT: InputSnapshot = InputSnapshot { left: false, right: true, up: false, down: true };

    fn bounds(x: f64, y: f64) -> Rect {
        Rect::new(x, y, PLAYER_SIZE.0, PLAYER_SIZE.1)
    }

    #[test]
    fn moves_axially_at_full_speed() {
        let f = Fixture::new(&["    ", "    "]);
        let p = Player::default();
        let pos = p.update(bounds(10.0, 10.0), &f.view(None), RIGHT, PLAYER_SPEED);
        assert_eq!(pos, Vector2::new(11.5, 10.0));
    }

    #[test]
    fn diagonal_speed_matches_axial_speed() {
        let d = Player::displacement(DOWN_RIGHT, PLAYER_SPEED);
        assert!((d.magnitude() - PLAYER_SPEED).abs() < 1e-3);
    }

    #[test]
    fn left_wins_over_right() {
        let both = InputSnapshot { left: true, right: true, up: false, down: false };
        assert_eq!(Player::displacement(both, 2.0), Vector2::new(-2.0, 0.0));
    }

    #[test]
    fn slides_along_wall_below() {
        // Wall row directly under the player: the vertical part is refused.
        let f = Fixture::new(&["    ", "===="]);
        let p = Player::default();
        let start = bounds(10.0, 32.0 - PLAYER_SIZE.1);
        let pos = p.update(start, &f.view(None), DOWN_RIGHT, PLAYER_SPEED);
        assert!(pos.x > 10.0);
        assert_eq!(pos.y, start.y);
    }

    #[test]
    fn slides_vertically_when_wall_on_the_right() {
        let f = Fixture::new(&[" =", "  ", "  "]);
        let p = Player::default();
        let start = bounds(32.0 - PLAYER_SIZE.0, 40.0);
        let pos = p.update(start, &f.view(None), DOWN_RIGHT, PLAYER_SPEED);
        // Moving right into row 1 is free, so full move applies.
        assert!(pos.x > start.x && pos.y > start.y);

        // Next to the wall the full and horizontal moves are refused.
        let start = bounds(32.0 - PLAYER_SIZE.0, 2.0);
        let pos = p.update(start, &f.view(None), DOWN_RIGHT, PLAYER_SPEED);
        assert_eq!(pos.x, start.x);
        assert!(pos.y > start.y);
    }

    #[test]
    fn boxed_in_player_stays_put() {
        let f = Fixture::new(&["===", "= =", "==="]);
        let p = Player::default();
        let start = bounds(37.0, 36.0);
        assert_eq!(p.update(start, &f.view(None), DOWN_RIGHT, 10.0), start.pos());
    }

    #[test]
    fn killed_player_does_not_move() {
        let f = Fixture::new(&["    "]);
        let p = Player { killed: true };
        assert_eq!(p.update(bounds(3.0, 4.0), &f.view(None), RIGHT, PLAYER_SPEED), Vector2::new(3.0, 4.0));
    }

    proptest! {
        #[test]
        fn movement_stays_inside_map(
            x in 0.0f64..(96.0 - PLAYER_SIZE.0),
            y in 0.0f64..(64.0 - PLAYER_SIZE.1),
            left in any::<bool>(), right in any::<bool>(),
            up in any::<bool>(), down in any::<bool>(),
            speed in 0.5f64..40.0,
        ) {
            let f = Fixture::new(&["   ", "   "]);
            let input = InputSnapshot { left, right, up, down };
            let pos = Player::default().update(bounds(x, y), &f.view(None), input, speed);
            prop_assert!(pos.x >= 0.0 && pos.x <= 96.0 - PLAYER_SIZE.0);
            prop_assert!(pos.y >= 0.0 && pos.y <= 64.0 - PLAYER_SIZE.1);
        }

        #[test]
        fn diagonal_equals_axial_for_any_speed(speed in 0.1f64..100.0) {
            let d = Player::displacement(DOWN_RIGHT, speed);
            prop_assert!((d.magnitude() - speed).abs() <= speed * 1e-3);
        }
    }
}
