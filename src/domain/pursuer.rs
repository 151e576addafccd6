/// Pursuer AI: chase with local obstacle avoidance.
///
/// Per tick, in priority order:
///   1. **Stuck**: standing in a blocker: jitter randomly, flag `stuck`,
///      nothing else this tick.
///   2. **Avoid**: a fresh avoidance target (< 1s old) wins. A stale one
///      is dropped and evaluation falls through.
///   3. **Orbit**: after the game is won, circle the player.
///   4. **Chase**: head for the player within [`CHASE_RANGE`]. With the
///      blockers offline and the player not too close, aim at a point
///      offset by the per-pursuer approach bias so the pack surrounds
///      instead of stacking.
///   5. **Move**: step one unit along the chosen direction unless the
///      blockers refuse; then pick a back-off-and-dodge avoidance target.
///
/// Pursuers only collide with blockers and solid tiles. Walls are
/// transparent to them.

use rand::Rng;

use super::entity::{Orbiter, TickContext};
use super::geometry::{Rect, Vector2};
use super::rules::MapView;

pub const CHASE_RANGE: f64 = 400.0;
/// Beyond this distance the approach bias applies (blockers offline).
pub const SPREAD_RANGE: f64 = 140.0;
pub const SPREAD_OFFSET: f64 = 130.0;
/// Full jitter width per axis; the step is within ±JITTER / 2.
pub const JITTER: f64 = 20.0;
pub const AVOID_TTL_MS: f64 = 1000.0;
pub const BACK_OFF: f64 = 5.0;
pub const DODGE: f64 = 50.0;

pub const ORBIT_RADIUS: f64 = 180.0;
pub const ORBIT_WOBBLE: f64 = 30.0;
pub const ORBIT_PHASE: f64 = 0.3;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AvoidTarget {
    pub at: Vector2,
    pub since: f64,
}

#[derive(Clone, Debug)]
pub struct Pursuer {
    /// Fixed at creation; varies the approach angle between pursuers.
    pub approach_bias: Vector2,
    pub avoid: Option<AvoidTarget>,
    pub orbit_index: Option<usize>,
    pub stuck: bool,
}

impl Pursuer {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Pursuer {
            approach_bias: Vector2::random_dir(rng),
            avoid: None,
            orbit_index: None,
            stuck: false,
        }
    }

    /// New top-left position after one tick.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        bounds: Rect,
        map: &MapView,
        ctx: &TickContext,
        rng: &mut R,
    ) -> Vector2 {
        let here = bounds.pos();

        // 1. Stuck in a blocker
        if map.collides_with_blockers(bounds) {
            self.stuck = true;
            let jitter = Vector2::new(
                (rng.random::<f64>() - 0.5) * JITTER,
                (rng.random::<f64>() - 0.5) * JITTER,
            );
            return map.clamp_position(here + jitter, bounds.width, bounds.height);
        }
        self.stuck = false;

        // 2. Avoidance target
        let mut movement = None;
        if let Some(avoid) = self.avoid {
            if ctx.now - avoid.since > AVOID_TTL_MS {
                self.avoid = None;
            } else {
                movement = Some((avoid.at - here).normalized());
            }
        }

        // 3-4. Orbit or chase
        if movement.is_none() {
            movement = match (self.orbit_index, map.player) {
                (Some(index), Some(player)) => {
                    Some((orbit_point(player.bounds.pos(), index, ctx.orbit_angle) - here).normalized())
                }
                (None, Some(player)) if !player.killed => {
                    self.chase_target(here, player.bounds, map.blockers_online())
                        .map(|target| (target - here).normalized())
                }
                _ => None,
            };
        }

        // 5. Move or pick a way around
        let Some(step) = movement else { return here };
        if !map.collides_with_blockers(bounds.translated(step)) {
            return map.clamp_position(here + step, bounds.width, bounds.height);
        }

        let mut target = here - step * BACK_OFF;
        let to_player = map
            .player
            .map(|p| p.bounds.center() - bounds.center())
            .unwrap_or(Vector2::ZERO);
        let dodge = if rng.random_bool(0.5) { DODGE } else { -DODGE };
        if to_player.x.abs() < to_player.y.abs() {
            target.x += dodge;
        } else {
            target.y += dodge;
        }
        self.avoid = Some(AvoidTarget { at: target, since: ctx.now });
        here
    }

    /// Where to head for, or `None` when the player is out of range.
    fn chase_target(&self, here: Vector2, player: Rect, blockers_online: bool) -> Option<Vector2> {
        let distance = here.distance(player.pos());
        if distance > CHASE_RANGE {
            return None;
        }
        let mut target = player.center();
        if !blockers_online && distance > SPREAD_RANGE {
            target = target + self.approach_bias * SPREAD_OFFSET;
        }
        Some(target)
    }
}

/// Orbit position around `center` for pursuer `index` at `angle`.
pub fn orbit_point(center: Vector2, index: usize, angle: f64) -> Vector2 {
    let phase = angle + index as f64 * ORBIT_PHASE;
    let r = ORBIT_RADIUS + (angle * 10.0).sin() * ORBIT_WOBBLE;
    center + Vector2::new(phase.cos() * r, phase.sin() * r)
}

impl Orbiter for Pursuer {
    fn start_orbit(&mut self, index: usize) {
        self.avoid = None;
        self.orbit_index = Some(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{PlayerSnapshot, PLAYER_SIZE, PURSUER_SIZE};
    use crate::domain::player::InputSnapshot;
    use crate::domain::rules::test_support::Fixture;
    use crate::domain::tile::LayerRole;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ctx(now: f64) -> TickContext {
        TickContext { now, input: InputSnapshot::default(), player_speed: 1.5, orbit_angle: 0.0 }
    }

    fn player_at(x: f64, y: f64) -> Option<PlayerSnapshot> {
        Some(PlayerSnapshot { bounds: Rect::new(x, y, PLAYER_SIZE.0, PLAYER_SIZE.1), killed: false })
    }

    fn body(x: f64, y: f64) -> Rect {
        Rect::new(x, y, PURSUER_SIZE.0, PURSUER_SIZE.1)
    }

    fn pursuer(bias: Vector2) -> Pursuer {
        Pursuer { approach_bias: bias, avoid: None, orbit_index: None, stuck: false }
    }

    /// 20 x 3 tiles of open floor.
    fn open_floor() -> Fixture {
        Fixture::new(&["                    "; 3])
    }

    #[test]
    fn out_of_range_player_is_ignored() {
        let f = open_floor();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut p = pursuer(Vector2::ZERO);
        let start = body(0.0, 0.0);
        let pos = p.update(start, &f.view(player_at(500.0, 0.0)), &ctx(0.0), &mut rng);
        assert_eq!(pos, start.pos());
        assert!(p.avoid.is_none());
    }

    #[test]
    fn chases_player_center_one_unit_per_tick() {
        let f = open_floor();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut p = pursuer(Vector2::ZERO);
        let pos = p.update(body(0.0, 30.0), &f.view(player_at(200.0, 32.0)), &ctx(0.0), &mut rng);
        assert!((pos.distance(Vector2::new(0.0, 30.0)) - 1.0).abs() < 1e-9);
        assert!(pos.x > 0.0);
    }

    #[test]
    fn ignores_killed_player() {
        let f = open_floor();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut p = pursuer(Vector2::ZERO);
        let mut snap = player_at(100.0, 0.0).unwrap();
        snap.killed = true;
        let pos = p.update(body(0.0, 0.0), &f.view(Some(snap)), &ctx(0.0), &mut rng);
        assert_eq!(pos, Vector2::ZERO);
    }

    #[test]
    fn approach_bias_only_when_blockers_offline_and_far() {
        let p = pursuer(Vector2::new(0.0, 1.0));
        let player = Rect::new(300.0, 0.0, PLAYER_SIZE.0, PLAYER_SIZE.1);
        let center = player.center();

        assert_eq!(p.chase_target(Vector2::ZERO, player, true), Some(center));
        assert_eq!(
            p.chase_target(Vector2::ZERO, player, false),
            Some(center + Vector2::new(0.0, SPREAD_OFFSET))
        );
        // Within the spread range the bias is dropped.
        assert_eq!(p.chase_target(Vector2::new(200.0, 0.0), player, false), Some(center));
    }

    #[test]
    fn stuck_pursuer_jitters_within_bounds() {
        let f = Fixture::new(&["#####", "#####", "#####"]);
        let mut rng = Pcg32::seed_from_u64(9);
        let mut p = pursuer(Vector2::ZERO);
        let start = body(60.0, 30.0);
        for t in 0..200 {
            let pos = p.update(start, &f.view(player_at(70.0, 30.0)), &ctx(t as f64), &mut rng);
            assert!(p.stuck);
            assert!((pos.x - start.x).abs() <= JITTER / 2.0);
            assert!((pos.y - start.y).abs() <= JITTER / 2.0);
            assert!(p.avoid.is_none());
        }
    }

    #[test]
    fn offline_blockers_do_not_stick() {
        let mut f = Fixture::new(&["#####", "#####", "#####"]);
        f.take_offline(LayerRole::Blockers);
        let mut rng = Pcg32::seed_from_u64(9);
        let mut p = pursuer(Vector2::ZERO);
        p.update(body(60.0, 30.0), &f.view(player_at(100.0, 30.0)), &ctx(0.0), &mut rng);
        assert!(!p.stuck);
    }

    #[test]
    fn blocked_move_sets_dodge_target() {
        // Blocker column right next to the pursuer; player beyond it.
        let f = Fixture::new(&["   #    ", "   #    ", "   #    "]);
        let mut rng = Pcg32::seed_from_u64(4);
        let mut p = pursuer(Vector2::ZERO);
        let start = body(96.0 - PURSUER_SIZE.0, 34.0);
        let pos = p.update(start, &f.view(player_at(200.0, 36.0)), &ctx(50.0), &mut rng);

        assert_eq!(pos, start.pos());
        let avoid = p.avoid.expect("avoidance target");
        assert_eq!(avoid.since, 50.0);
        // Player is mostly to the right, so the dodge is vertical.
        assert!((avoid.at.x - (start.x - BACK_OFF)).abs() < 1.0);
        assert!(((avoid.at.y - start.y).abs() - DODGE).abs() < 1.0);
    }

    #[test]
    fn avoidance_steers_then_expires_and_falls_through() {
        let f = open_floor();
        let mut rng = Pcg32::seed_from_u64(4);
        let mut p = pursuer(Vector2::ZERO);
        p.avoid = Some(AvoidTarget { at: Vector2::new(0.0, 60.0), since: 0.0 });
        let player = player_at(300.0, 0.0);

        let pos = p.update(body(0.0, 0.0), &f.view(player), &ctx(500.0), &mut rng);
        assert_eq!(pos, Vector2::new(0.0, 1.0));
        assert!(p.avoid.is_some());

        // Expired: dropped, and the chase runs in the same tick.
        let pos = p.update(body(0.0, 0.0), &f.view(player), &ctx(1000.5), &mut rng);
        assert!(p.avoid.is_none());
        assert!(pos.x > 0.0);
    }

    #[test]
    fn orbit_targets_ring_around_player() {
        let center = Vector2::new(500.0, 500.0);
        let p0 = orbit_point(center, 0, 0.0);
        assert!((p0.distance(center) - ORBIT_RADIUS).abs() < 1e-9);
        let p3 = orbit_point(center, 3, 0.0);
        assert!((p3.distance(center) - ORBIT_RADIUS).abs() < 1e-9);
        assert!(p0.distance(p3) > 1.0);
    }

    #[test]
    fn start_orbit_clears_avoidance() {
        let mut p = pursuer(Vector2::ZERO);
        p.avoid = Some(AvoidTarget { at: Vector2::ZERO, since: 0.0 });
        p.start_orbit(2);
        assert!(p.avoid.is_none());
        assert_eq!(p.orbit_index, Some(2));
    }

    proptest! {
        #[test]
        fn pursuer_stays_inside_map(x in 0.0f64..612.0, y in 0.0f64..68.0, seed in any::<u64>()) {
            let f = Fixture::new(&["        ##          "; 3]);
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut p = Pursuer::new(&mut rng);
            let pos = p.update(body(x, y), &f.view(player_at(320.0, 40.0)), &ctx(0.0), &mut rng);
            prop_assert!(pos.x >= 0.0 && pos.x <= 640.0 - PURSUER_SIZE.0);
            prop_assert!(pos.y >= 0.0 && pos.y <= 96.0 - PURSUER_SIZE.1);
        }
    }
}
