/// LevelController: lives, level progression and the win sequence.
///
/// ## Tick Order
///
///   1. `Map::tick` (entities, then layers, then dead entities dropped)
///   2. Player collisions, in entity list order
///   3. Camera follows the player at player speed
///   4. Level advance, or completion and the delayed win orbit
///   5. Shared orbit angle advances
///
/// ## Collision Rules
///
/// ┌───────────┬──────────────────────────────────────────────────────┐
/// │ Other     │ Effect on overlap                                     │
/// ├───────────┼──────────────────────────────────────────────────────┤
/// │ Pursuer   │ kills the player unless stuck, already killed, or the │
/// │           │ level is finished; one life lost per death            │
/// │ Artifact  │ collected                                             │
/// │ Switch    │ first contact requests a solid-layer toggle           │
/// └───────────┴──────────────────────────────────────────────────────┘

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::domain::entity::{Role, Surface, TickContext};
use crate::domain::player::InputSnapshot;
use crate::domain::tile::LayerRole;
use crate::sim::event::GameEvent;
use crate::sim::level::{LevelDef, LevelError};
use crate::sim::map::{Factories, Map, DEFAULT_VIEWPORT};

pub const MAX_LIVES: u32 = 5;
/// Help text stays up this long after a level starts.
pub const TEXT_DURATION_MS: f64 = 3000.0;
/// Delay between the last artifact and the pursuers starting to orbit.
pub const ORBIT_DELAY_MS: f64 = 1500.0;
pub const ORBIT_STEP: f64 = 0.005;

/// End credits, one line per text slot. Empty entries are pauses.
const FINAL_TEXTS: &[&str] = &[
    "YOU DID IT",
    "YOU FINISHED 'THEY FOLLOW'",
    "A JS13KGAMES 2018 ENTRY",
    "",
    "AUTHORS:",
    "TERO JÄNTTI",
    "SAMI HEIKKINEN",
    "",
    "THANK YOU:",
    "STRAKER - KONTRA LIBRARY",
    "BITS'N'BITES - SOUNDBOX",
    "SHREYAS MINOCHA - JS13K-BOILERPLATE",
    "THE WHOLE JS13KGAMES COMMUNITY :)",
    "",
    "THANKS FOR PLAYING!",
    "",
];

/// Tunables the frontend reads from config.
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    pub max_lives: u32,
    pub player_speed: f64,
    pub seed: u64,
}

pub struct LevelController {
    levels: Vec<LevelDef>,
    factories: Factories,
    level_index: usize,
    lives: u32,
    max_lives: u32,
    player_speed: f64,
    map: Map,
    orbit_angle: f64,
    completed_at: Option<f64>,
    orbiting: bool,
    rng: Pcg32,
    viewport: (f64, f64),
}

impl LevelController {
    /// Start at the first level. Fails on an empty list or a bad first level.
    pub fn new(levels: Vec<LevelDef>, settings: Settings, now: f64) -> Result<Self, LevelError> {
        let first = levels.first().ok_or(LevelError::Empty)?;
        let factories = Factories::standard();
        let mut rng = Pcg32::seed_from_u64(settings.seed);
        let map = Map::load(first, &factories, now, rng.random())?;
        log::info!("starting at level 1/{}: {}", levels.len(), first.name);

        Ok(LevelController {
            levels,
            factories,
            level_index: 0,
            lives: settings.max_lives.max(1),
            max_lives: settings.max_lives.max(1),
            player_speed: settings.player_speed,
            map,
            orbit_angle: 0.0,
            completed_at: None,
            orbiting: false,
            rng,
            viewport: DEFAULT_VIEWPORT,
        })
    }

    // ── Accessors ──

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
        self.map.set_viewport(width, height);
    }

    // ── Simulation ──

    pub fn tick(&mut self, now: f64, input: InputSnapshot) -> Result<Vec<GameEvent>, LevelError> {
        let mut events = vec![];
        let ctx = TickContext {
            now,
            input,
            player_speed: self.player_speed,
            orbit_angle: self.orbit_angle,
        };

        self.map.tick(&ctx);
        self.resolve_collisions(now, &mut events);

        if let Some(focus) = self.map.player().map(|p| p.pos) {
            self.map.adjust_camera(focus, self.player_speed);
        }

        if self.map.is_finished() {
            if self.level_index + 1 < self.levels.len() {
                events.push(GameEvent::LevelCleared { index: self.level_index });
                log::info!("level {} cleared", self.level_index + 1);
                self.level_index += 1;
                self.load_map(now)?;
                events.push(GameEvent::LevelStarted { index: self.level_index });
            } else {
                match self.completed_at {
                    None => {
                        self.completed_at = Some(now);
                        log::info!("all {} levels cleared", self.levels.len());
                        events.push(GameEvent::LevelCleared { index: self.level_index });
                        events.push(GameEvent::GameCompleted);
                    }
                    Some(at) if !self.orbiting && now - at > ORBIT_DELAY_MS => {
                        self.orbiting = true;
                        self.map.start_winning_animation();
                    }
                    Some(_) => {}
                }
            }
        }

        self.orbit_angle += ORBIT_STEP;
        Ok(events)
    }

    fn resolve_collisions(&mut self, now: f64, events: &mut Vec<GameEvent>) {
        let Some(pi) = self.map.player_index() else { return };

        for i in 0..self.map.entities().len() {
            if i == pi {
                continue;
            }
            let entities = self.map.entities();
            let other = &entities[i];
            let (role, stuck) = (other.role(), other.is_stuck());
            let overlaps = entities[pi].collides_with(other);
            match role {
                Role::Pursuer if overlaps && !stuck => {
                    if !self.map.is_finished() && self.map.kill_player() {
                        self.lives = self.lives.saturating_sub(1);
                        log::info!("player caught, {} lives left", self.lives);
                        events.push(GameEvent::PlayerKilled { lives_left: self.lives });
                    }
                }
                Role::Item if overlaps => {
                    if self.map.collect_item(i) {
                        events.push(GameEvent::ItemCollected);
                    }
                }
                Role::Switch => {
                    if self.map.set_switch(i, overlaps) {
                        self.map.toggle_layer(LayerRole::Solid, now);
                        events.push(GameEvent::SwitchPressed);
                    }
                }
                _ => {}
            }
        }
    }

    /// Restart after a death. With no lives left the game starts over.
    pub fn confirm(&mut self, now: f64) -> Result<Vec<GameEvent>, LevelError> {
        if !self.map.is_player_killed() {
            return Ok(vec![]);
        }
        if self.lives == 0 {
            log::info!("game over, starting again");
            self.lives = self.max_lives;
            self.level_index = 0;
        }
        self.restart(now)
    }

    /// Reload the current level with fresh timers.
    pub fn restart(&mut self, now: f64) -> Result<Vec<GameEvent>, LevelError> {
        self.load_map(now)?;
        Ok(vec![GameEvent::LevelStarted { index: self.level_index }])
    }

    fn load_map(&mut self, now: f64) -> Result<(), LevelError> {
        let level = &self.levels[self.level_index];
        self.map = Map::load(level, &self.factories, now, self.rng.random())?;
        self.map.set_viewport(self.viewport.0, self.viewport.1);
        self.completed_at = None;
        self.orbiting = false;
        Ok(())
    }

    pub fn render(&mut self, surface: &mut dyn Surface) {
        self.map.render(surface);
    }

    // ── Text ──

    /// `A: collected / total   L: lives`, only on levels with artifacts.
    pub fn status_text(&self) -> Option<String> {
        (self.map.item_total() > 0).then(|| {
            format!(
                "A: {} / {}   L: {}",
                self.map.items_collected(),
                self.map.item_total(),
                self.lives
            )
        })
    }

    /// Centered message: death prompt, level help, or the closing lines.
    pub fn info_text(&self, now: f64) -> Option<String> {
        if self.map.is_player_killed() {
            let prompt = if self.lives > 0 { "TRY AGAIN (ENTER)" } else { "GAME OVER! (ENTER)" };
            return Some(prompt.to_string());
        }
        if let Some(at) = self.completed_at {
            let since = now - at - 2.0 * TEXT_DURATION_MS;
            if since >= 0.0 {
                let line = (since / TEXT_DURATION_MS) as usize % FINAL_TEXTS.len();
                return Some(FINAL_TEXTS[line].to_string()).filter(|s| !s.is_empty());
            }
        }
        if now - self.map.started_at() < TEXT_DURATION_MS {
            return self.map.help().map(str::to_string);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{EntityKind, Role};
    use crate::sim::level::parse_level;

    const TICK: f64 = 16.0;
    const RIGHT: InputSnapshot = InputSnapshot { left: false, right: true, up: false, down: false };

    fn controller(levels: &[&str], max_lives: u32) -> LevelController {
        let defs = levels.iter().map(|l| parse_level(l).unwrap()).collect();
        let settings = Settings { max_lives, player_speed: 1.5, seed: 11 };
        LevelController::new(defs, settings, 0.0).unwrap()
    }

    /// Tick `n` times from `start`, holding `input`. Returns all events.
    fn run(c: &mut LevelController, start: f64, n: usize, input: InputSnapshot) -> Vec<GameEvent> {
        let mut all = vec![];
        for k in 0..n {
            all.extend(c.tick(start + k as f64 * TICK, input).unwrap());
        }
        all
    }

    fn deaths(events: &[GameEvent]) -> usize {
        events.iter().filter(|e| matches!(e, GameEvent::PlayerKilled { .. })).count()
    }

    #[test]
    fn empty_level_list_is_an_error() {
        let settings = Settings { max_lives: 3, player_speed: 1.5, seed: 1 };
        assert_eq!(LevelController::new(vec![], settings, 0.0).err(), Some(LevelError::Empty));
    }

    #[test]
    fn pursuer_kills_once_and_costs_one_life() {
        let mut c = controller(&["@G  a"], 3);
        let events = run(&mut c, 0.0, 120, InputSnapshot::default());
        assert_eq!(deaths(&events), 1);
        assert_eq!(c.lives(), 2);
        assert!(c.map().is_player_killed());
        assert_eq!(c.info_text(2000.0).as_deref(), Some("TRY AGAIN (ENTER)"));
    }

    #[test]
    fn confirm_restarts_the_same_level() {
        let mut c = controller(&["@  a", "@G  a"], 3);
        assert!(c.confirm(0.0).unwrap().is_empty());
        // Pick up the artifact to reach level 2, then die there.
        let events = run(&mut c, 0.0, 60, RIGHT);
        assert!(events.contains(&GameEvent::LevelStarted { index: 1 }));
        run(&mut c, 1000.0, 120, InputSnapshot::default());
        assert!(c.map().is_player_killed());

        let events = c.confirm(5000.0).unwrap();
        assert_eq!(events, vec![GameEvent::LevelStarted { index: 1 }]);
        assert_eq!(c.level_index(), 1);
        assert_eq!(c.lives(), 2);
        assert!(!c.map().is_player_killed());
    }

    #[test]
    fn game_over_resets_lives_and_level() {
        let mut c = controller(&["@  a", "@G  a"], 1);
        run(&mut c, 0.0, 60, RIGHT);
        run(&mut c, 1000.0, 120, InputSnapshot::default());
        assert_eq!(c.lives(), 0);
        assert_eq!(c.info_text(5000.0).as_deref(), Some("GAME OVER! (ENTER)"));

        c.confirm(5000.0).unwrap();
        assert_eq!(c.lives(), 1);
        assert_eq!(c.level_index(), 0);
    }

    #[test]
    fn collecting_every_artifact_advances() {
        let mut c = controller(&["@ a", "@   a"], 3);
        assert_eq!(c.status_text().as_deref(), Some("A: 0 / 1   L: 3"));
        let events = run(&mut c, 0.0, 40, RIGHT);
        assert_eq!(
            events.iter().filter(|e| **e == GameEvent::ItemCollected).count(),
            1
        );
        assert!(events.contains(&GameEvent::LevelCleared { index: 0 }));
        assert_eq!(c.level_index(), 1);
    }

    #[test]
    fn restart_resets_level_clock() {
        let mut c = controller(&["> GO\n@ a"], 3);
        assert!(c.info_text(5000.0).is_none());
        let events = c.restart(5000.0).unwrap();
        assert_eq!(events, vec![GameEvent::LevelStarted { index: 0 }]);
        assert_eq!(c.info_text(6000.0).as_deref(), Some("GO"));
    }

    #[test]
    fn status_text_hidden_without_artifacts() {
        let c = controller(&["@G"], 3);
        assert!(c.status_text().is_none());
    }

    #[test]
    fn help_text_shows_for_three_seconds() {
        let c = controller(&["> RUN\n@ a"], 3);
        assert_eq!(c.info_text(100.0).as_deref(), Some("RUN"));
        assert!(c.info_text(3100.0).is_none());
    }

    #[test]
    fn switch_toggles_solid_once_per_contact() {
        let mut c = controller(&[" @o     a\nOOOOOOOOO"], 3);
        let events = run(&mut c, 0.0, 30, RIGHT);
        let presses = events.iter().filter(|e| **e == GameEvent::SwitchPressed).count();
        assert_eq!(presses, 1);
        assert!(c.map().layer(LayerRole::Solid).is_pending());

        run(&mut c, 2000.0, 1, InputSnapshot::default());
        assert!(!c.map().layer(LayerRole::Solid).is_online());
    }

    #[test]
    fn finished_last_level_completes_then_orbits() {
        let mut c = controller(&["@   G"], 3);
        let events = c.tick(0.0, InputSnapshot::default()).unwrap();
        assert!(events.contains(&GameEvent::GameCompleted));
        assert!(c.is_complete());

        // No second completion, no orbit before the delay.
        assert!(c.tick(1000.0, InputSnapshot::default()).unwrap().is_empty());
        let orbiting = |c: &LevelController| {
            c.map().entities().iter().any(|e| matches!(&e.kind, EntityKind::Pursuer(p) if p.orbit_index.is_some()))
        };
        assert!(!orbiting(&c));
        c.tick(1600.0, InputSnapshot::default()).unwrap();
        assert!(orbiting(&c));
    }

    #[test]
    fn finished_level_is_safe_from_pursuers() {
        let mut c = controller(&["@G"], 3);
        let events = run(&mut c, 0.0, 60, InputSnapshot::default());
        assert_eq!(deaths(&events), 0);
        assert_eq!(c.lives(), 3);
    }

    fn players(c: &LevelController) -> usize {
        c.map().entities().iter().filter(|e| e.role() == Role::Player).count()
    }

    #[test]
    fn restart_reloads_identical_counts() {
        let mut c = controller(&["@a   a      G"], 3);
        assert_eq!(c.map().item_total(), 2);
        let events = run(&mut c, 0.0, 20, RIGHT);
        assert!(events.contains(&GameEvent::ItemCollected));
        assert_eq!(c.map().items_collected(), 1);

        let events = c.restart(1000.0).unwrap();
        assert_eq!(events, vec![GameEvent::LevelStarted { index: 0 }]);
        assert_eq!(c.map().item_total(), 2);
        assert_eq!(c.map().items_collected(), 0);
        assert_eq!(players(&c), 1);
    }

    #[test]
    fn final_texts_cycle_after_completion() {
        let mut c = controller(&["@"], 3);
        c.tick(0.0, InputSnapshot::default()).unwrap();
        assert!(c.info_text(5000.0).is_none());
        assert_eq!(c.info_text(6100.0).as_deref(), Some(FINAL_TEXTS[0]));
        assert_eq!(c.info_text(9100.0).as_deref(), Some(FINAL_TEXTS[1]));
        assert_eq!(c.info_text(12100.0).as_deref(), Some("A JS13KGAMES 2018 ENTRY"));
        // A blank slot is a pause, not an empty string.
        assert!(c.info_text(15100.0).is_none());
        assert_eq!(c.info_text(18100.0).as_deref(), Some("AUTHORS:"));
        let cycle = FINAL_TEXTS.len() as f64 * TEXT_DURATION_MS;
        assert_eq!(c.info_text(6100.0 + cycle).as_deref(), Some(FINAL_TEXTS[0]));
    }

    #[test]
    fn camera_follows_player_to_the_edge() {
        let mut c = controller(&["@          a"], 3);
        c.set_viewport(300.0, 300.0);
        run(&mut c, 0.0, 10, RIGHT);
        // Player near the left edge keeps the camera scrolling left.
        assert!(c.map().camera().x < 0.0);
    }
}
