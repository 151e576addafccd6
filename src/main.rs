/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use rand::Rng;

use config::GameConfig;
use domain::player::InputSnapshot;
use sim::controller::{LevelController, Settings};
use sim::event::GameEvent;
use sim::level::load_levels;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Screen {
    Title,
    Playing,
}

fn main() {
    // The terminal owns stdout; logs go to stderr (redirect with `2>log`).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = GameConfig::load();
    let levels = load_levels(&config.levels_dir);
    let seed = config.game.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("seed {seed}, {} levels", levels.len());

    let settings = Settings {
        max_lives: config.game.max_lives,
        player_speed: config.speed.player_speed,
        seed,
    };
    let start = Instant::now();
    let mut game = match LevelController::new(levels, settings, 0.0) {
        Ok(game) => game,
        Err(e) => {
            eprintln!("Could not start: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut game, &mut renderer, sound.as_ref(), &config, start);

    if let Some(sfx) = &sound {
        sfx.stop_main();
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!("Thanks for playing They Follow!");
}

fn game_loop(
    game: &mut LevelController,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    start: Instant,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.is_connected() {
        log::info!("gamepad detected");
    }
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut screen = Screen::Title;

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_pressed() || gp.cancel_pressed() {
            break;
        }
        let confirm = kb.confirm_pressed() || gp.confirm_pressed();
        let now = start.elapsed().as_secs_f64() * 1000.0;

        match screen {
            Screen::Title => {
                if confirm {
                    // Level timers start now, not at process start.
                    let events = game.restart(now)?;
                    process_sound_events(sound, &events);
                    screen = Screen::Playing;
                    last_tick = Instant::now();
                }
                renderer.render_title(game.level_count())?;
            }
            Screen::Playing => {
                if confirm {
                    let events = game.confirm(now)?;
                    process_sound_events(sound, &events);
                }
                if last_tick.elapsed() >= tick_rate {
                    let events = game.tick(now, merge_input(&kb, &gp))?;
                    process_sound_events(sound, &events);
                    last_tick = Instant::now();
                }
                renderer.render_game(game, now)?;
            }
        }

        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn merge_input(kb: &InputState, gp: &GamepadState) -> InputSnapshot {
    let a = kb.snapshot();
    let b = gp.snapshot();
    InputSnapshot {
        left: a.left || b.left,
        right: a.right || b.right,
        up: a.up || b.up,
        down: a.down || b.down,
    }
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for event in events {
        match event {
            GameEvent::LevelStarted { .. } => sfx.play_main(),
            GameEvent::ItemCollected => sfx.play_pickup(),
            GameEvent::SwitchPressed => sfx.play_switch(),
            GameEvent::PlayerKilled { lives_left } => {
                log::debug!("death sting, {lives_left} lives left");
                sfx.play_death();
            }
            GameEvent::GameCompleted => sfx.play_complete(),
            GameEvent::LevelCleared { index } => log::debug!("level {index} cleared"),
        }
    }
}
