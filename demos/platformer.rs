//! A tiny scripted platformer driven frame by frame.
//!
//! Run with `RUST_LOG=statecraft=debug cargo run --example platformer` to see
//! every transition the engine performs.

use statecraft::core::{Clock, ManualClock, TransitionEvent};
use statecraft::input::{resolve_source, ButtonLayout, InputSource, LogicalButton, PlayerIndex};
use statecraft::machine::{CooperativeLauncher, Subject};
use statecraft::{ButtonEvent, Driver, InputError};
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(16);

const LAYOUT: &str = r#"{
    "bindings": [
        { "player": 0, "button": "A",    "source": 1 },
        { "player": 0, "button": "Menu", "source": 2 }
    ]
}"#;

#[derive(Clone, Debug)]
struct Actor {
    id: u32,
    name: &'static str,
    health: Arc<AtomicU32>,
    destroyed: Arc<AtomicBool>,
}

impl Actor {
    fn new(id: u32, name: &'static str, health: u32) -> Self {
        Self {
            id,
            name,
            health: Arc::new(AtomicU32::new(health)),
            destroyed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn hit(&self) -> u32 {
        let left = self.health.load(Ordering::SeqCst).saturating_sub(1);
        self.health.store(left, Ordering::SeqCst);
        left
    }
}

impl Subject for Actor {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let clock = ManualClock::new();
    let launcher = CooperativeLauncher::new();
    let mut driver = Driver::<Actor>::builder()
        .clock(clock.clone())
        .launcher(launcher.clone())
        .build()?;

    let controllers = ButtonLayout::from_json(LAYOUT)?.build()?;
    let jump = resolve_source(&controllers, 0, "a")?;
    let menu = resolve_source(&controllers, 0, "menu")?;

    let hero = Actor::new(1, "hero", 3);
    let slime = Actor::new(2, "slime", 2);

    driver.on_global_event(TransitionEvent::Enter, "loading", |_| println!("loading level"));
    driver.on_global_async_update("loading", || async {
        // Stand-in for streaming assets off disk.
    });
    driver.on_global_event(TransitionEvent::Update, "loading", |control| {
        if control.time_in_state().is_some_and(|t| t >= Duration::from_millis(100)) {
            control.change_state("playing");
        }
    });
    driver.on_global_button_event(menu, ButtonEvent::Pressed, "playing", None, |control| {
        control.change_state("paused")
    });
    driver.on_global_button_event(menu, ButtonEvent::Pressed, "paused", None, |control| {
        control.change_state("playing")
    });
    driver.on_global_state_change(|from, to| {
        println!("game: {} -> {to}", from.map_or("<unset>", |s| s.as_str()))
    });

    driver.on_subject_button_event(
        &hero,
        jump,
        ButtonEvent::Pressed,
        "idle",
        None,
        |_, control| control.change_state("jump"),
    );
    driver.on_subject_event(&hero, TransitionEvent::Enter, "jump", |_, control| {
        control.change_state_in("fall", Duration::from_millis(250))
    });
    driver.on_subject_event(&hero, TransitionEvent::Enter, "fall", |_, control| {
        control.change_state_in("idle", Duration::from_millis(250))
    });
    driver.on_subject_background_event(&hero, TransitionEvent::Enter, "fall", 10, |hero, _| {
        println!("{} starts falling", hero.name)
    });
    driver.on_subject_state_change(&hero, |from, to| {
        println!("hero: {} -> {to}", from.map_or("<unset>", |s| s.as_str()))
    });

    driver.on_subject_event(&slime, TransitionEvent::Exit, "patrol", |slime, control| {
        if slime.hit() == 0 {
            control.change_state("dead");
        }
    });
    driver.on_subject_event(&slime, TransitionEvent::Enter, "hurt", |_, control| {
        control.change_state_in("patrol", Duration::from_millis(200))
    });
    driver.on_subject_event(&slime, TransitionEvent::Enter, "dead", |slime, control| {
        println!("{} is defeated", slime.name);
        slime.destroyed.store(true, Ordering::SeqCst);
        control.change_global_state("victory", None);
    });

    driver.change_global_state("loading", None);
    driver.change_subject_state(&hero, "idle", None);
    driver.change_subject_state(&slime, "patrol", None);

    let a = controllers
        .button(PlayerIndex::new(0)?, LogicalButton::A)
        .ok_or(InputError::Unbound {
            player: 0,
            button: LogicalButton::A,
        })?;
    let pause = controllers
        .by_source(menu.id())
        .ok_or(InputError::Unbound {
            player: 0,
            button: LogicalButton::Menu,
        })?;

    for frame in 0..120u32 {
        match frame {
            10 | 50 => a.press(),
            40 => driver.change_subject_state(&slime, "hurt", None),
            80 => driver.change_subject_state(&slime, "hurt", None),
            90 | 100 => pause.press(),
            _ => {}
        }

        driver.update();
        launcher.poll_tasks();
        clock.advance(FRAME);
    }

    println!(
        "after {:?}: game {:?}, hero {:?}, {} subject(s) tracked",
        clock.now(),
        driver.global_state(),
        driver.subject_state(&hero),
        driver.tracked_count()
    );
    Ok(())
}
