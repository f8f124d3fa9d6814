//! Ticking Timer
//!
//! This example runs a long-lived, identified effect and stops it with a
//! cancel request.
//!
//! Key concepts:
//! - Effects producing many inputs over time
//! - Cancelling a running task by id
//! - External input source driving the harvester until it completes
//!
//! Run with: RUST_LOG=harvest=debug cargo run --example ticking_timer

use futures::{stream, StreamExt};
use harvest::core::{EffectMapping, Reply};
use harvest::effects::{BasicEffectQueue, Effect};
use harvest::runtime::Harvester;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq)]
enum Input {
    Start,
    Tick,
    Stop,
}

#[derive(Clone, Debug, PartialEq)]
enum Timer {
    Idle,
    Running(u32),
}

const TICK: Duration = Duration::from_millis(100);

fn ticks() -> Effect<Input, BasicEffectQueue, &'static str> {
    Effect::stream(stream::unfold((), |()| async {
        tokio::time::sleep(TICK).await;
        Some((Input::Tick, ()))
    }))
    .with_id("timer")
}

fn mapping() -> EffectMapping<Input, Timer, BasicEffectQueue, &'static str> {
    EffectMapping::new(|input, timer, _| match (input, timer) {
        (Input::Start, Timer::Idle) => Some((Timer::Running(0), ticks())),
        (Input::Tick, Timer::Running(n)) => Some((Timer::Running(n + 1), Effect::empty())),
        (Input::Stop, Timer::Running(_)) => Some((Timer::Idle, Effect::cancel("timer"))),
        _ => None,
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Ticking Timer ===\n");

    // Start now, stop after five ticks, then let the source complete.
    let inputs = stream::iter(vec![Input::Start]).chain(stream::once(async {
        tokio::time::sleep(TICK * 5 + TICK / 2).await;
        Input::Stop
    }));

    let harvester = Harvester::with_effects(Timer::Idle, Effect::empty(), inputs, mapping());
    let mut replies = harvester.replies();

    while let Some(reply) = replies.next().await {
        if let Reply::Success { input, to, .. } = reply {
            println!("  {input:?} -> {to:?}");
        }
    }

    println!("\nFinal state: {:?}", harvester.state());
    println!("\n=== Example Complete ===");
}
