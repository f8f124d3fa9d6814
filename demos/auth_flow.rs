//! Authentication Flow
//!
//! This example drives a login/logout machine whose requests are simulated
//! with delayed effects.
//!
//! Key concepts:
//! - Transitions built with `TransitionBuilder` and `transition`
//! - Effects on a `latest` queue feeding results back as inputs
//! - One reply per input, including rejected ones
//!
//! Run with: RUST_LOG=harvest=trace cargo run --example auth_flow

use futures::StreamExt;
use harvest::builder::{transition, TransitionBuilder};
use harvest::core::{EffectMapping, Reduce, Reply};
use harvest::effect_queue;
use harvest::effects::{Effect, FlattenStrategy};
use harvest::HarvesterBuilder;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq)]
enum Input {
    Login,
    LoginOk,
    Logout,
    LogoutOk,
}

#[derive(Clone, Debug, PartialEq)]
enum Auth {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    LoggingOut,
}

effect_queue! {
    enum Queue {
        Request => FlattenStrategy::latest(),
    }
    default: Request
}

fn request(reply: Input) -> Effect<Input, Queue, &'static str> {
    Effect::future(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        reply
    })
    .with_id("request")
}

fn mapping() -> Result<EffectMapping<Input, Auth, Queue, &'static str>, harvest::BuildError> {
    Ok(EffectMapping::reduce(
        Reduce::First,
        vec![
            TransitionBuilder::new()
                .on(Input::Login)
                .from(Auth::LoggedOut)
                .to(Auth::LoggingIn)
                .effect(|| request(Input::LoginOk))
                .build()?,
            transition(Input::LoginOk, Auth::LoggingIn, Auth::LoggedIn),
            TransitionBuilder::new()
                .on(Input::Logout)
                .from(Auth::LoggedIn)
                .to(Auth::LoggingOut)
                .effect(|| request(Input::LogoutOk))
                .build()?,
            transition(Input::LogoutOk, Auth::LoggingOut, Auth::LoggedOut),
        ],
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Authentication Flow ===\n");

    let harvester = HarvesterBuilder::<Input, Auth, Queue, &'static str>::new()
        .state(Auth::LoggedOut)
        .mapping(mapping()?)
        .label("auth")
        .build()?;
    let mut replies = harvester.replies();

    // LoginOk is rejected while logged out.
    for input in [Input::LoginOk, Input::Login] {
        harvester.send(input)?;
    }

    let mut logged_out_again = false;
    while let Some(reply) = replies.next().await {
        match &reply {
            Reply::Success { input, from, to } => {
                println!("  {input:?}: {from:?} -> {to:?}");
            }
            Reply::Failure { input, from } => {
                println!("  {input:?}: rejected in {from:?}");
            }
        }

        match reply.to_state() {
            Some(Auth::LoggedIn) => harvester.send(Input::Logout)?,
            Some(Auth::LoggedOut) => logged_out_again = true,
            _ => {}
        }
        if logged_out_again {
            break;
        }
    }

    harvester.close();
    harvester.closed().await;

    println!("\nFinal state: {:?}", harvester.state());
    println!("\n=== Example Complete ===");
    Ok(())
}
