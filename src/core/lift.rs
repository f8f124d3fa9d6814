//! Lifting transitions over parts of a larger input or state.
//!
//! A mapping written for a sub-input or a sub-state can be reused inside a
//! bigger machine by describing how to get at the part and how to put it
//! back. The accessor pairs are plain functions.

use super::mapping::EffectMapping;
use std::sync::Arc;

/// Lift a mapping over a part of the input.
///
/// `try_get` extracts the part from a whole input (rejecting inputs that do
/// not contain one) and `embed` wraps the inputs produced by the part's
/// effects back into whole inputs.
pub fn lift_input<WI, PI, S, Q, Id, W, G, E>(
    try_get: G,
    embed: E,
    mapping: EffectMapping<PI, S, Q, Id, W>,
) -> EffectMapping<WI, S, Q, Id, W>
where
    WI: Send + 'static,
    PI: 'static,
    S: 'static,
    Q: 'static,
    Id: 'static,
    W: 'static,
    G: Fn(&WI) -> Option<PI> + Send + Sync + 'static,
    E: Fn(PI) -> WI + Send + Sync + 'static,
{
    let embed = Arc::new(embed);
    EffectMapping::new(move |input, state, world| {
        let part = try_get(input)?;
        let (next, effect) = mapping.run(&part, state, world)?;
        let embed = Arc::clone(&embed);
        Some((next, effect.map_input(move |produced| embed(produced))))
    })
}

/// Lift a mapping over a part of the state.
///
/// `try_get` reads the part (rejecting states that do not contain one) and
/// `set` writes an updated part into the whole state.
pub fn lift_state<I, WS, PS, Q, Id, W, G, P>(
    try_get: G,
    set: P,
    mapping: EffectMapping<I, PS, Q, Id, W>,
) -> EffectMapping<I, WS, Q, Id, W>
where
    I: 'static,
    WS: 'static,
    PS: 'static,
    Q: 'static,
    Id: 'static,
    W: 'static,
    G: Fn(&WS) -> Option<PS> + Send + Sync + 'static,
    P: Fn(&WS, PS) -> WS + Send + Sync + 'static,
{
    EffectMapping::new(move |input, state, world| {
        let part = try_get(state)?;
        let (next, effect) = mapping.run(input, &part, world)?;
        Some((set(state, next), effect))
    })
}
