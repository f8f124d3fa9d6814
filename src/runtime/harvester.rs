//! The harvester handle.

use super::config::HarvesterConfig;
use super::driver::{self, Parts, ReplySlot};
use super::error::HarvesterError;
use crate::builder::HarvesterBuilder;
use crate::core::{EffectMapping, Mapping, Reply};
use crate::effects::{BasicEffectQueue, Effect, EffectQueue};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt::Debug;
use std::sync::PoisonError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Deterministic state machine that owns a state, consumes inputs one at a
/// time and runs the effects its transitions produce.
///
/// Inputs come from the external stream given at construction, from
/// [`send`](Harvester::send), and from running effects; all of them are
/// merged into one stream consumed by a single loop, which is the only place
/// the state is read or written. Every consumed input yields exactly one
/// [`Reply`].
///
/// The harvester stops when the external stream completes, when
/// [`close`](Harvester::close) is called, or when the handle is dropped.
/// Stopping cancels every running effect and completes the reply stream.
///
/// # Example
///
/// ```rust
/// use harvest::core::{Mapping, Reply};
/// use harvest::runtime::Harvester;
/// use futures::StreamExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mapping = Mapping::new(|delta: &i32, total: &i32| Some(total + delta));
/// let harvester = Harvester::new(0, futures::stream::pending(), mapping);
/// let mut replies = harvester.replies();
///
/// harvester.send(5).unwrap();
///
/// let reply = replies.next().await.unwrap();
/// assert_eq!(reply, Reply::Success { input: 5, from: 0, to: 5 });
/// assert_eq!(harvester.state(), 5);
/// # }
/// ```
pub struct Harvester<I, S> {
    inputs: mpsc::UnboundedSender<I>,
    state: watch::Receiver<S>,
    replies: ReplySlot<I, S>,
    shutdown: CancellationToken,
    finished: CancellationToken,
}

impl<I, S> Harvester<I, S>
where
    I: Clone + Debug + Send + 'static,
    S: Clone + Debug + Send + Sync + 'static,
{
    /// Start a harvester driven by a plain [`Mapping`].
    ///
    /// Must be called within a tokio runtime.
    pub fn new<St>(state: S, inputs: St, mapping: Mapping<I, S>) -> Self
    where
        St: Stream<Item = I> + Send + 'static,
    {
        Harvester::with_effects(
            state,
            Effect::empty(),
            inputs,
            mapping.into_effect_mapping::<BasicEffectQueue, (), ()>(),
        )
    }

    /// Start a harvester driven by an [`EffectMapping`].
    ///
    /// `effect` is routed once at start-up as if a transition had produced
    /// it, without consuming an input or emitting a reply. Must be called
    /// within a tokio runtime.
    pub fn with_effects<St, Q, Id>(
        state: S,
        effect: Effect<I, Q, Id>,
        inputs: St,
        mapping: EffectMapping<I, S, Q, Id>,
    ) -> Self
    where
        St: Stream<Item = I> + Send + 'static,
        Q: EffectQueue,
        Id: Send + 'static,
    {
        driver::spawn(Parts {
            state,
            effect,
            inputs: inputs.boxed(),
            mapping,
            world: (),
            config: HarvesterConfig::default(),
        })
    }

    /// Builder exposing every start-up option.
    pub fn builder<Q, Id>() -> HarvesterBuilder<I, S, Q, Id>
    where
        Q: EffectQueue,
        Id: Send + 'static,
    {
        HarvesterBuilder::new()
    }

    pub(crate) fn from_parts(
        inputs: mpsc::UnboundedSender<I>,
        state: watch::Receiver<S>,
        replies: ReplySlot<I, S>,
        shutdown: CancellationToken,
        finished: CancellationToken,
    ) -> Self {
        Harvester {
            inputs,
            state,
            replies,
            shutdown,
            finished,
        }
    }

    /// Queue an input behind the ones already pending.
    pub fn send(&self, input: I) -> Result<(), HarvesterError> {
        if self.shutdown.is_cancelled() {
            return Err(HarvesterError::Closed);
        }
        self.inputs.send(input).map_err(|_| HarvesterError::Closed)
    }

    /// The most recently committed state.
    pub fn state(&self) -> S {
        self.state.borrow().clone()
    }

    /// Receiver notified after every committed transition.
    ///
    /// A watch only keeps the newest value, so an observer that is slower
    /// than the loop sees the latest state and skips intermediate ones. Use
    /// [`replies`](Harvester::replies) to observe every commit in order.
    pub fn watch_state(&self) -> watch::Receiver<S> {
        self.state.clone()
    }

    /// Stream of the replies emitted from now on.
    ///
    /// The stream ends once the harvester has stopped and every reply
    /// emitted before that has been yielded. A subscriber that falls more
    /// than the configured capacity behind skips the replies it missed.
    pub fn replies(&self) -> BoxStream<'static, Reply<I, S>> {
        stream::unfold(self.subscribe(), |mut replies| async move {
            loop {
                match replies.recv().await {
                    Ok(reply) => return Some((reply, replies)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "reply subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    /// Raw receiver of the replies emitted from now on.
    ///
    /// After the harvester has stopped the receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<Reply<I, S>> {
        let slot = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Replies buffered for the slowest live subscriber.
    #[cfg(test)]
    fn buffered_replies(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |sender| sender.len())
    }
}

impl<I, S> Harvester<I, S> {
    /// Stop the harvester. Calling it again has no effect.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Whether the harvester has been asked to stop or has stopped.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.finished.is_cancelled()
    }

    /// Wait until the processing loop has stopped and every effect has been
    /// cancelled.
    pub async fn closed(&self) {
        self.finished.cancelled().await;
    }
}

impl<I, S> Drop for Harvester<I, S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<I, S: Debug> Debug for Harvester<I, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("state", &*self.state.borrow())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
