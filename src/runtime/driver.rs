//! The serialized processing loop behind a harvester.

use super::config::HarvesterConfig;
use super::harvester::Harvester;
use crate::core::{EffectMapping, Reply};
use crate::effects::router::Router;
use crate::effects::{Effect, EffectQueue};
use futures::stream::{BoxStream, StreamExt};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, trace, Instrument};

/// Reply sender shared with the handle for subscribing. The driver empties
/// it on exit so the reply channel closes.
pub(crate) type ReplySlot<I, S> = Arc<Mutex<Option<broadcast::Sender<Reply<I, S>>>>>;

/// Everything a harvester needs to start.
pub(crate) struct Parts<I, S, Q, Id, W> {
    pub(crate) state: S,
    pub(crate) effect: Effect<I, Q, Id>,
    pub(crate) inputs: BoxStream<'static, I>,
    pub(crate) mapping: EffectMapping<I, S, Q, Id, W>,
    pub(crate) world: W,
    pub(crate) config: HarvesterConfig,
}

/// Spawn the driver task and return its handle. Must be called within a
/// tokio runtime.
pub(crate) fn spawn<I, S, Q, Id, W>(parts: Parts<I, S, Q, Id, W>) -> Harvester<I, S>
where
    I: Clone + Debug + Send + 'static,
    S: Clone + Debug + Send + Sync + 'static,
    Q: EffectQueue,
    Id: Send + 'static,
    W: Send + 'static,
{
    let Parts {
        state,
        effect,
        inputs,
        mapping,
        world,
        config,
    } = parts;

    let (send_tx, send_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(state.clone());
    let (reply_tx, _) = broadcast::channel(config.reply_capacity);
    let reply_slot = Arc::new(Mutex::new(Some(reply_tx.clone())));
    let shutdown = CancellationToken::new();
    let finished = CancellationToken::new();

    let driver = Driver {
        state,
        mapping,
        world,
        state_tx,
        reply_tx,
        reply_slot: Arc::clone(&reply_slot),
    };
    let channels = Channels {
        external: inputs,
        sent: send_rx,
    };

    let span = info_span!("harvester", label = %config.label);
    tokio::spawn(
        driver
            .run(effect, channels, shutdown.clone(), finished.clone())
            .instrument(span),
    );

    Harvester::from_parts(send_tx, state_rx, reply_slot, shutdown, finished)
}

struct Channels<I> {
    external: BoxStream<'static, I>,
    sent: mpsc::UnboundedReceiver<I>,
}

struct Driver<I, S, Q, Id, W> {
    state: S,
    mapping: EffectMapping<I, S, Q, Id, W>,
    world: W,
    state_tx: watch::Sender<S>,
    reply_tx: broadcast::Sender<Reply<I, S>>,
    reply_slot: ReplySlot<I, S>,
}

impl<I, S, Q, Id, W> Driver<I, S, Q, Id, W>
where
    I: Clone + Debug + Send + 'static,
    S: Clone + Debug + Send + Sync + 'static,
    Q: EffectQueue,
    Id: Send + 'static,
    W: Send + 'static,
{
    async fn run(
        mut self,
        initial: Effect<I, Q, Id>,
        mut channels: Channels<I>,
        shutdown: CancellationToken,
        finished: CancellationToken,
    ) {
        let (feedback_tx, mut feedback) = mpsc::unbounded_channel();
        let mut router = Router::new(feedback_tx, shutdown.clone());
        info!(state = ?self.state, "harvester started");

        router.route(initial);

        loop {
            let input = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("shutdown requested");
                    break;
                }
                next = channels.external.next() => match next {
                    Some(input) => input,
                    None => {
                        debug!("input source completed");
                        break;
                    }
                },
                Some(input) = channels.sent.recv() => input,
                Some(input) = feedback.recv() => input,
            };

            if shutdown.is_cancelled() {
                break;
            }

            if let Some(effect) = self.step(input) {
                router.route(effect);
            }
        }

        // In-flight tasks end with the loop.
        shutdown.cancel();
        drop(router);
        drop(feedback);
        self.reply_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!(state = ?self.state, "harvester stopped");
        drop(self);
        finished.cancel();
    }

    /// Run the mapping once for `input`, commit and reply.
    ///
    /// Returns the effect of an accepted transition; the state is already
    /// committed when it is routed.
    fn step(&mut self, input: I) -> Option<Effect<I, Q, Id>> {
        match self.mapping.run(&input, &self.state, &self.world) {
            Some((next, effect)) => {
                let from = std::mem::replace(&mut self.state, next.clone());
                self.state_tx.send_replace(next.clone());
                trace!(?input, ?from, to = ?next, "transition accepted");

                let _ = self.reply_tx.send(Reply::Success {
                    input,
                    from,
                    to: next,
                });
                Some(effect)
            }
            None => {
                trace!(?input, from = ?self.state, "transition rejected");

                let _ = self.reply_tx.send(Reply::Failure {
                    input,
                    from: self.state.clone(),
                });
                None
            }
        }
    }
}
