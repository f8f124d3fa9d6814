//! Routing of effects onto queue lanes.

use super::effect::{Effect, Task};
use super::flatten::{run_lane, Scheduled};
use super::queue::EffectQueue;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, trace, warn, Instrument};

/// Owns one worker per queue and the cancellation handles of identified
/// tasks.
///
/// The router lives inside the harvester's driver, so it is only ever used
/// from the serialized loop. Dropping it aborts every lane together with the
/// tasks they are running.
pub(crate) struct Router<I, Q, Id> {
    lanes: Vec<(Q, mpsc::UnboundedSender<Scheduled<I>>)>,
    identified: Vec<(Id, CancellationToken)>,
    sink: mpsc::UnboundedSender<I>,
    shutdown: CancellationToken,
    workers: JoinSet<()>,
}

impl<I, Q, Id> Router<I, Q, Id>
where
    I: Send + 'static,
    Q: EffectQueue,
{
    /// Start a lane for every queue. Must be called within a tokio runtime.
    pub(crate) fn new(sink: mpsc::UnboundedSender<I>, shutdown: CancellationToken) -> Self {
        let mut router = Router {
            lanes: Vec::new(),
            identified: Vec::new(),
            sink,
            shutdown,
            workers: JoinSet::new(),
        };

        for queue in Q::all_queues() {
            router.open_lane(queue);
        }
        let default = Q::default_queue();
        if !router.has_lane(&default) {
            warn!(queue = ?default, "default queue missing from all_queues");
            router.open_lane(default);
        }

        router
    }

    fn has_lane(&self, queue: &Q) -> bool {
        self.lanes.iter().any(|(lane, _)| lane == queue)
    }

    fn open_lane(&mut self, queue: Q) -> &mpsc::UnboundedSender<Scheduled<I>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let strategy = queue.flatten_strategy();
        let span = debug_span!("lane", queue = ?queue);
        self.workers
            .spawn(run_lane(strategy, rx, self.sink.clone()).instrument(span));
        self.lanes.push((queue, tx));
        let (_, tx) = &self.lanes[self.lanes.len() - 1];
        tx
    }

    fn lane(&mut self, queue: Q) -> &mpsc::UnboundedSender<Scheduled<I>> {
        match self.lanes.iter().position(|(lane, _)| *lane == queue) {
            Some(index) => &self.lanes[index].1,
            None => {
                warn!(queue = ?queue, "queue missing from all_queues, opening lane");
                self.open_lane(queue)
            }
        }
    }

    /// Apply an effect's cancel requests, then schedule its tasks.
    ///
    /// Cancel requests only see tasks routed by earlier effects, so an
    /// effect may cancel a task and start its replacement under the same id.
    pub(crate) fn route(&mut self, effect: Effect<I, Q, Id>) {
        let (tasks, cancels) = effect.into_parts();

        for predicate in &cancels {
            for (id, token) in &self.identified {
                if !token.is_cancelled() && predicate(id) {
                    debug!("cancelling task");
                    token.cancel();
                }
            }
        }
        self.identified.retain(|(_, token)| !token.is_cancelled());

        for task in tasks {
            self.schedule(task);
        }
    }

    fn schedule(&mut self, task: Task<I, Q, Id>) {
        let (producer, queue, id) = task.into_parts();
        let token = self.shutdown.child_token();
        if let Some(id) = id {
            self.identified.push((id, token.clone()));
        }

        trace!(queue = ?queue, "scheduling task");
        let scheduled = Scheduled { producer, token };
        if self.lane(queue).send(scheduled).is_err() {
            debug!("lane closed, dropping task");
        }
    }

    /// Number of identified tasks that are neither finished nor cancelled.
    #[cfg(test)]
    pub(crate) fn live_identified(&self) -> usize {
        self.identified
            .iter()
            .filter(|(_, token)| !token.is_cancelled())
            .count()
    }
}
