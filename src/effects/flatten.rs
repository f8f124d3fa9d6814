//! Lane workers implementing each flatten strategy.
//!
//! Every queue gets one worker. The worker receives scheduled tasks in
//! routing order and drives their streams according to the queue's
//! strategy, forwarding produced inputs to the harvester's feedback channel.

use super::effect::Producer;
use super::queue::{FlattenStrategy, Kind};
use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// A task handed to a lane, paired with the token that cancels it.
pub(crate) struct Scheduled<I> {
    pub(crate) producer: Producer<I>,
    pub(crate) token: CancellationToken,
}

impl<I> Scheduled<I> {
    /// Drop a task that will never run.
    fn discard(self, reason: &'static str) {
        debug!(reason, "discarding task");
        self.token.cancel();
    }
}

type Arrivals<I> = mpsc::UnboundedReceiver<Scheduled<I>>;
type Sink<I> = mpsc::UnboundedSender<I>;

pub(crate) async fn run_lane<I: Send + 'static>(
    strategy: FlattenStrategy,
    arrivals: Arrivals<I>,
    sink: Sink<I>,
) {
    match strategy.kind {
        Kind::Concurrent { limit } => concurrent(limit, arrivals, sink).await,
        Kind::Latest => latest(arrivals, sink).await,
        Kind::Throttle {
            interval,
            prefer_latest,
        } => throttle(interval, prefer_latest, arrivals, sink).await,
        Kind::Debounce { interval } => debounce(interval, arrivals, sink).await,
    }
    trace!("lane closed");
}

/// Forward a task's inputs until it finishes or its token is cancelled.
///
/// The token is checked before every item, so nothing is forwarded once
/// cancellation has been observed. The token is cancelled on exit so the
/// router can forget the task.
fn drive<I: Send + 'static>(task: Scheduled<I>, sink: Sink<I>) -> BoxFuture<'static, ()> {
    async move {
        let Scheduled { producer, token } = task;
        if token.is_cancelled() {
            return;
        }

        let mut outputs = producer();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!("task cancelled");
                    break;
                }
                next = outputs.next() => match next {
                    Some(input) => {
                        if sink.send(input).is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        token.cancel();
    }
    .boxed()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending::<()>().await,
    }
}

/// `merge`, `concat` and bounded concurrency: FIFO admission up to `limit`.
async fn concurrent<I: Send + 'static>(
    limit: Option<usize>,
    mut arrivals: Arrivals<I>,
    sink: Sink<I>,
) {
    let mut pending = VecDeque::new();
    let mut running = FuturesUnordered::new();
    let mut open = true;

    loop {
        while limit.map_or(true, |max| running.len() < max) {
            match pending.pop_front() {
                Some(task) => running.push(drive(task, sink.clone())),
                None => break,
            }
        }

        if !open && running.is_empty() {
            break;
        }

        tokio::select! {
            arrival = arrivals.recv(), if open => match arrival {
                Some(task) => pending.push_back(task),
                None => open = false,
            },
            Some(()) = running.next(), if !running.is_empty() => {}
            else => break,
        }
    }
}

/// `latest`: a new arrival cancels whatever is running.
async fn latest<I: Send + 'static>(mut arrivals: Arrivals<I>, sink: Sink<I>) {
    let mut running = FuturesUnordered::new();
    let mut active: Option<CancellationToken> = None;
    let mut open = true;

    loop {
        if !open && running.is_empty() {
            break;
        }

        tokio::select! {
            arrival = arrivals.recv(), if open => match arrival {
                Some(task) => {
                    if let Some(previous) = active.replace(task.token.clone()) {
                        if !previous.is_cancelled() {
                            debug!("switching to latest task");
                            previous.cancel();
                        }
                    }
                    running.push(drive(task, sink.clone()));
                }
                None => open = false,
            },
            Some(()) = running.next(), if !running.is_empty() => {}
            else => break,
        }
    }
}

/// `throttle`: at most one task per window, the rest are dropped.
async fn throttle<I: Send + 'static>(
    interval: Duration,
    prefer_latest: bool,
    mut arrivals: Arrivals<I>,
    sink: Sink<I>,
) {
    let mut running = FuturesUnordered::new();
    let mut window: Option<Instant> = None;
    let mut held: Option<Scheduled<I>> = None;
    let mut open = true;

    loop {
        if !open && window.is_none() && running.is_empty() {
            break;
        }

        tokio::select! {
            arrival = arrivals.recv(), if open => match arrival {
                Some(task) => match window {
                    None => {
                        window = Some(Instant::now() + interval);
                        if prefer_latest {
                            held = Some(task);
                        } else {
                            running.push(drive(task, sink.clone()));
                        }
                    }
                    Some(_) if prefer_latest => {
                        if let Some(previous) = held.replace(task) {
                            previous.discard("superseded within throttle window");
                        }
                    }
                    Some(_) => task.discard("throttled"),
                },
                None => open = false,
            },
            _ = sleep_until(window), if window.is_some() => {
                window = None;
                if let Some(task) = held.take() {
                    running.push(drive(task, sink.clone()));
                }
            }
            Some(()) = running.next(), if !running.is_empty() => {}
            else => break,
        }
    }
}

/// `debounce`: run the last task once arrivals have been quiet for `interval`.
async fn debounce<I: Send + 'static>(interval: Duration, mut arrivals: Arrivals<I>, sink: Sink<I>) {
    let mut running = FuturesUnordered::new();
    let mut deadline: Option<Instant> = None;
    let mut held: Option<Scheduled<I>> = None;
    let mut open = true;

    loop {
        if !open && held.is_none() && running.is_empty() {
            break;
        }

        tokio::select! {
            arrival = arrivals.recv(), if open => match arrival {
                Some(task) => {
                    deadline = Some(Instant::now() + interval);
                    if let Some(previous) = held.replace(task) {
                        previous.discard("debounced");
                    }
                }
                None => open = false,
            },
            _ = sleep_until(deadline), if deadline.is_some() => {
                deadline = None;
                if let Some(task) = held.take() {
                    running.push(drive(task, sink.clone()));
                }
            }
            Some(()) = running.next(), if !running.is_empty() => {}
            else => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn scheduled<I, F, St>(producer: F) -> (Scheduled<I>, CancellationToken)
    where
        I: Send + 'static,
        F: FnOnce() -> St + Send + 'static,
        St: futures::Stream<Item = I> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = Scheduled {
            producer: Box::new(move || producer().boxed()),
            token: token.clone(),
        };
        (task, token)
    }

    fn delayed(value: u32, after: Duration) -> (Scheduled<u32>, CancellationToken) {
        scheduled(move || {
            stream::once(async move {
                time::sleep(after).await;
                value
            })
        })
    }

    async fn collect(mut outputs: mpsc::UnboundedReceiver<u32>) -> Vec<u32> {
        let mut values = Vec::new();
        while let Some(value) = outputs.recv().await {
            values.push(value);
        }
        values
    }

    #[tokio::test(start_paused = true)]
    async fn merge_forwards_in_completion_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();

        tx.send(delayed(1, Duration::from_secs(3)).0).unwrap();
        tx.send(delayed(2, Duration::from_secs(1)).0).unwrap();
        drop(tx);

        run_lane(FlattenStrategy::merge(), rx, sink).await;

        assert_eq!(collect(outputs).await, vec![2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn concat_runs_one_task_at_a_time() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();
        let started = Instant::now();

        tx.send(delayed(1, Duration::from_secs(3)).0).unwrap();
        tx.send(delayed(2, Duration::from_secs(1)).0).unwrap();
        drop(tx);

        run_lane(FlattenStrategy::concat(), rx, sink).await;

        assert_eq!(collect(outputs).await, vec![1, 2]);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_limits_running_tasks() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, mut outputs) = mpsc::unbounded_channel();
        let started = Instant::now();

        tx.send(delayed(1, Duration::from_secs(4)).0).unwrap();
        tx.send(delayed(2, Duration::from_secs(1)).0).unwrap();
        tx.send(delayed(3, Duration::from_secs(2)).0).unwrap();
        drop(tx);
        let lane = tokio::spawn(run_lane(FlattenStrategy::concurrent(2), rx, sink));

        // The third task only starts once the second has finished.
        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(outputs.try_recv().ok(), Some(2));
        assert!(outputs.try_recv().is_err());

        lane.await.unwrap();
        assert_eq!(collect(outputs).await, vec![3, 1]);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn latest_cancels_running_task() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();
        let (first, first_token) = delayed(1, Duration::from_secs(3));

        tx.send(first).unwrap();
        tx.send(delayed(2, Duration::from_secs(1)).0).unwrap();
        drop(tx);

        run_lane(FlattenStrategy::latest(), rx, sink).await;

        assert_eq!(collect(outputs).await, vec![2]);
        assert!(first_token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_is_truncated() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, mut outputs) = mpsc::unbounded_channel();
        let (ticker, token) = scheduled(|| {
            stream::unfold(0u32, |n| async move {
                time::sleep(Duration::from_secs(1)).await;
                Some((n, n + 1))
            })
        });

        tx.send(ticker).unwrap();
        let lane = tokio::spawn(run_lane(FlattenStrategy::merge(), rx, sink));

        assert_eq!(outputs.recv().await, Some(0));
        assert_eq!(outputs.recv().await, Some(1));
        token.cancel();
        drop(tx);
        lane.await.unwrap();

        assert_eq!(outputs.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_task_cancelled_before_start_never_runs() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();
        let (second, second_token) = delayed(2, Duration::from_secs(1));

        tx.send(delayed(1, Duration::from_secs(1)).0).unwrap();
        tx.send(second).unwrap();
        second_token.cancel();
        drop(tx);

        run_lane(FlattenStrategy::concat(), rx, sink).await;

        assert_eq!(collect(outputs).await, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_keeps_first_arrival_of_window() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();
        let (dropped, dropped_token) = delayed(2, Duration::ZERO);

        tx.send(delayed(1, Duration::ZERO).0).unwrap();
        tx.send(dropped).unwrap();
        drop(tx);

        run_lane(
            FlattenStrategy::throttle(Duration::from_secs(1), false),
            rx,
            sink,
        )
        .await;

        assert_eq!(collect(outputs).await, vec![1]);
        assert!(dropped_token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_prefers_latest_arrival_of_window() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();
        let started = Instant::now();

        tx.send(delayed(1, Duration::ZERO).0).unwrap();
        tx.send(delayed(2, Duration::ZERO).0).unwrap();
        tx.send(delayed(3, Duration::ZERO).0).unwrap();
        drop(tx);

        run_lane(
            FlattenStrategy::throttle(Duration::from_secs(1), true),
            rx,
            sink,
        )
        .await;

        assert_eq!(collect(outputs).await, vec![3]);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_latest_holds_lone_task_for_window() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();
        let started = Instant::now();

        tx.send(delayed(1, Duration::ZERO).0).unwrap();
        drop(tx);

        run_lane(
            FlattenStrategy::throttle(Duration::from_secs(2), true),
            rx,
            sink,
        )
        .await;

        assert_eq!(collect(outputs).await, vec![1]);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_runs_only_settled_task() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, outputs) = mpsc::unbounded_channel();
        let lane = tokio::spawn(run_lane(
            FlattenStrategy::debounce(Duration::from_secs(1)),
            rx,
            sink,
        ));

        tx.send(delayed(1, Duration::ZERO).0).unwrap();
        time::sleep(Duration::from_millis(500)).await;
        tx.send(delayed(2, Duration::ZERO).0).unwrap();
        time::sleep(Duration::from_millis(500)).await;
        tx.send(delayed(3, Duration::ZERO).0).unwrap();
        time::sleep(Duration::from_secs(2)).await;
        tx.send(delayed(4, Duration::ZERO).0).unwrap();
        drop(tx);
        lane.await.unwrap();

        assert_eq!(collect(outputs).await, vec![3, 4]);
    }
}
