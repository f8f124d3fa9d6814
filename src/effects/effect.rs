//! Effect and task descriptions.
//!
//! An [`Effect`] is a plain value: it describes work to schedule and
//! cancellations to request, but does nothing until a harvester routes it.

use super::queue::EffectQueue;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use stillwater::{Monoid, Semigroup};

/// Cold producer of a task's input stream, invoked when its lane starts it.
pub type Producer<I> = Box<dyn FnOnce() -> BoxStream<'static, I> + Send>;

/// Predicate selecting the task identifiers a cancel request applies to.
pub type CancelPredicate<Id> = Arc<dyn Fn(&Id) -> bool + Send + Sync>;

/// One unit of asynchronous work, addressed to a queue.
///
/// The producer may yield any number of inputs; each one is fed back into
/// the harvester as a separate input. A task with an `id` can later be
/// cancelled by [`Effect::cancel`]; a task without one runs until it
/// finishes or the harvester shuts down.
pub struct Task<I, Q, Id> {
    producer: Producer<I>,
    queue: Q,
    id: Option<Id>,
}

impl<I, Q, Id> Task<I, Q, Id>
where
    I: Send + 'static,
    Q: EffectQueue,
{
    /// Task on the default queue whose stream is created by `producer`.
    ///
    /// The producer is not called until the task is started, so work that
    /// waits in a `concat` lane does not begin early.
    pub fn new<F, St>(producer: F) -> Self
    where
        F: FnOnce() -> St + Send + 'static,
        St: Stream<Item = I> + Send + 'static,
    {
        Task {
            producer: Box::new(move || producer().boxed()),
            queue: Q::default_queue(),
            id: None,
        }
    }

    /// Task forwarding every item of `stream`.
    pub fn stream<St>(stream: St) -> Self
    where
        St: Stream<Item = I> + Send + 'static,
    {
        Task::new(move || stream)
    }

    /// Task producing exactly one input once `future` resolves.
    pub fn future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = I> + Send + 'static,
    {
        Task::new(move || stream::once(future))
    }

    /// Task running a Stillwater effect against `world`.
    ///
    /// Tasks have no error channel, so a failed effect is turned into an
    /// input by `recover`.
    pub fn from_effect<E, W, R>(effect: E, world: W, recover: R) -> Self
    where
        E: stillwater::effect::Effect<Output = I, Env = W> + 'static,
        E::Error: Send + 'static,
        W: Clone + Send + Sync + 'static,
        R: FnOnce(E::Error) -> I + Send + 'static,
    {
        Task::future(async move {
            match effect.run(&world).await {
                Ok(input) => input,
                Err(error) => recover(error),
            }
        })
    }
}

impl<I, Q, Id> Task<I, Q, Id> {
    /// Address the task to `queue`.
    pub fn on(mut self, queue: Q) -> Self {
        self.queue = queue;
        self
    }

    /// Tag the task so it can be cancelled.
    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Producer<I>, Q, Option<Id>) {
        (self.producer, self.queue, self.id)
    }
}

impl<I, Q: fmt::Debug, Id: fmt::Debug> fmt::Debug for Task<I, Q, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("queue", &self.queue)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Scheduled tasks plus cancel requests, produced by a transition.
///
/// Effects form a monoid: [`combine`](Effect::combine) concatenates tasks
/// and cancel requests in order, and [`empty`](Effect::empty) is the
/// identity, which schedules nothing.
///
/// # Example
///
/// ```rust
/// use harvest::effects::{BasicEffectQueue, Effect};
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Input {
///     Fetched(u32),
/// }
///
/// let fetch: Effect<Input, BasicEffectQueue, &str> =
///     Effect::future(async { Input::Fetched(42) }).with_id("fetch");
///
/// let effect = Effect::cancel("fetch").combine(fetch);
///
/// assert_eq!(effect.task_count(), 1);
/// assert!(effect.cancels(&"fetch"));
/// ```
pub struct Effect<I, Q, Id> {
    tasks: Vec<Task<I, Q, Id>>,
    cancels: Vec<CancelPredicate<Id>>,
}

impl<I, Q, Id> Effect<I, Q, Id> {
    /// Effect that does nothing.
    pub fn empty() -> Self {
        Effect {
            tasks: Vec::new(),
            cancels: Vec::new(),
        }
    }

    /// Effect scheduling a single task.
    pub fn task(task: Task<I, Q, Id>) -> Self {
        Effect {
            tasks: vec![task],
            cancels: Vec::new(),
        }
    }

    /// Cancel every running task whose id satisfies `predicate`.
    pub fn cancel_where<F>(predicate: F) -> Self
    where
        F: Fn(&Id) -> bool + Send + Sync + 'static,
    {
        Effect {
            tasks: Vec::new(),
            cancels: vec![Arc::new(predicate)],
        }
    }

    /// Cancel the running tasks tagged with `id`.
    pub fn cancel(id: Id) -> Self
    where
        Id: PartialEq + Send + Sync + 'static,
    {
        Effect::cancel_where(move |candidate| *candidate == id)
    }

    /// Concatenate two effects, keeping the order of both.
    pub fn combine(self, other: Self) -> Self {
        self.append(other)
    }

    fn append(mut self, other: Self) -> Self {
        self.tasks.extend(other.tasks);
        self.cancels.extend(other.cancels);
        self
    }

    /// Tag every task of this effect with `id`.
    pub fn with_id(mut self, id: Id) -> Self
    where
        Id: Clone,
    {
        for task in &mut self.tasks {
            task.id = Some(id.clone());
        }
        self
    }

    /// Address every task of this effect to `queue`.
    pub fn on(mut self, queue: Q) -> Self
    where
        Q: Clone,
    {
        for task in &mut self.tasks {
            task.queue = queue.clone();
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.cancels.is_empty()
    }

    pub fn tasks(&self) -> &[Task<I, Q, Id>] {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.len()
    }

    /// Whether any cancel request of this effect selects `id`.
    pub fn cancels(&self, id: &Id) -> bool {
        self.cancels.iter().any(|predicate| predicate(id))
    }

    pub(crate) fn into_parts(self) -> (Vec<Task<I, Q, Id>>, Vec<CancelPredicate<Id>>) {
        (self.tasks, self.cancels)
    }

    /// Transform every input the tasks produce.
    pub fn map_input<I2, F>(self, f: F) -> Effect<I2, Q, Id>
    where
        I: 'static,
        I2: Send + 'static,
        F: Fn(I) -> I2 + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let tasks = self
            .tasks
            .into_iter()
            .map(|task| {
                let f = Arc::clone(&f);
                let producer = task.producer;
                Task {
                    producer: Box::new(move || producer().map(move |input| f(input)).boxed()),
                    queue: task.queue,
                    id: task.id,
                }
            })
            .collect();

        Effect {
            tasks,
            cancels: self.cancels,
        }
    }

    /// Move every task to the queue chosen by `f`.
    pub fn map_queue<Q2, F>(self, mut f: F) -> Effect<I, Q2, Id>
    where
        F: FnMut(Q) -> Q2,
    {
        let tasks = self
            .tasks
            .into_iter()
            .map(|task| Task {
                producer: task.producer,
                queue: f(task.queue),
                id: task.id,
            })
            .collect();

        Effect {
            tasks,
            cancels: self.cancels,
        }
    }

    /// Change the identifier type.
    ///
    /// Task ids are converted with `forward`. Cancel requests are evaluated
    /// by converting the new id back with `backward`; an id that does not
    /// convert back is never selected.
    pub fn map_id<Id2, F, B>(self, mut forward: F, backward: B) -> Effect<I, Q, Id2>
    where
        Id: 'static,
        F: FnMut(Id) -> Id2,
        B: Fn(&Id2) -> Option<Id> + Send + Sync + 'static,
    {
        let tasks = self
            .tasks
            .into_iter()
            .map(|task| Task {
                producer: task.producer,
                queue: task.queue,
                id: task.id.map(&mut forward),
            })
            .collect();

        let backward = Arc::new(backward);
        let cancels = self
            .cancels
            .into_iter()
            .map(|predicate| {
                let backward = Arc::clone(&backward);
                Arc::new(move |id: &Id2| backward(id).is_some_and(|id| predicate(&id)))
                    as CancelPredicate<Id2>
            })
            .collect();

        Effect { tasks, cancels }
    }
}

impl<I, Q, Id> Effect<I, Q, Id>
where
    I: Send + 'static,
    Q: EffectQueue,
{
    /// Effect producing one input on the default queue.
    pub fn future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = I> + Send + 'static,
    {
        Effect::task(Task::future(future))
    }

    /// Effect forwarding a stream of inputs on the default queue.
    pub fn stream<St>(stream: St) -> Self
    where
        St: Stream<Item = I> + Send + 'static,
    {
        Effect::task(Task::stream(stream))
    }
}

impl<I, Q, Id> Semigroup for Effect<I, Q, Id> {
    fn combine(self, other: Self) -> Self {
        self.append(other)
    }
}

impl<I, Q, Id> Monoid for Effect<I, Q, Id> {
    fn empty() -> Self {
        Effect {
            tasks: Vec::new(),
            cancels: Vec::new(),
        }
    }
}

impl<I, Q, Id> Default for Effect<I, Q, Id> {
    fn default() -> Self {
        Effect::empty()
    }
}

impl<I, Q, Id> From<Task<I, Q, Id>> for Effect<I, Q, Id> {
    fn from(task: Task<I, Q, Id>) -> Self {
        Effect::task(task)
    }
}

impl<I, Q, Id> FromIterator<Effect<I, Q, Id>> for Effect<I, Q, Id> {
    fn from_iter<T: IntoIterator<Item = Effect<I, Q, Id>>>(iter: T) -> Self {
        iter.into_iter().fold(Effect::empty(), Effect::append)
    }
}

impl<I, Q: fmt::Debug, Id: fmt::Debug> fmt::Debug for Effect<I, Q, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("tasks", &self.tasks)
            .field("cancels", &self.cancels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_queue;
    use crate::effects::FlattenStrategy;
    use std::convert::Infallible;
    use stillwater::prelude::{fail, from_fn};

    effect_queue! {
        enum Lane {
            Default => FlattenStrategy::merge(),
            Request => FlattenStrategy::latest(),
        }
        default: Default
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Input {
        Loaded(u32),
        Wrapped(Box<Input>),
    }

    type TestEffect = Effect<Input, Lane, &'static str>;

    fn ids(effect: &TestEffect) -> Vec<Option<&'static str>> {
        effect.tasks().iter().map(|t| t.id().copied()).collect()
    }

    #[test]
    fn empty_effect_is_empty() {
        let effect = TestEffect::empty();

        assert!(effect.is_empty());
        assert_eq!(effect.task_count(), 0);
        assert_eq!(effect.cancel_count(), 0);
    }

    #[test]
    fn combine_keeps_order() {
        let a = TestEffect::future(async { Input::Loaded(1) }).with_id("a");
        let b = TestEffect::future(async { Input::Loaded(2) }).with_id("b");
        let c = TestEffect::cancel("a");

        let combined = a.combine(c).combine(b);

        assert_eq!(ids(&combined), vec![Some("a"), Some("b")]);
        assert_eq!(combined.cancel_count(), 1);
        assert!(combined.cancels(&"a"));
        assert!(!combined.cancels(&"b"));
    }

    #[test]
    fn from_iterator_sums_effects() {
        let effect: TestEffect = vec![
            TestEffect::future(async { Input::Loaded(1) }),
            TestEffect::cancel_where(|id: &&str| id.starts_with("timer")),
        ]
        .into_iter()
        .collect();

        assert_eq!(effect.task_count(), 1);
        assert!(effect.cancels(&"timer-1"));
    }

    #[test]
    fn task_defaults_to_default_queue() {
        let task: Task<Input, Lane, &str> = Task::future(async { Input::Loaded(1) });

        assert_eq!(task.queue(), &Lane::Default);
        assert_eq!(task.id(), None);

        let task = task.on(Lane::Request).with_id("req");
        assert_eq!(task.queue(), &Lane::Request);
        assert_eq!(task.id(), Some(&"req"));
    }

    #[test]
    fn map_queue_moves_tasks() {
        let effect = TestEffect::future(async { Input::Loaded(1) }).map_queue(|_| Lane::Request);

        assert_eq!(effect.tasks()[0].queue(), &Lane::Request);
    }

    #[test]
    fn map_id_translates_cancel_requests() {
        let effect = TestEffect::future(async { Input::Loaded(1) })
            .with_id("timer")
            .combine(TestEffect::cancel("timer"));

        let lifted: Effect<Input, Lane, String> = effect.map_id(
            |id| format!("child/{id}"),
            |id: &String| match id.strip_prefix("child/") {
                Some("timer") => Some("timer"),
                Some(_) => Some("other"),
                None => None,
            },
        );

        assert_eq!(lifted.tasks()[0].id(), Some(&"child/timer".to_string()));
        assert!(lifted.cancels(&"child/timer".to_string()));
        assert!(!lifted.cancels(&"timer".to_string()));
    }

    #[tokio::test]
    async fn map_input_transforms_produced_values() {
        let effect = TestEffect::stream(futures::stream::iter(vec![
            Input::Loaded(1),
            Input::Loaded(2),
        ]))
        .map_input(|input| Input::Wrapped(Box::new(input)));

        let (mut tasks, _) = effect.into_parts();
        let (producer, _, _) = tasks.remove(0).into_parts();
        let values: Vec<Input> = producer().collect().await;

        assert_eq!(
            values,
            vec![
                Input::Wrapped(Box::new(Input::Loaded(1))),
                Input::Wrapped(Box::new(Input::Loaded(2))),
            ]
        );
    }

    #[tokio::test]
    async fn from_effect_runs_against_world() {
        #[derive(Clone)]
        struct World {
            answer: u32,
        }

        let effect = from_fn(|world: &World| Ok::<_, Infallible>(Input::Loaded(world.answer)));
        let task: Task<Input, Lane, &str> =
            Task::from_effect(effect, World { answer: 7 }, |never| match never {});

        let (producer, _, _) = task.into_parts();
        let values: Vec<Input> = producer().collect().await;

        assert_eq!(values, vec![Input::Loaded(7)]);
    }

    #[tokio::test]
    async fn from_effect_recovers_failures_as_input() {
        let effect = fail::<Input, String, ()>("offline".to_string());
        let task: Task<Input, Lane, &str> = Task::from_effect(effect, (), |error| {
            Input::Wrapped(Box::new(Input::Loaded(error.len() as u32)))
        });

        let (producer, _, _) = task.into_parts();
        let values: Vec<Input> = producer().collect().await;

        assert_eq!(values, vec![Input::Wrapped(Box::new(Input::Loaded(7)))]);
    }
}
