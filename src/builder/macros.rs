//! Macros for ergonomic harvester construction.

/// Declare a closed enum of effect queues and implement
/// [`EffectQueue`](crate::effects::EffectQueue) for it.
///
/// Every variant names its flatten strategy; `default:` picks the lane used
/// by tasks that do not name one.
///
/// # Example
///
/// ```
/// use harvest::effect_queue;
/// use harvest::effects::{EffectQueue, FlattenStrategy};
/// use std::time::Duration;
///
/// effect_queue! {
///     pub enum Queue {
///         Background => FlattenStrategy::merge(),
///         Request => FlattenStrategy::latest(),
///         Search => FlattenStrategy::debounce(Duration::from_millis(300)),
///     }
///     default: Background
/// }
///
/// assert_eq!(Queue::all_queues().len(), 3);
/// assert_eq!(Queue::default_queue(), Queue::Background);
/// assert_eq!(Queue::Request.flatten_strategy(), FlattenStrategy::latest());
/// ```
#[macro_export]
macro_rules! effect_queue {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $strategy:expr
            ),* $(,)?
        }

        default: $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::effects::EffectQueue for $name {
            fn flatten_strategy(&self) -> $crate::effects::FlattenStrategy {
                match self {
                    $(Self::$variant => $strategy),*
                }
            }

            fn default_queue() -> Self {
                Self::$default
            }

            fn all_queues() -> ::std::vec::Vec<Self> {
                ::std::vec![$(Self::$variant),*]
            }
        }
    };
}
