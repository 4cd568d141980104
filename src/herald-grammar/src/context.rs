//! Per-dispatch value bag.

use std::any::Any;
use std::collections::HashMap;

/// A parsed value, type-erased for storage in a [`Context`].
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// Append-only keyed value bag scoped to one parse attempt.
///
/// Values accumulate per key: collection-typed parameters commit several
/// values under one id, single-valued parameters commit exactly one. A
/// context is exclusively owned by a single dispatch attempt — discarded on
/// failure, handed to the invoker on success — and must never be shared
/// across concurrent calls.
#[derive(Default)]
pub struct Context {
    values: HashMap<String, Vec<BoxedValue>>,
    suggesting: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field(
                "values",
                &self
                    .values
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .field("suggesting", &self.suggesting)
            .finish()
    }
}

impl Context {
    /// An empty context for a normal parse attempt.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context carrying the suggestion-mode marker. Elements loosen their
    /// matching so in-progress input still reaches completion.
    pub fn suggesting() -> Self {
        Self {
            suggesting: true,
            ..Self::default()
        }
    }

    /// Whether the suggestion-mode marker is set.
    pub fn is_suggesting(&self) -> bool {
        self.suggesting
    }

    /// Append a typed value under the given id.
    pub fn insert<T: Any + Send + Sync>(&mut self, id: &str, value: T) {
        self.push(id, Box::new(value));
    }

    /// Append an already-boxed value under the given id.
    pub fn push(&mut self, id: &str, value: BoxedValue) {
        self.values.entry(id.to_string()).or_default().push(value);
    }

    /// Whether at least one value was committed under the given id.
    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// Number of values committed under the given id.
    pub fn count(&self, id: &str) -> usize {
        self.values.get(id).map_or(0, Vec::len)
    }

    /// The first value committed under the given id, downcast to `T`.
    pub fn one<T: Any>(&self, id: &str) -> Option<&T> {
        self.values.get(id)?.first()?.downcast_ref::<T>()
    }

    /// Every value committed under the given id that downcasts to `T`.
    pub fn all<T: Any>(&self, id: &str) -> Vec<&T> {
        self.values
            .get(id)
            .map(|values| values.iter().filter_map(|v| v.downcast_ref::<T>()).collect())
            .unwrap_or_default()
    }
}
