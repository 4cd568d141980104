//! The invoking actor boundary.

use std::any::Any;
use std::sync::Arc;

/// The entity a command runs on behalf of.
///
/// The engine only ever consults the permission check and, for
/// source-kind parameters, the concrete type behind [`Actor::as_any`]; it
/// never inspects actor internals beyond that.
pub trait Actor: Send + Sync + 'static {
    /// Display name used in messages and logs.
    fn name(&self) -> &str;

    /// Whether this actor holds the given permission node.
    fn has_permission(&self, node: &str) -> bool;

    /// Concrete-type access for source parameter checks and handler
    /// downcasts.
    fn as_any(&self) -> &dyn Any;
}

/// Shared actor handle passed through dispatch.
pub type ActorRef = Arc<dyn Actor>;

/// An actor that holds every permission. Consoles and tests use it.
#[derive(Debug, Clone)]
pub struct SystemActor {
    name: String,
}

impl SystemActor {
    /// A system actor with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for SystemActor {
    fn default() -> Self {
        Self::new("system")
    }
}

impl Actor for SystemActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, _node: &str) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
