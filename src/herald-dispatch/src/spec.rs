//! Handler descriptors supplied by the discovery layer.
//!
//! The discovery mechanism — attribute scanning, config files, manual
//! registration — is outside this crate. Whatever it is, it hands the
//! engine one [`HandlerSpec`] per handler: the grammar string, the ordered
//! formal parameters, declared flags, metadata overrides and the bound
//! closure.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use herald_grammar::{ParamKind, TypeHandle};

use crate::actor::Actor;
use crate::executor::{Handler, Invocation};

/// Metadata overrides for one handler.
///
/// Every field is optional; unset fields fall back to values synthesized
/// from the grammar. Serde-friendly so discovery layers can read it from
/// configuration files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerMeta {
    /// Usage line override.
    #[serde(default)]
    pub usage: Option<String>,

    /// Permission node required to run the handler; unset means
    /// unrestricted.
    #[serde(default)]
    pub permission: Option<String>,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// One formal parameter declaration, in handler order.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub(crate) ty: TypeHandle,
    pub(crate) kind: ParamKind,
    pub(crate) separator: Option<String>,
}

impl ParamSpec {
    fn new(ty: TypeHandle, kind: ParamKind) -> Self {
        Self {
            ty,
            kind,
            separator: None,
        }
    }

    /// A single parsed value of type `T`.
    pub fn one<T: Any>() -> Self {
        Self::new(TypeHandle::of::<T>(), ParamKind::One)
    }

    /// An ordered multi-value collection of `T`, matched from one token.
    pub fn any<T: Any>() -> Self {
        Self::new(TypeHandle::of::<T>(), ParamKind::Any)
    }

    /// Zero or more repeated values of type `T`.
    pub fn vararg<T: Any>() -> Self {
        Self::new(TypeHandle::of::<T>(), ParamKind::Vararg)
    }

    /// The remaining tokens joined by a single space.
    pub fn join() -> Self {
        Self::new(TypeHandle::of::<String>(), ParamKind::Join)
    }

    /// The remaining tokens joined by the given separator.
    pub fn join_with(separator: impl Into<String>) -> Self {
        let mut spec = Self::join();
        spec.separator = Some(separator.into());
        spec
    }

    /// The invoking actor, which must be a `T`. Injected, never parsed.
    pub fn source<T: Actor>() -> Self {
        Self::new(TypeHandle::of::<T>(), ParamKind::Source)
    }

    /// The invoking actor, whatever its concrete type.
    pub fn source_any() -> Self {
        Self::new(TypeHandle::of::<dyn Actor>(), ParamKind::Source)
    }

    /// The declared parameter kind.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// The declared value type.
    pub fn ty(&self) -> TypeHandle {
        self.ty
    }
}

/// A declared flag: triggered by `-id`, boolean or carrying one value.
#[derive(Debug, Clone)]
pub struct FlagSpec {
    pub(crate) id: String,
    pub(crate) ty: Option<TypeHandle>,
}

impl FlagSpec {
    /// A presence-only flag committing `true` when given.
    pub fn boolean(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ty: None,
        }
    }

    /// A flag whose trigger is followed by one value of type `T`.
    pub fn valued<T: Any>(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ty: Some(TypeHandle::of::<T>()),
        }
    }
}

/// Everything the discovery layer supplies for one handler.
pub struct HandlerSpec {
    pub(crate) grammar: String,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) flags: Vec<FlagSpec>,
    pub(crate) meta: HandlerMeta,
    pub(crate) handler: Handler,
}

impl HandlerSpec {
    /// Start a spec from a grammar string and the bound handler.
    pub fn new<F>(grammar: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            grammar: grammar.into(),
            params: Vec::new(),
            flags: Vec::new(),
            meta: HandlerMeta::default(),
            handler: Arc::new(handler),
        }
    }

    /// Append a formal parameter.
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Declare a flag.
    pub fn with_flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    /// Replace the whole metadata block.
    pub fn with_meta(mut self, meta: HandlerMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Override the usage line.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.meta.usage = Some(usage.into());
        self
    }

    /// Require a permission node.
    pub fn with_permission(mut self, node: impl Into<String>) -> Self {
        self.meta.permission = Some(node.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }
}
