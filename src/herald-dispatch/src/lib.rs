//! Handler compilation and command dispatch for Herald.
//!
//! This crate turns handler descriptors into executable command overloads
//! and dispatches raw argument strings across them. It builds on the
//! `herald-grammar` crate for tokenization, the type registry and the
//! element tree.
//!
//! # Registration and dispatch
//!
//! Registration runs once, up front: each handler's grammar string and
//! formal parameter list compile into an [`Executor`], and a [`Registrar`]
//! groups executors sharing an alias into [`Command`]s sorted by canonical
//! order. Dispatch then runs any number of times, concurrently: a command
//! tries its executors in order behind their permission gates and the
//! first full match wins; when everything fails, the deepest-matching
//! failure is the one reported.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use herald_dispatch::{ActorRef, HandlerSpec, ParamSpec, Registrar, SystemActor};
//! use herald_grammar::TypeRegistry;
//!
//! let mut registrar = Registrar::new(Arc::new(TypeRegistry::with_defaults()));
//! registrar.register(
//!     HandlerSpec::new("pay <target> <amount>", |invocation| {
//!         let target = invocation.one::<String>(0)?;
//!         let amount = invocation.one::<i64>(1)?;
//!         println!("paying {amount} to {target}");
//!         Ok(())
//!     })
//!     .with_param(ParamSpec::one::<String>())
//!     .with_param(ParamSpec::one::<i64>())
//!     .with_permission("herald.pay"),
//! )?;
//!
//! let commands = registrar.build();
//! let actor: ActorRef = Arc::new(SystemActor::default());
//! commands[0].process_arguments(&actor, "alice 250")?;
//! ```
//!
//! # Completion
//!
//! [`Command::suggest`] drives interactive completion over the same
//! compiled trees; suggestion-mode parsing tolerates an in-progress final
//! token and completes it from the registry's option lists.

pub mod actor;
pub mod command;
pub mod executor;
pub mod processor;
pub mod registrar;
pub mod spec;

pub use actor::{Actor, ActorRef, SystemActor};
pub use command::{Command, SUGGESTION_LIMIT};
pub use executor::{Executor, Handler, Invocation};
pub use processor::{Compiled, CompileError, Processor};
pub use registrar::Registrar;
pub use spec::{FlagSpec, HandlerMeta, HandlerSpec, ParamSpec};

pub use herald_grammar as grammar;
