//! Command grammar engine for Herald.
//!
//! This crate compiles declarative usage patterns into matching trees and
//! runs raw user-typed argument tokens against them. It contains the
//! tokenizer for the grammar mini-language, the per-type behavior registry,
//! and the element tree that does the actual matching, value extraction and
//! completion.
//!
//! # Grammar mini-language
//!
//! A grammar string is a run of space-separated tokens. A bare token is a
//! literal position with one or more `|`-separated spellings
//! (`lang|language`); a token wrapped in `<...>` is a placeholder bound
//! positionally to the next formal parameter. The first token of a
//! handler's grammar names the command's aliases and is consumed by the
//! compiler, never matched as an element.
//!
//! ```rust,ignore
//! use herald_grammar::{tokenize, Token};
//!
//! let tokens = tokenize("msg|whisper <target> <text>");
//! assert!(tokens[0].is_node());
//! ```
//!
//! # Matching
//!
//! Elements consume tokens from a shared [`Cursor`] and commit typed values
//! into a [`Context`]. An element that fails restores the cursor to its
//! pre-call position, so competing overloads can re-run the same input.
//! Collection-typed parameters backtrack across candidate completions; see
//! [`element::MultiElement`].
//!
//! Compilation of whole handlers into executors, and dispatch across
//! overloads, live in the `herald-dispatch` crate.

pub mod context;
pub mod cursor;
pub mod element;
pub mod error;
pub mod param;
pub mod token;
pub mod types;

pub use context::{BoxedValue, Context};
pub use cursor::Cursor;
pub use element::{
    Element, FlagElement, FlagEntry, JoinElement, MultiElement, NodeElement, ValueElement,
    VarargElement,
};
pub use error::{CommandError, CommandResult, ErrorKind};
pub use param::{Param, ParamKind};
pub use token::{Token, tokenize};
pub use types::{
    ElementSeed, FilterFn, OptionsFn, ParseFn, ProviderFn, TypeHandle, TypeRegistry, prefix_filter,
};
