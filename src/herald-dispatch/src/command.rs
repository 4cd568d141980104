//! Alias-group dispatch: overload selection, ranked errors, suggestions.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, trace};

use herald_grammar::{CommandError, CommandResult};

use crate::actor::ActorRef;
use crate::executor::Executor;

/// Upper bound on returned completion candidates.
pub const SUGGESTION_LIMIT: usize = 20;

/// One or more aliases sharing an ordered set of executors.
///
/// Executors are sorted once, at build time, into canonical order; both
/// dispatch and error ranking rely on that order being stable.
#[derive(Debug)]
pub struct Command {
    aliases: Vec<String>,
    executors: Vec<Arc<Executor>>,
}

impl Command {
    pub(crate) fn new(aliases: Vec<String>, executors: Vec<Arc<Executor>>) -> Self {
        Self { aliases, executors }
    }

    /// Every alias this command answers to.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The first registered alias.
    pub fn primary_alias(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or("")
    }

    /// The executors, in canonical order.
    pub fn executors(&self) -> &[Arc<Executor>] {
        &self.executors
    }

    /// Dispatch a raw argument string.
    ///
    /// Executors run in canonical order behind their permission gates; the
    /// first whose parse and invoke both succeed wins. When every executor
    /// fails, the collected failures are sorted by priority and the
    /// highest — the deepest match — is surfaced.
    pub fn process_arguments(&self, actor: &ActorRef, raw: &str) -> CommandResult<()> {
        let input = split_arguments(raw);
        let mut failures: Vec<CommandError> = Vec::new();

        for executor in &self.executors {
            if let Some(node) = executor.permission() {
                if !actor.has_permission(node) {
                    failures.push(CommandError::not_permitted(node));
                    continue;
                }
            }
            match executor.parse(actor, &input) {
                Ok(context) => match executor.invoke(&context) {
                    Ok(()) => return Ok(()),
                    Err(err) => failures.push(err),
                },
                Err(err) => {
                    trace!("overload '{}' rejected: {}", executor.usage(), err);
                    failures.push(err);
                }
            }
        }

        debug!(
            "'{}' matched no overload ({} failures)",
            self.primary_alias(),
            failures.len()
        );
        failures.sort_by_key(|failure| failure.priority);
        Err(failures
            .pop()
            .unwrap_or_else(|| CommandError::mismatch("unknown command")))
    }

    /// Completion candidates for an in-progress argument string.
    ///
    /// Empty input collects each permitted executor's first-position
    /// candidates, alphabetically; otherwise in-progress candidates sorted
    /// by length then spelling. De-duplicated, capped at
    /// [`SUGGESTION_LIMIT`].
    pub fn suggest(&self, actor: &ActorRef, raw: &str) -> Vec<String> {
        let mut seen: IndexSet<String> = IndexSet::new();
        let permitted = self.executors.iter().filter(|executor| {
            executor
                .permission()
                .is_none_or(|node| actor.has_permission(node))
        });

        if raw.trim().is_empty() {
            for executor in permitted {
                let mut out = Vec::new();
                executor.suggest_first(&mut out);
                seen.extend(out);
            }
            let mut list: Vec<String> = seen.into_iter().collect();
            list.sort();
            list.truncate(SUGGESTION_LIMIT);
            return list;
        }

        let input = split_suggestion_prefix(raw);
        for executor in permitted {
            let mut out = Vec::new();
            executor.suggest(actor, &input, &mut out);
            seen.extend(out);
        }
        let mut list: Vec<String> = seen.into_iter().collect();
        list.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        list.truncate(SUGGESTION_LIMIT);
        list
    }
}

/// Whitespace-split a raw argument string.
pub(crate) fn split_arguments(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Like [`split_arguments`], but a trailing space opens an empty
/// in-progress token so completion targets the next position.
fn split_suggestion_prefix(raw: &str) -> Vec<String> {
    let mut tokens = split_arguments(raw);
    if raw.ends_with(char::is_whitespace) {
        tokens.push(String::new());
    }
    tokens
}
