//! Accumulates compiled executors and finalizes them into commands.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use herald_grammar::TypeRegistry;

use crate::command::Command;
use crate::executor::Executor;
use crate::processor::{CompileError, Processor};
use crate::spec::HandlerSpec;

/// Collects executors per alias across many handler registrations, then
/// builds one [`Command`] per alias group.
///
/// Aliases unify groups: registering an executor whose aliases span
/// several existing groups merges those groups, and the union survives for
/// every later registration.
pub struct Registrar {
    processor: Processor,
    groups: Vec<Option<Group>>,
    alias_groups: IndexMap<String, usize>,
}

#[derive(Default)]
struct Group {
    aliases: IndexSet<String>,
    executors: Vec<Arc<Executor>>,
}

impl Registrar {
    /// A registrar compiling against the given registry.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            processor: Processor::new(registry),
            groups: Vec::new(),
            alias_groups: IndexMap::new(),
        }
    }

    /// The compiler used for registered specs.
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Compile a handler spec and file its executor under its root
    /// aliases.
    pub fn register(&mut self, spec: HandlerSpec) -> Result<(), CompileError> {
        let compiled = self.processor.compile(spec)?;
        self.register_compiled(compiled.aliases, Arc::new(compiled.executor));
        Ok(())
    }

    /// File an already-compiled executor under the given aliases.
    pub fn register_compiled(&mut self, aliases: Vec<String>, executor: Arc<Executor>) {
        let mut hit: Vec<usize> = Vec::new();
        for alias in &aliases {
            if let Some(&group) = self.alias_groups.get(alias) {
                if !hit.contains(&group) {
                    hit.push(group);
                }
            }
        }

        let target = match hit.first().copied() {
            Some(group) => group,
            None => {
                self.groups.push(Some(Group::default()));
                self.groups.len() - 1
            }
        };

        // aliases bridging previously unrelated groups merge them for good
        for &other in hit.iter().skip(1) {
            let Some(merged) = self.groups[other].take() else {
                continue;
            };
            for alias in &merged.aliases {
                self.alias_groups.insert(alias.clone(), target);
            }
            if let Some(group) = self.groups[target].as_mut() {
                group.aliases.extend(merged.aliases);
                group.executors.extend(merged.executors);
            }
        }

        if let Some(group) = self.groups[target].as_mut() {
            debug!(
                "registered '{}' under {:?}",
                executor.usage(),
                aliases
            );
            for alias in aliases {
                self.alias_groups.insert(alias.clone(), target);
                group.aliases.insert(alias);
            }
            group.executors.push(executor);
        }
    }

    /// Sort every group's executors into canonical order and materialize
    /// one command per group, in first-registration order.
    pub fn build(self) -> Vec<Command> {
        let mut commands = Vec::new();
        for group in self.groups.into_iter().flatten() {
            let mut executors = group.executors;
            executors.sort_by(|a, b| canonical_order(a, b));
            commands.push(Command::new(group.aliases.into_iter().collect(), executors));
        }
        commands
    }
}

/// Canonical execution order: executors compare element-by-element on
/// priority; the first differing priority decides, and a strict prefix
/// sorts before its extension. Literal-heavy overloads therefore run before
/// catch-all collection or vararg overloads sharing the alias.
pub(crate) fn canonical_order(a: &Executor, b: &Executor) -> Ordering {
    a.priorities().cmp(b.priorities())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use herald_grammar::TypeRegistry;

    use super::*;
    use crate::spec::{HandlerSpec, ParamSpec};

    fn registrar() -> Registrar {
        Registrar::new(Arc::new(TypeRegistry::with_defaults()))
    }

    fn noop(grammar: &str) -> HandlerSpec {
        HandlerSpec::new(grammar, |_invocation| Ok(()))
    }

    #[test]
    fn test_distinct_aliases_build_distinct_commands() {
        let mut registrar = registrar();
        registrar.register(noop("alpha")).unwrap();
        registrar.register(noop("beta")).unwrap();

        let commands = registrar.build();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].aliases(), ["alpha"]);
        assert_eq!(commands[1].aliases(), ["beta"]);
    }

    #[test]
    fn test_shared_alias_joins_group() {
        let mut registrar = registrar();
        registrar
            .register(noop("tp <n>").with_param(ParamSpec::one::<i64>()))
            .unwrap();
        registrar.register(noop("tp|teleport here")).unwrap();

        let commands = registrar.build();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].aliases(), ["tp", "teleport"]);
        assert_eq!(commands[0].executors().len(), 2);
    }

    #[test]
    fn test_bridging_alias_merges_groups() {
        let mut registrar = registrar();
        registrar.register(noop("a|b")).unwrap();
        registrar.register(noop("c")).unwrap();
        registrar.register(noop("b|c rest")).unwrap();

        let commands = registrar.build();
        assert_eq!(commands.len(), 1);

        let mut aliases = commands[0].aliases().to_vec();
        aliases.sort();
        assert_eq!(aliases, ["a", "b", "c"]);
        assert_eq!(commands[0].executors().len(), 3);
    }

    #[test]
    fn test_merged_group_survives_for_later_registrations() {
        let mut registrar = registrar();
        registrar.register(noop("a")).unwrap();
        registrar.register(noop("b")).unwrap();
        registrar.register(noop("a|b")).unwrap();
        // a lone 'b' registration lands in the merged group, not a new one
        registrar.register(noop("b again")).unwrap();

        let commands = registrar.build();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].executors().len(), 4);
    }

    #[test]
    fn test_canonical_order_prefers_nodes() {
        let mut registrar = registrar();
        registrar
            .register(noop("x <n>").with_param(ParamSpec::one::<i64>()))
            .unwrap();
        registrar.register(noop("x literal")).unwrap();

        let commands = registrar.build();
        let usages: Vec<&str> = commands[0]
            .executors()
            .iter()
            .map(|e| e.usage())
            .collect();
        assert_eq!(usages, vec!["x literal", "x <n>"]);
    }

    #[test]
    fn test_canonical_order_prefix_sorts_first() {
        let mut registrar = registrar();
        registrar.register(noop("x stop start")).unwrap();
        registrar.register(noop("x stop")).unwrap();

        let commands = registrar.build();
        let usages: Vec<&str> = commands[0]
            .executors()
            .iter()
            .map(|e| e.usage())
            .collect();
        assert_eq!(usages, vec!["x stop", "x stop start"]);
    }

    #[test]
    fn test_canonical_order_ranks_kinds() {
        let mut registrar = registrar();
        registrar
            .register(noop("x <rest>").with_param(ParamSpec::vararg::<String>()))
            .unwrap();
        registrar
            .register(noop("x <text>").with_param(ParamSpec::join()))
            .unwrap();
        registrar
            .register(noop("x <one>").with_param(ParamSpec::one::<String>()))
            .unwrap();

        let commands = registrar.build();
        let usages: Vec<&str> = commands[0]
            .executors()
            .iter()
            .map(|e| e.usage())
            .collect();
        assert_eq!(usages, vec!["x <one>", "x <text>", "x <rest>"]);
    }
}
