//! Grammar compilation: handler descriptors into executors.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use herald_grammar::{
    Element, ElementSeed, FlagElement, FlagEntry, JoinElement, MultiElement, NodeElement, Param,
    ParamKind, Token, TypeHandle, TypeRegistry, ValueElement, VarargElement, tokenize,
};

use crate::executor::Executor;
use crate::spec::{HandlerSpec, ParamSpec};

/// Errors raised while compiling a handler descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The grammar string contained no tokens.
    #[error("grammar is empty")]
    EmptyGrammar,

    /// The first grammar token must be the literal root alias set.
    #[error("grammar must start with a literal alias token")]
    PlaceholderRoot,

    /// Grammar tokens and formal parameters could not be paired up.
    #[error("grammar does not match the parameter list: {0}")]
    ArityMismatch(String),
}

/// A compiled handler: the root aliases it registers under plus its
/// executor.
#[derive(Debug)]
pub struct Compiled {
    /// Alias spellings from the grammar's first token.
    pub aliases: Vec<String>,
    /// The compiled overload.
    pub executor: Executor,
}

/// Compiles handler descriptors against a shared type registry.
pub struct Processor {
    registry: Arc<TypeRegistry>,
}

impl Processor {
    /// A processor over the given registry.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// The shared registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Compile one handler descriptor.
    ///
    /// The grammar's first token supplies the command aliases and is never
    /// itself compiled into an element. The remaining tokens walk in
    /// lock-step with the formal parameters: literal tokens become nodes
    /// without consuming a parameter, source parameters bind without
    /// consuming a token, and each placeholder pairs with the next
    /// remaining parameter. Declared flags compile into one trailing flag
    /// element.
    pub fn compile(&self, spec: HandlerSpec) -> Result<Compiled, CompileError> {
        let mut tokens = tokenize(&spec.grammar).into_iter();
        let root = tokens.next().ok_or(CompileError::EmptyGrammar)?;
        let Token::Literal { aliases } = root else {
            return Err(CompileError::PlaceholderRoot);
        };

        let flag_triggers: Vec<String> =
            spec.flags.iter().map(|flag| format!("-{}", flag.id)).collect();

        let mut ids = IdGenerator::default();
        let mut elements: Vec<Element> = Vec::new();
        let mut params: Vec<Param> = Vec::new();
        let mut formals = spec.params.into_iter().peekable();

        loop {
            if formals.peek().map(|p| p.kind) == Some(ParamKind::Source) {
                if let Some(formal) = formals.next() {
                    params.push(Param {
                        id: ids.next(formal.ty),
                        ty: formal.ty,
                        kind: formal.kind,
                    });
                }
                continue;
            }
            match tokens.next() {
                Some(Token::Literal { aliases }) => {
                    elements.push(Element::Node(NodeElement::new(aliases)));
                }
                Some(Token::Placeholder { name }) => {
                    let Some(formal) = formals.next() else {
                        return Err(CompileError::ArityMismatch(format!(
                            "placeholder <{name}> has no matching parameter"
                        )));
                    };
                    let id = ids.next(formal.ty);
                    params.push(Param {
                        id: id.clone(),
                        ty: formal.ty,
                        kind: formal.kind,
                    });
                    elements.push(self.build_element(&formal, id, name, &flag_triggers));
                }
                None => {
                    if let Some(formal) = formals.next() {
                        return Err(CompileError::ArityMismatch(format!(
                            "parameter of type {} has no matching grammar token",
                            formal.ty.name()
                        )));
                    }
                    break;
                }
            }
        }

        if !spec.flags.is_empty() {
            let mut table = IndexMap::new();
            for flag in &spec.flags {
                let ty = flag.ty.unwrap_or_else(TypeHandle::of::<bool>);
                params.push(Param {
                    id: flag.id.clone(),
                    ty,
                    kind: ParamKind::Flag,
                });
                let value = flag.ty.map(|ty| {
                    ValueElement::new(
                        flag.id.clone(),
                        flag.id.clone(),
                        ty,
                        ParamKind::Flag.priority(),
                        &self.registry,
                    )
                });
                table.insert(format!("-{}", flag.id), FlagEntry::new(flag.id.clone(), value));
            }
            elements.push(Element::Flag(FlagElement::new(table)));
        }

        let usage = spec.meta.usage.clone().unwrap_or_else(|| {
            let mut parts = vec![aliases.first().cloned().unwrap_or_default()];
            parts.extend(elements.iter().map(Element::usage));
            parts.join(" ")
        });
        let description = spec.meta.description.clone().unwrap_or_default();

        debug!(
            "compiled '{}' ({} elements, {} params)",
            usage,
            elements.len(),
            params.len()
        );

        Ok(Compiled {
            aliases,
            executor: Executor::new(
                elements,
                params,
                usage,
                spec.meta.permission.clone(),
                description,
                spec.handler,
            ),
        })
    }

    fn build_element(
        &self,
        formal: &ParamSpec,
        id: String,
        name: String,
        flag_triggers: &[String],
    ) -> Element {
        let priority = formal.kind.priority();
        if let Some(provider) = self.registry.provider(&formal.ty) {
            let seed = ElementSeed {
                id,
                name,
                ty: formal.ty,
                priority,
            };
            return provider(&seed, &self.registry);
        }
        match formal.kind {
            ParamKind::Any => Element::Multi(MultiElement::new(ValueElement::new(
                id,
                name,
                formal.ty,
                priority,
                &self.registry,
            ))),
            ParamKind::Vararg => Element::Vararg(VarargElement::new(
                ValueElement::new(id, name, formal.ty, priority, &self.registry),
                flag_triggers.to_vec(),
            )),
            ParamKind::Join => Element::Join(JoinElement::new(
                id,
                name,
                formal.separator.clone().unwrap_or_else(|| " ".to_string()),
            )),
            _ => Element::Value(ValueElement::new(id, name, formal.ty, priority, &self.registry)),
        }
    }
}

/// Generates parameter ids, one per occurrence of a type within a single
/// handler's parameter list.
#[derive(Default)]
struct IdGenerator {
    seen: HashMap<&'static str, usize>,
}

impl IdGenerator {
    fn next(&mut self, ty: TypeHandle) -> String {
        let occurrence = self.seen.entry(ty.name()).or_insert(0);
        let id = format!("{}#{}", ty.name(), *occurrence);
        *occurrence += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    use herald_grammar::TypeRegistry;

    use super::*;
    use crate::actor::SystemActor;
    use crate::spec::{FlagSpec, ParamSpec};

    fn processor() -> Processor {
        Processor::new(Arc::new(TypeRegistry::with_defaults()))
    }

    fn noop(grammar: &str) -> HandlerSpec {
        HandlerSpec::new(grammar, |_invocation| Ok(()))
    }

    #[test]
    fn test_compile_simple_grammar() {
        let spec = noop("msg|whisper <target> <text>")
            .with_param(ParamSpec::one::<String>())
            .with_param(ParamSpec::join());
        let compiled = processor().compile(spec).unwrap();

        assert_eq!(compiled.aliases, vec!["msg", "whisper"]);
        assert_eq!(compiled.executor.elements().len(), 2);
        assert_eq!(compiled.executor.params().len(), 2);
        assert_eq!(compiled.executor.usage(), "msg <target> <text>");
    }

    #[test]
    fn test_usage_round_trips_grammar() {
        let spec = noop("greet <name> loud|quiet <times>")
            .with_param(ParamSpec::one::<String>())
            .with_param(ParamSpec::one::<i64>());
        let compiled = processor().compile(spec).unwrap();

        assert_eq!(compiled.executor.usage(), "greet <name> loud <times>");
    }

    #[test]
    fn test_usage_includes_flags() {
        let spec = noop("give <item>")
            .with_param(ParamSpec::one::<String>())
            .with_flag(FlagSpec::boolean("silent"))
            .with_flag(FlagSpec::valued::<i64>("count"));
        let compiled = processor().compile(spec).unwrap();

        assert_eq!(
            compiled.executor.usage(),
            "give <item> [-silent] [-count <value>]"
        );
    }

    #[test]
    fn test_usage_override_wins() {
        let spec = noop("give <item>")
            .with_param(ParamSpec::one::<String>())
            .with_usage("give ITEM");
        let compiled = processor().compile(spec).unwrap();

        assert_eq!(compiled.executor.usage(), "give ITEM");
    }

    #[test]
    fn test_repeated_types_get_distinct_ids() {
        let spec = noop("add <a> <b>")
            .with_param(ParamSpec::one::<i64>())
            .with_param(ParamSpec::one::<i64>());
        let compiled = processor().compile(spec).unwrap();

        let ids: Vec<&str> = compiled
            .executor
            .params()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["i64#0", "i64#1"]);
    }

    #[test]
    fn test_source_binds_without_token() {
        let spec = noop("home <name>")
            .with_param(ParamSpec::source::<SystemActor>())
            .with_param(ParamSpec::one::<String>());
        let compiled = processor().compile(spec).unwrap();

        assert_eq!(compiled.executor.params().len(), 2);
        assert_eq!(compiled.executor.params()[0].kind, ParamKind::Source);
        assert_eq!(compiled.executor.elements().len(), 1);
        assert_eq!(compiled.executor.usage(), "home <name>");
    }

    #[test]
    fn test_empty_grammar_rejected() {
        assert_eq!(
            processor().compile(noop("")).unwrap_err(),
            CompileError::EmptyGrammar
        );
    }

    #[test]
    fn test_placeholder_root_rejected() {
        assert_eq!(
            processor().compile(noop("<oops>")).unwrap_err(),
            CompileError::PlaceholderRoot
        );
    }

    #[test]
    fn test_placeholder_without_parameter_rejected() {
        let err = processor().compile(noop("pay <amount>")).unwrap_err();
        assert!(matches!(err, CompileError::ArityMismatch(_)));
        assert!(err.to_string().contains("<amount>"));
    }

    #[test]
    fn test_parameter_without_token_rejected() {
        let spec = noop("pay").with_param(ParamSpec::one::<i64>());
        let err = processor().compile(spec).unwrap_err();
        assert!(matches!(err, CompileError::ArityMismatch(_)));
        assert!(err.to_string().contains("i64"));
    }

    #[test]
    fn test_provider_overrides_value_element() {
        let mut registry = TypeRegistry::with_defaults();
        struct Warp;
        registry.register_provider::<Warp, _>(|seed, registry| {
            Element::Value(ValueElement::new(
                seed.id.clone(),
                seed.name.clone(),
                TypeHandle::of::<String>(),
                seed.priority,
                registry,
            ))
        });
        let processor = Processor::new(Arc::new(registry));

        let spec = noop("warp <name>").with_param(ParamSpec::one::<Warp>());
        let compiled = processor.compile(spec).unwrap();

        // the provider element parses through the String parser
        let actor: crate::actor::ActorRef = Arc::new(SystemActor::default());
        let input = vec!["spawn".to_string()];
        let context = compiled.executor.parse(&actor, &input).unwrap();
        assert_eq!(
            context.one::<String>("Warp#0").map(String::as_str),
            Some("spawn")
        );
    }

    #[test]
    fn test_vararg_learns_flag_triggers() {
        let spec = noop("tag <names>")
            .with_param(ParamSpec::vararg::<String>())
            .with_flag(FlagSpec::boolean("force"));
        let compiled = processor().compile(spec).unwrap();

        let actor: crate::actor::ActorRef = Arc::new(SystemActor::default());
        let input: Vec<String> = ["alice", "bob", "-force"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let context = compiled.executor.parse(&actor, &input).unwrap();

        assert_eq!(context.count("String#0"), 2);
        assert_eq!(context.one::<bool>("force"), Some(&true));
    }

    #[test]
    fn test_join_with_custom_separator() {
        let spec = noop("list <items>").with_param(ParamSpec::join_with(", "));
        let compiled = processor().compile(spec).unwrap();

        let actor: crate::actor::ActorRef = Arc::new(SystemActor::default());
        let input: Vec<String> = ["a", "b", "c"].iter().map(|t| t.to_string()).collect();
        let context = compiled.executor.parse(&actor, &input).unwrap();

        assert_eq!(
            context.one::<String>("String#0").map(String::as_str),
            Some("a, b, c")
        );
    }
}
