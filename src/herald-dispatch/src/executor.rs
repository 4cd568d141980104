//! One compiled overload of a command handler.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use herald_grammar::{CommandError, CommandResult, Context, Cursor, Element, Param, ParamKind};

use crate::actor::{Actor, ActorRef};

/// The type-erased invoker bound to an executor.
///
/// Handlers read their arguments positionally through the [`Invocation`]
/// view; a returned error is wrapped as a handler failure and never
/// retried.
pub type Handler = Arc<dyn Fn(&Invocation<'_>) -> Result<(), String> + Send + Sync>;

/// Read-only view a handler receives over the parsed value bag.
///
/// Indexes refer to formal parameter positions in declaration order,
/// source parameters included. Flags are read by their declared id.
pub struct Invocation<'a> {
    params: &'a [Param],
    context: &'a Context,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(params: &'a [Param], context: &'a Context) -> Self {
        Self { params, context }
    }

    /// The underlying value bag.
    pub fn context(&self) -> &Context {
        self.context
    }

    fn param(&self, index: usize) -> CommandResult<&Param> {
        self.params
            .get(index)
            .ok_or_else(|| CommandError::missing_parameter(&format!("#{index}")))
    }

    /// The single value bound at the given parameter position.
    pub fn one<T: std::any::Any>(&self, index: usize) -> CommandResult<&T> {
        let param = self.param(index)?;
        self.context
            .one::<T>(&param.id)
            .ok_or_else(|| CommandError::missing_parameter(&param.id))
    }

    /// Every value bound at the given parameter position.
    pub fn all<T: std::any::Any>(&self, index: usize) -> Vec<&T> {
        self.param(index)
            .map(|param| self.context.all::<T>(&param.id))
            .unwrap_or_default()
    }

    /// The joined string bound at the given parameter position.
    pub fn joined(&self, index: usize) -> CommandResult<&str> {
        self.one::<String>(index).map(String::as_str)
    }

    /// Whether the flag with the given id was supplied.
    pub fn flag(&self, id: &str) -> bool {
        self.context.contains(id)
    }

    /// The value of a valued flag, when supplied.
    pub fn flag_value<T: std::any::Any>(&self, id: &str) -> Option<&T> {
        self.context.one::<T>(id)
    }

    /// The source actor at the given parameter position, downcast to its
    /// concrete type.
    pub fn source<T: std::any::Any>(&self, index: usize) -> CommandResult<&T> {
        let param = self.param(index)?;
        self.context
            .one::<ActorRef>(&param.id)
            .and_then(|actor| actor.as_any().downcast_ref::<T>())
            .ok_or_else(|| CommandError::mismatch(format!("source is not a {}", param.ty.name())))
    }

    /// The invoking actor, when the handler declared a source parameter.
    pub fn actor(&self) -> Option<ActorRef> {
        self.params
            .iter()
            .find(|param| param.kind == ParamKind::Source)
            .and_then(|param| self.context.one::<ActorRef>(&param.id))
            .cloned()
    }
}

/// One compiled overload: elements, formal parameters, metadata and the
/// bound handler. Built once at registration time, immutable afterwards,
/// shared read-only across concurrent dispatches.
pub struct Executor {
    elements: Vec<Element>,
    params: Vec<Param>,
    usage: String,
    permission: Option<String>,
    description: String,
    handler: Handler,
}

impl Executor {
    pub(crate) fn new(
        elements: Vec<Element>,
        params: Vec<Param>,
        usage: String,
        permission: Option<String>,
        description: String,
        handler: Handler,
    ) -> Self {
        Self {
            elements,
            params,
            usage,
            permission,
            description,
            handler,
        }
    }

    /// The rendered usage line.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// The required permission node, if any.
    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    /// The handler description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The compiled elements, in match order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The formal parameters, in declaration order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn priorities(&self) -> impl Iterator<Item = u8> + '_ {
        self.elements.iter().map(Element::priority)
    }

    /// Parse raw input tokens into a value bag.
    pub fn parse(&self, actor: &ActorRef, input: &[String]) -> CommandResult<Context> {
        let mut context = Context::new();
        self.seed_sources(actor, &mut context)?;
        self.run(&mut context, input)?;
        Ok(context)
    }

    fn seed_sources(&self, actor: &ActorRef, context: &mut Context) -> CommandResult<()> {
        for param in self.params.iter().filter(|p| p.kind == ParamKind::Source) {
            let assignable = param.ty.id() == TypeId::of::<dyn Actor>()
                || param.ty.id() == actor.as_any().type_id();
            if !assignable {
                return Err(CommandError::mismatch(format!(
                    "this command may only be used by a {}",
                    param.ty.name()
                )));
            }
            context.insert(&param.id, Arc::clone(actor));
        }
        Ok(())
    }

    fn run(&self, context: &mut Context, input: &[String]) -> CommandResult<()> {
        let mut cursor = Cursor::new(input);
        if self.elements.is_empty() && !cursor.has_next() {
            return Ok(());
        }
        for (index, element) in self.elements.iter().enumerate() {
            element
                .parse(&mut cursor, context)
                .map_err(|err| err.with_priority(index).with_expected_args(&self.usage))?;
        }
        if cursor.has_next() {
            return Err(CommandError::too_many_arguments(self.elements.len())
                .with_expected_args(&self.usage));
        }
        Ok(())
    }

    /// Run the bound handler against a parsed value bag.
    pub fn invoke(&self, context: &Context) -> CommandResult<()> {
        for param in &self.params {
            if matches!(param.kind, ParamKind::Vararg | ParamKind::Flag) {
                continue;
            }
            if !context.contains(&param.id) {
                return Err(CommandError::missing_parameter(&param.id));
            }
        }
        let invocation = Invocation::new(&self.params, context);
        (self.handler)(&invocation).map_err(CommandError::handler_failed)
    }

    /// Populate completion candidates for in-progress input: parsing stops
    /// at the first failing element and that element completes.
    pub fn suggest(&self, actor: &ActorRef, input: &[String], out: &mut Vec<String>) {
        let mut context = Context::suggesting();
        if self.seed_sources(actor, &mut context).is_err() {
            return;
        }
        let mut cursor = Cursor::new(input);
        for element in &self.elements {
            if element.parse(&mut cursor, &mut context).is_err() {
                element.suggest(&mut cursor, out);
                return;
            }
        }
    }

    /// Completions when nothing has been typed yet: only the first element
    /// is asked.
    pub fn suggest_first(&self, out: &mut Vec<String>) {
        if let Some(element) = self.elements.first() {
            element.suggest(&mut Cursor::new(&[]), out);
        }
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("usage", &self.usage)
            .field("permission", &self.permission)
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use herald_grammar::{ErrorKind, TypeRegistry};

    use super::*;
    use crate::actor::SystemActor;
    use crate::processor::Processor;
    use crate::spec::{HandlerSpec, ParamSpec};

    fn processor() -> Processor {
        Processor::new(Arc::new(TypeRegistry::with_defaults()))
    }

    fn actor() -> ActorRef {
        Arc::new(SystemActor::default())
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_parse_and_invoke() {
        let seen = Arc::new(AtomicI64::new(0));
        let seen_in_handler = Arc::clone(&seen);
        let spec = HandlerSpec::new("pay <amount>", move |invocation| {
            seen_in_handler.store(*invocation.one::<i64>(0)?, Ordering::SeqCst);
            Ok(())
        })
        .with_param(ParamSpec::one::<i64>());

        let compiled = processor().compile(spec).unwrap();
        let context = compiled.executor.parse(&actor(), &tokens(&["250"])).unwrap();
        compiled.executor.invoke(&context).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 250);
    }

    #[test]
    fn test_too_many_arguments_priority() {
        let spec = HandlerSpec::new("pay <amount>", |_invocation| Ok(()))
            .with_param(ParamSpec::one::<i64>());
        let compiled = processor().compile(spec).unwrap();

        let err = compiled
            .executor
            .parse(&actor(), &tokens(&["250", "extra"]))
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::TooManyArguments);
        assert_eq!(err.priority, 1);
        assert_eq!(err.expected_args.as_deref(), Some("pay <amount>"));
    }

    #[test]
    fn test_element_failure_carries_index_and_usage() {
        let spec = HandlerSpec::new("warp set <name>", |_invocation| Ok(()))
            .with_param(ParamSpec::one::<i64>());
        let compiled = processor().compile(spec).unwrap();

        let err = compiled
            .executor
            .parse(&actor(), &tokens(&["set", "oops"]))
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ParseMismatch);
        assert_eq!(err.priority, 1);
        assert_eq!(err.expected_args.as_deref(), Some("warp set <name>"));
    }

    #[test]
    fn test_source_seeded_and_downcast() {
        let spec = HandlerSpec::new("whoami", |invocation| {
            let source = invocation.source::<SystemActor>(0)?;
            assert_eq!(source.name(), "system");
            Ok(())
        })
        .with_param(ParamSpec::source::<SystemActor>());
        let compiled = processor().compile(spec).unwrap();

        let context = compiled.executor.parse(&actor(), &tokens(&[])).unwrap();
        compiled.executor.invoke(&context).unwrap();
    }

    #[test]
    fn test_source_type_mismatch() {
        struct Guest;
        impl Actor for Guest {
            fn name(&self) -> &str {
                "guest"
            }
            fn has_permission(&self, _node: &str) -> bool {
                false
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        let spec = HandlerSpec::new("whoami", |_invocation| Ok(()))
            .with_param(ParamSpec::source::<SystemActor>());
        let compiled = processor().compile(spec).unwrap();

        let guest: ActorRef = Arc::new(Guest);
        let err = compiled.executor.parse(&guest, &tokens(&[])).unwrap_err();
        assert!(err.message.contains("SystemActor"));
    }

    #[test]
    fn test_source_any_accepts_every_actor() {
        let spec = HandlerSpec::new("ping", |_invocation| Ok(()))
            .with_param(ParamSpec::source_any());
        let compiled = processor().compile(spec).unwrap();

        assert!(compiled.executor.parse(&actor(), &tokens(&[])).is_ok());
    }

    #[test]
    fn test_invoke_missing_parameter() {
        let spec = HandlerSpec::new("pay <amount>", |_invocation| Ok(()))
            .with_param(ParamSpec::one::<i64>());
        let compiled = processor().compile(spec).unwrap();

        let err = compiled.executor.invoke(&Context::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingParameter);
        assert!(err.message.contains("i64#0"));
    }

    #[test]
    fn test_handler_failure_wrapped() {
        let spec = HandlerSpec::new("boom", |_invocation| Err("kaboom".to_string()));
        let compiled = processor().compile(spec).unwrap();

        let context = compiled.executor.parse(&actor(), &tokens(&[])).unwrap();
        let err = compiled.executor.invoke(&context).unwrap_err();
        assert_eq!(err.kind, ErrorKind::HandlerFailed);
        assert_eq!(err.message, "kaboom");
    }

    #[test]
    fn test_suggest_stops_at_failing_element() {
        let spec = HandlerSpec::new("gamemode <enabled> <amount>", |_invocation| Ok(()))
            .with_param(ParamSpec::one::<bool>())
            .with_param(ParamSpec::one::<i64>());
        let compiled = processor().compile(spec).unwrap();

        let mut out = Vec::new();
        compiled.executor.suggest(&actor(), &tokens(&["tr"]), &mut out);
        assert_eq!(out, vec!["true"]);
    }

    #[test]
    fn test_suggest_first() {
        let spec = HandlerSpec::new("toggle <enabled>", |_invocation| Ok(()))
            .with_param(ParamSpec::one::<bool>());
        let compiled = processor().compile(spec).unwrap();

        let mut out = Vec::new();
        compiled.executor.suggest_first(&mut out);
        assert_eq!(out, vec!["true", "false"]);
    }

    #[test]
    fn test_vararg_and_flags_optional_on_invoke() {
        let spec = HandlerSpec::new("tag <names>", |invocation| {
            assert!(invocation.all::<String>(0).is_empty());
            assert!(!invocation.flag("force"));
            Ok(())
        })
        .with_param(ParamSpec::vararg::<String>())
        .with_flag(crate::spec::FlagSpec::boolean("force"));
        let compiled = processor().compile(spec).unwrap();

        let context = compiled.executor.parse(&actor(), &tokens(&[])).unwrap();
        compiled.executor.invoke(&context).unwrap();
    }
}
