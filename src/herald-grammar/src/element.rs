//! Compiled matching units.

use std::fmt;

use indexmap::IndexMap;
use tracing::trace;

use crate::context::Context;
use crate::cursor::Cursor;
use crate::error::{CommandError, CommandResult};
use crate::param::ParamKind;
use crate::types::{FilterFn, OptionsFn, ParseFn, TypeHandle, TypeRegistry};

/// A compiled matching unit.
///
/// `parse` either advances the cursor and commits values into the context,
/// or raises and leaves the cursor exactly at its pre-call position.
/// `suggest` produces completion candidates for the cursor's remaining
/// input instead of committing a final parse.
#[derive(Debug)]
pub enum Element {
    /// A single typed value.
    Value(ValueElement),
    /// An ordered multi-value collection matched from one token.
    Multi(MultiElement),
    /// A repeated value running until exhaustion or a flag trigger.
    Vararg(VarargElement),
    /// The remaining tokens joined into one string.
    Join(JoinElement),
    /// A fixed literal position.
    Node(NodeElement),
    /// The declared flags of one handler.
    Flag(FlagElement),
}

impl Element {
    /// Ordering weight used for canonical overload comparison.
    pub fn priority(&self) -> u8 {
        match self {
            Element::Value(value) => value.priority(),
            Element::Multi(multi) => multi.inner().priority(),
            Element::Vararg(vararg) => vararg.inner().priority(),
            Element::Join(_) => ParamKind::Join.priority(),
            Element::Node(_) => ParamKind::Node.priority(),
            Element::Flag(_) => ParamKind::Flag.priority(),
        }
    }

    /// Consume input from the cursor, committing matched values.
    pub fn parse(&self, cursor: &mut Cursor<'_>, context: &mut Context) -> CommandResult<()> {
        match self {
            Element::Value(value) => value.parse(cursor, context),
            Element::Multi(multi) => multi.parse(cursor, context),
            Element::Vararg(vararg) => vararg.parse(cursor, context),
            Element::Join(join) => join.parse(cursor, context),
            Element::Node(node) => node.parse(cursor),
            Element::Flag(flags) => flags.parse(cursor, context),
        }
    }

    /// Produce completion candidates for the cursor's remaining input.
    pub fn suggest(&self, cursor: &mut Cursor<'_>, out: &mut Vec<String>) {
        match self {
            Element::Value(value) => value.suggest(cursor, out),
            Element::Multi(multi) => multi.inner().suggest(cursor, out),
            Element::Vararg(vararg) => vararg.suggest(cursor, out),
            Element::Join(join) => join.suggest(cursor),
            Element::Node(node) => node.suggest(cursor, out),
            Element::Flag(flags) => flags.suggest(cursor, out),
        }
    }

    /// The token as rendered in a usage line.
    pub fn usage(&self) -> String {
        match self {
            Element::Value(value) => format!("<{}>", value.name()),
            Element::Multi(multi) => format!("<{}>", multi.inner().name()),
            Element::Vararg(vararg) => format!("<{}>", vararg.inner().name()),
            Element::Join(join) => format!("<{}>", join.name()),
            Element::Node(node) => node.aliases().first().cloned().unwrap_or_default(),
            Element::Flag(flags) => flags.usage(),
        }
    }
}

/// Parses one token through the registry parser for its declared type.
pub struct ValueElement {
    id: String,
    name: String,
    ty: TypeHandle,
    priority: u8,
    parser: ParseFn,
    options: OptionsFn,
    filter: FilterFn,
}

impl ValueElement {
    /// Build an element for the given type, resolving its parser, options
    /// and filter from the registry once.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ty: TypeHandle,
        priority: u8,
        registry: &TypeRegistry,
    ) -> Self {
        Self {
            parser: registry.parser(&ty),
            options: registry.options(&ty),
            filter: registry.filter(&ty),
            id: id.into(),
            name: name.into(),
            ty,
            priority,
        }
    }

    /// Key values are committed under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The placeholder name from the grammar string.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared value type.
    pub fn ty(&self) -> TypeHandle {
        self.ty
    }

    /// Ordering weight inherited from the parameter kind.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Consume and parse one token.
    pub fn parse(&self, cursor: &mut Cursor<'_>, context: &mut Context) -> CommandResult<()> {
        let checkpoint = cursor.pos();
        let Some(raw) = cursor.next() else {
            return Err(CommandError::mismatch(format!(
                "missing argument <{}>",
                self.name
            )));
        };
        match self.parse_text(raw, context) {
            Ok(()) => Ok(()),
            Err(err) => {
                cursor.set_pos(checkpoint);
                Err(err)
            }
        }
    }

    /// Parse the given text without touching any cursor.
    pub fn parse_text(&self, raw: &str, context: &mut Context) -> CommandResult<()> {
        let value = (self.parser)(raw).map_err(CommandError::mismatch)?;
        context.push(&self.id, value);
        Ok(())
    }

    /// Options narrowed against a partial token.
    pub fn complete(&self, partial: &str) -> Vec<String> {
        (self.filter)(&(self.options)(), partial)
    }

    /// Complete the current token.
    pub fn suggest(&self, cursor: &mut Cursor<'_>, out: &mut Vec<String>) {
        let partial = cursor.next().unwrap_or("");
        out.extend(self.complete(partial));
    }
}

impl fmt::Debug for ValueElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueElement")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Collection matching: enumerates candidate completions of the current
/// token and accepts every candidate the wrapped element parses.
///
/// This is the engine's only backtracking point. Each candidate attempt
/// runs against a copied cursor from the same start position; the furthest
/// position any successful attempt reached is committed. When no candidate
/// advances the cursor and at least one attempt raised, the most recently
/// raised error is re-raised — iteration order, not rank, picks it.
#[derive(Debug)]
pub struct MultiElement {
    inner: ValueElement,
}

impl MultiElement {
    /// Wrap a value element.
    pub fn new(inner: ValueElement) -> Self {
        Self { inner }
    }

    /// The wrapped value element.
    pub fn inner(&self) -> &ValueElement {
        &self.inner
    }

    /// Match the current token, backtracking across candidates.
    pub fn parse(&self, cursor: &mut Cursor<'_>, context: &mut Context) -> CommandResult<()> {
        if context.is_suggesting() {
            return self.parse_suggesting(cursor, context);
        }

        let start = cursor.pos();
        let Some(current) = cursor.peek() else {
            return Err(CommandError::mismatch(format!(
                "missing argument <{}>",
                self.inner.name()
            )));
        };

        let mut candidates = self.inner.complete(current);
        if candidates.is_empty() {
            candidates.push(current.to_string());
        }

        let mut furthest = start;
        let mut last_error = None;
        for candidate in &candidates {
            let mut attempt = *cursor;
            attempt.advance();
            match self.inner.parse_text(candidate, context) {
                Ok(()) => furthest = furthest.max(attempt.pos()),
                Err(err) => {
                    trace!("candidate '{candidate}' rejected: {err}");
                    last_error = Some(err);
                }
            }
        }

        if furthest == start {
            // the most recently raised rejection wins, not the best ranked
            if let Some(err) = last_error {
                return Err(err);
            }
        }
        cursor.set_pos(furthest);
        Ok(())
    }

    fn parse_suggesting(&self, cursor: &mut Cursor<'_>, context: &mut Context) -> CommandResult<()> {
        match self.inner.parse(cursor, context) {
            Ok(()) => Ok(()),
            Err(err) => {
                // a failure on the final, still-in-progress token must
                // surface so completion stops at this element
                if cursor.remaining() <= 1 {
                    Err(err)
                } else {
                    cursor.advance();
                    Ok(())
                }
            }
        }
    }
}

/// Repeats the wrapped element until the input is exhausted or the next
/// token is one of the terminator strings (flag triggers are never
/// consumed here). Zero matches is success.
#[derive(Debug)]
pub struct VarargElement {
    inner: ValueElement,
    terminators: Vec<String>,
}

impl VarargElement {
    /// Wrap a value element with the given terminator tokens.
    pub fn new(inner: ValueElement, terminators: Vec<String>) -> Self {
        Self { inner, terminators }
    }

    /// The wrapped value element.
    pub fn inner(&self) -> &ValueElement {
        &self.inner
    }

    /// Consume values until exhaustion or a terminator.
    pub fn parse(&self, cursor: &mut Cursor<'_>, context: &mut Context) -> CommandResult<()> {
        while let Some(token) = cursor.peek() {
            if self.terminators.iter().any(|t| t == token) {
                break;
            }
            self.inner.parse(cursor, context)?;
        }
        Ok(())
    }

    /// Complete repeatedly until the input is exhausted.
    pub fn suggest(&self, cursor: &mut Cursor<'_>, out: &mut Vec<String>) {
        loop {
            self.inner.suggest(cursor, out);
            if !cursor.has_next() {
                break;
            }
        }
    }
}

/// Consumes every remaining token and commits them joined by a separator.
#[derive(Debug, Clone)]
pub struct JoinElement {
    id: String,
    name: String,
    separator: String,
}

impl JoinElement {
    /// Build a join element committing under `id`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            separator: separator.into(),
        }
    }

    /// The placeholder name from the grammar string.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Join the remaining tokens; at least one is required.
    pub fn parse(&self, cursor: &mut Cursor<'_>, context: &mut Context) -> CommandResult<()> {
        if !cursor.has_next() {
            return Err(CommandError::mismatch(format!(
                "missing argument <{}>",
                self.name
            )));
        }
        let mut parts = Vec::new();
        while let Some(token) = cursor.next() {
            parts.push(token.to_string());
        }
        context.insert(&self.id, parts.join(&self.separator));
        Ok(())
    }

    /// Free text offers no candidates; the remaining input is consumed.
    pub fn suggest(&self, cursor: &mut Cursor<'_>) {
        while cursor.next().is_some() {}
    }
}

/// Matches one token against a fixed alias set, case-insensitively.
#[derive(Debug, Clone)]
pub struct NodeElement {
    aliases: Vec<String>,
}

impl NodeElement {
    /// Build a node for the given alias spellings.
    pub fn new(aliases: Vec<String>) -> Self {
        Self { aliases }
    }

    /// The alias spellings, in declared order.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn matches(&self, token: &str) -> bool {
        self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(token))
    }

    /// Consume exactly one matching token.
    pub fn parse(&self, cursor: &mut Cursor<'_>) -> CommandResult<()> {
        let checkpoint = cursor.pos();
        let Some(token) = cursor.next() else {
            return Err(CommandError::mismatch(format!(
                "expected '{}'",
                self.aliases.join("|")
            )));
        };
        if self.matches(token) {
            Ok(())
        } else {
            cursor.set_pos(checkpoint);
            Err(CommandError::mismatch(format!(
                "expected '{}', got '{token}'",
                self.aliases.join("|")
            )))
        }
    }

    /// Complete the current token against the alias set.
    pub fn suggest(&self, cursor: &mut Cursor<'_>, out: &mut Vec<String>) {
        let partial = cursor.next().unwrap_or("").to_ascii_lowercase();
        out.extend(
            self.aliases
                .iter()
                .filter(|alias| alias.to_ascii_lowercase().starts_with(&partial))
                .cloned(),
        );
    }
}

/// One declared flag: the key it commits under and, for valued flags, the
/// element parsing its value.
pub struct FlagEntry {
    id: String,
    value: Option<ValueElement>,
}

impl FlagEntry {
    /// A flag entry; `value` is `None` for boolean flags.
    pub fn new(id: impl Into<String>, value: Option<ValueElement>) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

impl fmt::Debug for FlagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagEntry")
            .field("id", &self.id)
            .field("valued", &self.value.is_some())
            .finish()
    }
}

/// The declared flags of one handler, keyed by their `-id` trigger.
///
/// Parsing consumes trigger tokens for as long as they appear; boolean
/// flags commit `true`, valued flags parse the following token. The first
/// non-trigger token ends the scan unconsumed. Flags are optional: an
/// empty scan is success.
#[derive(Debug)]
pub struct FlagElement {
    flags: IndexMap<String, FlagEntry>,
}

impl FlagElement {
    /// Build from a trigger table in declaration order.
    pub fn new(flags: IndexMap<String, FlagEntry>) -> Self {
        Self { flags }
    }

    /// The trigger spellings, in declaration order.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    /// Consume any flag tokens at the cursor.
    pub fn parse(&self, cursor: &mut Cursor<'_>, context: &mut Context) -> CommandResult<()> {
        while let Some(token) = cursor.peek() {
            let Some(entry) = self.flags.get(token) else {
                break;
            };
            cursor.advance();
            match &entry.value {
                None => context.insert(&entry.id, true),
                Some(value) => {
                    if !cursor.has_next() {
                        return Err(CommandError::mismatch(format!(
                            "flag {token} expects a value"
                        )));
                    }
                    value.parse(cursor, context)?;
                }
            }
        }
        Ok(())
    }

    /// Complete trigger spellings, or a valued flag's options when the
    /// previous token was its trigger.
    pub fn suggest(&self, cursor: &mut Cursor<'_>, out: &mut Vec<String>) {
        let mut previous: Option<&str> = None;
        let mut partial = "";
        while let Some(token) = cursor.next() {
            if cursor.has_next() {
                previous = Some(token);
            } else {
                partial = token;
            }
        }
        if let Some(entry) = previous.and_then(|p| self.flags.get(p)) {
            if let Some(value) = &entry.value {
                out.extend(value.complete(partial));
                return;
            }
        }
        out.extend(
            self.flags
                .keys()
                .filter(|trigger| trigger.starts_with(partial))
                .cloned(),
        );
    }

    fn usage(&self) -> String {
        self.flags
            .iter()
            .map(|(trigger, entry)| match &entry.value {
                None => format!("[{trigger}]"),
                Some(_) => format!("[{trigger} <value>]"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
