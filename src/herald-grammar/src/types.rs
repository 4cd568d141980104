//! Pluggable per-type parse and completion behavior.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::context::BoxedValue;
use crate::element::Element;

/// Parses raw input text into a type-erased value.
pub type ParseFn = Arc<dyn Fn(&str) -> Result<BoxedValue, String> + Send + Sync>;

/// Produces the enumerated valid spellings of a type, computed at
/// suggestion time.
pub type OptionsFn = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Narrows candidate spellings against a partial token.
pub type FilterFn = Arc<dyn Fn(&[String], &str) -> Vec<String> + Send + Sync>;

/// Builds a custom element for a type, overriding the generic value element.
pub type ProviderFn = Arc<dyn Fn(&ElementSeed, &TypeRegistry) -> Element + Send + Sync>;

/// The inputs a provider receives to build its element.
#[derive(Debug, Clone)]
pub struct ElementSeed {
    /// Key the element commits values under.
    pub id: String,
    /// The placeholder name from the grammar string.
    pub name: String,
    /// The declared value type.
    pub ty: TypeHandle,
    /// Ordering weight inherited from the parameter kind.
    pub priority: u8,
}

/// Identifies a value type in registry lookups and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    /// The handle for `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name: full.rsplit("::").next().unwrap_or(full),
        }
    }

    /// The underlying type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The short type name, used in generated parameter ids and messages.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Per-type behavior tables consulted when compiling and matching elements.
///
/// Four independent maps (parser, options, filter, provider) are keyed by
/// [`TypeId`]; lookups try the exact type first and then each entry of its
/// registered fallback chain in declared order. The registry is populated
/// once and read-only afterwards, so compiled trees may share it across
/// threads without synchronization.
#[derive(Default)]
pub struct TypeRegistry {
    parsers: HashMap<TypeId, ParseFn>,
    options: HashMap<TypeId, OptionsFn>,
    filters: HashMap<TypeId, FilterFn>,
    providers: HashMap<TypeId, ProviderFn>,
    ancestors: HashMap<TypeId, Vec<TypeId>>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-seeded with parsers for strings, the common numeric
    /// widths, and booleans.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_parser::<String, _>(|raw| Ok(raw.to_string()));
        registry.register_parser::<i32, _>(parse_number::<i32>);
        registry.register_parser::<i64, _>(parse_number::<i64>);
        registry.register_parser::<u32, _>(parse_number::<u32>);
        registry.register_parser::<u64, _>(parse_number::<u64>);
        registry.register_parser::<f32, _>(parse_number::<f32>);
        registry.register_parser::<f64, _>(parse_number::<f64>);
        registry.register_parser::<bool, _>(|raw| match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(format!("'{raw}' is not one of true/false")),
        });
        registry.register_options::<bool>(vec!["true".to_string(), "false".to_string()]);
        registry
    }

    /// Register the parser for `T`.
    pub fn register_parser<T, F>(&mut self, parse: F)
    where
        T: Any + Send + Sync,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        let parser: ParseFn = Arc::new(move |raw| parse(raw).map(|v| Box::new(v) as BoxedValue));
        self.parsers.insert(TypeId::of::<T>(), parser);
    }

    /// Register a fixed options list for `T`.
    pub fn register_options<T: Any>(&mut self, options: Vec<String>) {
        self.options
            .insert(TypeId::of::<T>(), Arc::new(move || options.clone()));
    }

    /// Register an options producer for `T`, evaluated at suggestion time.
    pub fn register_options_with<T, F>(&mut self, options: F)
    where
        T: Any,
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.options.insert(TypeId::of::<T>(), Arc::new(options));
    }

    /// Register the candidate filter for `T`.
    pub fn register_filter<T, F>(&mut self, filter: F)
    where
        T: Any,
        F: Fn(&[String], &str) -> Vec<String> + Send + Sync + 'static,
    {
        self.filters.insert(TypeId::of::<T>(), Arc::new(filter));
    }

    /// Register a custom element constructor for `T`.
    pub fn register_provider<T, F>(&mut self, provider: F)
    where
        T: Any,
        F: Fn(&ElementSeed, &TypeRegistry) -> Element + Send + Sync + 'static,
    {
        self.providers.insert(TypeId::of::<T>(), Arc::new(provider));
    }

    /// Declare the fallback chain for `T`: the ordered type ids consulted
    /// when `T` itself has no entry in a lookup table.
    pub fn register_ancestors<T: Any + ?Sized>(&mut self, chain: Vec<TypeId>) {
        self.ancestors.insert(TypeId::of::<T>(), chain);
    }

    /// Register an enum type: options come from its declared variant names
    /// and the parser matches input against them.
    pub fn register_enum<T>(&mut self)
    where
        T: Any + Send + Sync + strum::VariantNames + FromStr,
        T::Err: std::fmt::Display,
    {
        let variants: Vec<String> = <T as strum::VariantNames>::VARIANTS
            .iter()
            .map(|v| (*v).to_string())
            .collect();
        self.register_options::<T>(variants);
        self.register_parser::<T, _>(|raw| raw.parse::<T>().map_err(|err| err.to_string()));
    }

    fn lookup<'v, V>(&'v self, map: &'v HashMap<TypeId, V>, ty: &TypeHandle) -> Option<&'v V> {
        if let Some(found) = map.get(&ty.id()) {
            return Some(found);
        }
        for ancestor in self.ancestors.get(&ty.id()).into_iter().flatten() {
            if let Some(found) = map.get(ancestor) {
                return Some(found);
            }
        }
        None
    }

    /// The parser for `ty`, or a parser that rejects everything when none
    /// is registered anywhere on the fallback chain.
    pub fn parser(&self, ty: &TypeHandle) -> ParseFn {
        self.lookup(&self.parsers, ty).cloned().unwrap_or_else(|| {
            let name = ty.name();
            Arc::new(move |_raw| Err(format!("no parser registered for {name}")))
        })
    }

    /// The options producer for `ty`, or an empty producer.
    pub fn options(&self, ty: &TypeHandle) -> OptionsFn {
        self.lookup(&self.options, ty)
            .cloned()
            .unwrap_or_else(|| Arc::new(Vec::new))
    }

    /// The candidate filter for `ty`, or the default prefix filter.
    pub fn filter(&self, ty: &TypeHandle) -> FilterFn {
        self.lookup(&self.filters, ty).cloned().unwrap_or_else(prefix_filter)
    }

    /// The custom element constructor for `ty`, when one is registered.
    pub fn provider(&self, ty: &TypeHandle) -> Option<ProviderFn> {
        self.lookup(&self.providers, ty).cloned()
    }
}

/// The default candidate filter: case-insensitive prefix match.
pub fn prefix_filter() -> FilterFn {
    Arc::new(|candidates, partial| {
        let partial = partial.to_lowercase();
        candidates
            .iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&partial))
            .cloned()
            .collect()
    })
}

fn parse_number<T: FromStr>(raw: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a valid number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parsers() {
        let registry = TypeRegistry::with_defaults();

        let parsed = registry.parser(&TypeHandle::of::<i64>())("42").unwrap();
        assert_eq!(parsed.downcast_ref::<i64>(), Some(&42));

        let err = registry.parser(&TypeHandle::of::<i64>())("forty").unwrap_err();
        assert!(err.contains("forty"));

        let parsed = registry.parser(&TypeHandle::of::<bool>())("TRUE").unwrap();
        assert_eq!(parsed.downcast_ref::<bool>(), Some(&true));
    }

    #[test]
    fn test_unregistered_type_rejects() {
        struct Unknown;
        let registry = TypeRegistry::with_defaults();

        let err = registry.parser(&TypeHandle::of::<Unknown>())("x").unwrap_err();
        assert!(err.contains("no parser registered"));
    }

    #[test]
    fn test_bool_options() {
        let registry = TypeRegistry::with_defaults();
        let options = registry.options(&TypeHandle::of::<bool>())();
        assert_eq!(options, vec!["true", "false"]);
    }

    #[test]
    fn test_prefix_filter_is_case_insensitive() {
        let filter = prefix_filter();
        let candidates = vec!["Apple".to_string(), "apricot".to_string(), "banana".to_string()];
        assert_eq!(filter(&candidates, "AP"), vec!["Apple", "apricot"]);
        assert_eq!(filter(&candidates, ""), candidates);
    }

    #[test]
    fn test_fallback_chain_resolves_ancestor() {
        struct Base;
        struct Derived;

        let mut registry = TypeRegistry::new();
        registry.register_parser::<Base, _>(|_raw| Ok(Base));
        registry.register_ancestors::<Derived>(vec![TypeId::of::<Base>()]);

        let parsed = registry.parser(&TypeHandle::of::<Derived>())("anything");
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_register_enum() {
        #[derive(Debug, PartialEq, strum::EnumString, strum::VariantNames)]
        #[strum(serialize_all = "lowercase", ascii_case_insensitive)]
        enum Mode {
            Survival,
            Creative,
        }

        let mut registry = TypeRegistry::new();
        registry.register_enum::<Mode>();

        let options = registry.options(&TypeHandle::of::<Mode>())();
        assert_eq!(options, vec!["survival", "creative"]);

        let parsed = registry.parser(&TypeHandle::of::<Mode>())("Creative").unwrap();
        assert_eq!(parsed.downcast_ref::<Mode>(), Some(&Mode::Creative));

        assert!(registry.parser(&TypeHandle::of::<Mode>())("spectator").is_err());
    }

    #[test]
    fn test_type_handle_short_name() {
        assert_eq!(TypeHandle::of::<i64>().name(), "i64");
        assert_eq!(TypeHandle::of::<String>().name(), "String");
    }
}
