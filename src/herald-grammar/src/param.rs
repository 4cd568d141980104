//! Formal parameter descriptors.

use crate::types::TypeHandle;

/// Variant of a formal handler parameter.
///
/// Each variant carries a fixed priority used only for canonical overload
/// ordering; it never affects whether an individual element matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A literal grammar position; binds no value.
    Node,
    /// The invoking actor, injected rather than parsed.
    Source,
    /// An ordered multi-value collection matched from one token.
    Any,
    /// A single parsed value.
    One,
    /// The remaining tokens joined by a separator into one string.
    Join,
    /// A repeated value consuming tokens until exhaustion or a flag trigger.
    Vararg,
    /// A named boolean or valued flag.
    Flag,
}

impl ParamKind {
    /// The ordering weight of elements produced from this kind.
    pub fn priority(self) -> u8 {
        match self {
            ParamKind::Node | ParamKind::Source => 0,
            ParamKind::Any | ParamKind::One => 1,
            ParamKind::Join => 2,
            ParamKind::Vararg => 3,
            ParamKind::Flag => 4,
        }
    }
}

/// One formal parameter of a compiled handler.
///
/// Ids are generated per occurrence of a type within one handler's
/// parameter list, so repeated types stay distinct; flag parameters use the
/// declared flag id verbatim.
#[derive(Debug, Clone)]
pub struct Param {
    /// Key the parsed value is committed under.
    pub id: String,
    /// The declared value type.
    pub ty: TypeHandle,
    /// The parameter variant.
    pub kind: ParamKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities() {
        assert_eq!(ParamKind::Node.priority(), 0);
        assert_eq!(ParamKind::Source.priority(), 0);
        assert_eq!(ParamKind::Any.priority(), 1);
        assert_eq!(ParamKind::One.priority(), 1);
        assert_eq!(ParamKind::Join.priority(), 2);
        assert_eq!(ParamKind::Vararg.priority(), 3);
        assert_eq!(ParamKind::Flag.priority(), 4);
    }
}
