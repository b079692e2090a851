use serde::{Deserialize, Serialize};

/// Where a conversion between two kinds may happen without CAST syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastClass {
    Implicit,
    Explicit,
    /// Explicit, or implicit for a literal argument.
    ExplicitOrLiteral,
    /// Explicit, or implicit for a literal or query parameter argument.
    ExplicitOrLiteralOrParameter,
}

impl CastClass {
    pub fn supports_implicit_coercion(self) -> bool {
        self == CastClass::Implicit
    }

    pub fn supports_literal_coercion(self) -> bool {
        matches!(
            self,
            CastClass::Implicit | CastClass::ExplicitOrLiteral | CastClass::ExplicitOrLiteralOrParameter
        )
    }

    pub fn supports_parameter_coercion(self) -> bool {
        matches!(self, CastClass::Implicit | CastClass::ExplicitOrLiteralOrParameter)
    }

    pub fn supports_explicit_cast(self) -> bool {
        true
    }
}

/// One cell of the cast lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastEntry {
    pub class: CastClass,
    /// Opaque ranking; lower means a narrower, preferable coercion.
    pub cost: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_per_class() {
        use CastClass::*;
        let rows = [
            (Implicit, true, true, true),
            (Explicit, false, false, false),
            (ExplicitOrLiteral, false, true, false),
            (ExplicitOrLiteralOrParameter, false, true, true),
        ];
        for (class, implicit, literal, parameter) in rows {
            assert_eq!(class.supports_implicit_coercion(), implicit, "{class:?}");
            assert_eq!(class.supports_literal_coercion(), literal, "{class:?}");
            assert_eq!(class.supports_parameter_coercion(), parameter, "{class:?}");
            assert!(class.supports_explicit_cast());
        }
    }
}
