use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of SQL types used as the key for cast and coercion
/// lookups.
///
/// Simple kinds map one-to-one onto a [`Type`](crate::types::Type); the
/// structured kinds (`Enum`, `Proto`, `Array`, `Struct`, `Extended`) need
/// the full type to be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeKind {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    /// Fixed scale decimal (9 fractional digits).
    Numeric,
    /// Wide decimal, full `rust_decimal` precision.
    BigNumeric,
    String,
    Bytes,
    Date,
    Timestamp,
    Time,
    Datetime,
    Json,
    Enum,
    /// Structured message with a field table (or opaque).
    Proto,
    Array,
    Struct,
    /// Opaque type outside the built-in lattice.
    Extended,
}

impl TypeKind {
    pub const ALL: [TypeKind; 21] = [
        TypeKind::Bool,
        TypeKind::Int32,
        TypeKind::Int64,
        TypeKind::Uint32,
        TypeKind::Uint64,
        TypeKind::Float,
        TypeKind::Double,
        TypeKind::Numeric,
        TypeKind::BigNumeric,
        TypeKind::String,
        TypeKind::Bytes,
        TypeKind::Date,
        TypeKind::Timestamp,
        TypeKind::Time,
        TypeKind::Datetime,
        TypeKind::Json,
        TypeKind::Enum,
        TypeKind::Proto,
        TypeKind::Array,
        TypeKind::Struct,
        TypeKind::Extended,
    ];

    /// Kinds whose type is fully described by the kind itself.
    pub fn is_simple(self) -> bool {
        !matches!(
            self,
            TypeKind::Enum | TypeKind::Proto | TypeKind::Array | TypeKind::Struct | TypeKind::Extended
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(self, TypeKind::Int32 | TypeKind::Int64 | TypeKind::Uint32 | TypeKind::Uint64)
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, TypeKind::Float | TypeKind::Double)
    }

    pub fn is_decimal(self) -> bool {
        matches!(self, TypeKind::Numeric | TypeKind::BigNumeric)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_floating_point() || self.is_decimal()
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, TypeKind::Date | TypeKind::Timestamp | TypeKind::Time | TypeKind::Datetime)
    }

    /// Position of the kind on the widening ladder used to rank coercions.
    ///
    /// Only the distance between two ranks is meaningful.
    pub fn specificity_rank(self) -> u32 {
        match self {
            TypeKind::Bool => 1,
            TypeKind::Int32 => 2,
            TypeKind::Uint32 => 3,
            TypeKind::Int64 => 4,
            TypeKind::Uint64 => 5,
            TypeKind::Float => 6,
            TypeKind::Double => 7,
            TypeKind::Numeric => 8,
            TypeKind::BigNumeric => 9,
            TypeKind::String => 10,
            TypeKind::Bytes => 11,
            TypeKind::Date => 12,
            TypeKind::Datetime => 13,
            TypeKind::Time => 14,
            TypeKind::Timestamp => 15,
            TypeKind::Json => 16,
            TypeKind::Enum => 17,
            TypeKind::Proto => 18,
            TypeKind::Array => 19,
            TypeKind::Struct => 20,
            TypeKind::Extended => 21,
        }
    }

    /// Cost of coercing a value of kind `from` into kind `to`.
    pub fn coercion_cost(to: TypeKind, from: TypeKind) -> u32 {
        to.specificity_rank().abs_diff(from.specificity_rank())
    }

    pub fn sql_name(self) -> &'static str {
        match self {
            TypeKind::Bool => "BOOL",
            TypeKind::Int32 => "INT32",
            TypeKind::Int64 => "INT64",
            TypeKind::Uint32 => "UINT32",
            TypeKind::Uint64 => "UINT64",
            TypeKind::Float => "FLOAT",
            TypeKind::Double => "DOUBLE",
            TypeKind::Numeric => "NUMERIC",
            TypeKind::BigNumeric => "BIGNUMERIC",
            TypeKind::String => "STRING",
            TypeKind::Bytes => "BYTES",
            TypeKind::Date => "DATE",
            TypeKind::Timestamp => "TIMESTAMP",
            TypeKind::Time => "TIME",
            TypeKind::Datetime => "DATETIME",
            TypeKind::Json => "JSON",
            TypeKind::Enum => "ENUM",
            TypeKind::Proto => "PROTO",
            TypeKind::Array => "ARRAY",
            TypeKind::Struct => "STRUCT",
            TypeKind::Extended => "EXTENDED",
        }
    }

    /// Parses a simple kind name (case-insensitive), accepting the usual
    /// aliases (`INT`, `FLOAT64`, `DECIMAL`, ...).
    pub fn from_simple_name(name: &str) -> Option<TypeKind> {
        let kind = match name.to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => TypeKind::Bool,
            "INT32" => TypeKind::Int32,
            "INT64" | "INT" | "INTEGER" | "BIGINT" => TypeKind::Int64,
            "UINT32" => TypeKind::Uint32,
            "UINT64" => TypeKind::Uint64,
            "FLOAT" | "FLOAT32" => TypeKind::Float,
            "DOUBLE" | "FLOAT64" => TypeKind::Double,
            "NUMERIC" | "DECIMAL" => TypeKind::Numeric,
            "BIGNUMERIC" | "BIGDECIMAL" => TypeKind::BigNumeric,
            "STRING" => TypeKind::String,
            "BYTES" => TypeKind::Bytes,
            "DATE" => TypeKind::Date,
            "TIMESTAMP" => TypeKind::Timestamp,
            "TIME" => TypeKind::Time,
            "DATETIME" => TypeKind::Datetime,
            "JSON" => TypeKind::Json,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_names_round_trip_through_sql_name() {
        for kind in TypeKind::ALL.iter().copied().filter(|k| k.is_simple()) {
            assert_eq!(TypeKind::from_simple_name(kind.sql_name()), Some(kind));
        }
        assert_eq!(TypeKind::from_simple_name("float64"), Some(TypeKind::Double));
        assert_eq!(TypeKind::from_simple_name("ARRAY"), None);
    }

    #[test]
    fn coercion_cost_is_symmetric_distance() {
        assert_eq!(TypeKind::coercion_cost(TypeKind::Int64, TypeKind::Int64), 0);
        assert!(TypeKind::coercion_cost(TypeKind::Int64, TypeKind::Int32)
            < TypeKind::coercion_cost(TypeKind::Double, TypeKind::Int32));
        assert!(TypeKind::coercion_cost(TypeKind::Double, TypeKind::Int64)
            < TypeKind::coercion_cost(TypeKind::Numeric, TypeKind::Int64));
    }
}
