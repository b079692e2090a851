use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::{
    cast::{CastClass, CastEntry},
    types::TypeKind,
};

pub type CastTable = HashMap<(TypeKind, TypeKind), CastEntry>;

static CAST_TABLE: Lazy<CastTable> = Lazy::new(build_cast_table);

fn build_cast_table() -> CastTable {
    use CastClass::*;
    use TypeKind::*;

    let rows: &[(TypeKind, TypeKind, CastClass)] = &[
        (Bool, Int32, Explicit),
        (Bool, Int64, Explicit),
        (Bool, Uint32, Explicit),
        (Bool, Uint64, Explicit),
        (Bool, String, Explicit),

        (Int32, Bool, Explicit),
        (Int32, Int64, Implicit),
        (Int32, Uint32, ExplicitOrLiteral),
        (Int32, Uint64, ExplicitOrLiteral),
        (Int32, Float, ExplicitOrLiteral),
        (Int32, Double, Implicit),
        (Int32, String, Explicit),
        (Int32, Enum, ExplicitOrLiteralOrParameter),
        (Int32, Numeric, Implicit),
        (Int32, BigNumeric, Implicit),

        (Int64, Bool, Explicit),
        (Int64, Int32, ExplicitOrLiteral),
        (Int64, Uint32, ExplicitOrLiteral),
        (Int64, Uint64, ExplicitOrLiteral),
        (Int64, Float, ExplicitOrLiteral),
        (Int64, Double, Implicit),
        (Int64, String, Explicit),
        (Int64, Enum, ExplicitOrLiteralOrParameter),
        (Int64, Numeric, Implicit),
        (Int64, BigNumeric, Implicit),

        (Uint32, Bool, Explicit),
        (Uint32, Int32, ExplicitOrLiteral),
        (Uint32, Int64, Implicit),
        (Uint32, Uint64, Implicit),
        (Uint32, Float, ExplicitOrLiteral),
        (Uint32, Double, Implicit),
        (Uint32, String, Explicit),
        (Uint32, Enum, ExplicitOrLiteral),
        (Uint32, Numeric, Implicit),
        (Uint32, BigNumeric, Implicit),

        (Uint64, Bool, Explicit),
        (Uint64, Int32, ExplicitOrLiteral),
        (Uint64, Int64, ExplicitOrLiteral),
        (Uint64, Uint32, ExplicitOrLiteral),
        (Uint64, Float, ExplicitOrLiteral),
        (Uint64, Double, Implicit),
        (Uint64, String, Explicit),
        (Uint64, Enum, ExplicitOrLiteral),
        (Uint64, Numeric, Implicit),
        (Uint64, BigNumeric, Implicit),

        (Numeric, Int32, Explicit),
        (Numeric, Int64, Explicit),
        (Numeric, Uint32, Explicit),
        (Numeric, Uint64, Explicit),
        (Numeric, Float, Explicit),
        (Numeric, Double, Implicit),
        (Numeric, String, Explicit),
        (Numeric, BigNumeric, Implicit),

        (BigNumeric, Int32, Explicit),
        (BigNumeric, Int64, Explicit),
        (BigNumeric, Uint32, Explicit),
        (BigNumeric, Uint64, Explicit),
        (BigNumeric, Float, Explicit),
        (BigNumeric, Double, Implicit),
        (BigNumeric, String, Explicit),
        (BigNumeric, Numeric, Explicit),

        (Float, Int32, Explicit),
        (Float, Int64, Explicit),
        (Float, Uint32, Explicit),
        (Float, Uint64, Explicit),
        (Float, Double, Implicit),
        (Float, String, Explicit),
        (Float, Numeric, Explicit),
        (Float, BigNumeric, Explicit),

        (Double, Int32, Explicit),
        (Double, Int64, Explicit),
        (Double, Uint32, Explicit),
        (Double, Uint64, Explicit),
        (Double, Float, ExplicitOrLiteral),
        (Double, String, Explicit),
        (Double, Numeric, ExplicitOrLiteral),
        (Double, BigNumeric, ExplicitOrLiteral),

        (String, Int32, Explicit),
        (String, Int64, Explicit),
        (String, Uint32, Explicit),
        (String, Uint64, Explicit),
        (String, Float, Explicit),
        (String, Double, Explicit),
        (String, Bytes, Explicit),
        (String, Date, ExplicitOrLiteralOrParameter),
        (String, Timestamp, ExplicitOrLiteralOrParameter),
        (String, Time, ExplicitOrLiteralOrParameter),
        (String, Datetime, ExplicitOrLiteralOrParameter),
        (String, Enum, ExplicitOrLiteralOrParameter),
        (String, Proto, ExplicitOrLiteralOrParameter),
        (String, Bool, Explicit),
        (String, Numeric, Explicit),
        (String, BigNumeric, Explicit),
        (String, Json, Explicit),

        (Bytes, String, Explicit),
        (Bytes, Proto, ExplicitOrLiteralOrParameter),

        (Date, Datetime, Implicit),
        (Date, Timestamp, Explicit),
        (Date, String, Explicit),

        (Timestamp, Date, Explicit),
        (Timestamp, Datetime, Explicit),
        (Timestamp, Time, Explicit),
        (Timestamp, String, Explicit),

        (Time, String, Explicit),

        (Datetime, Date, Explicit),
        (Datetime, String, Explicit),
        (Datetime, Time, Explicit),
        (Datetime, Timestamp, Explicit),

        (Json, String, Explicit),

        (Enum, String, Explicit),
        (Enum, Int32, Explicit),
        (Enum, Int64, Explicit),
        (Enum, Uint32, Explicit),
        (Enum, Uint64, Explicit),

        (Proto, String, Explicit),
        (Proto, Bytes, Explicit),
    ];

    let mut table = CastTable::with_capacity(rows.len() + TypeKind::ALL.len());
    // every kind casts to itself
    for kind in TypeKind::ALL {
        table.insert((kind, kind), CastEntry { class: Implicit, cost: 0 });
    }
    for &(from, to, class) in rows {
        table
            .entry((from, to))
            .or_insert(CastEntry { class, cost: TypeKind::coercion_cost(to, from) });
    }
    debug!(entries = table.len(), "cast table initialized");
    table
}

/// Legality of a cast between two kinds; `None` means no value of `from`
/// can ever become a `to`.
pub fn classify(from: TypeKind, to: TypeKind) -> Option<CastEntry> {
    CAST_TABLE.get(&(from, to)).copied()
}

/// The whole lattice, for enumeration.
pub fn cast_table() -> &'static CastTable {
    &CAST_TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_implicit_for_every_kind() {
        for kind in TypeKind::ALL {
            let entry = classify(kind, kind).unwrap();
            assert_eq!(entry.class, CastClass::Implicit);
            assert_eq!(entry.cost, 0);
        }
    }

    #[test]
    fn table_is_directional() {
        assert_eq!(classify(TypeKind::Int32, TypeKind::Int64).unwrap().class, CastClass::Implicit);
        assert_eq!(classify(TypeKind::Int64, TypeKind::Int32).unwrap().class, CastClass::ExplicitOrLiteral);
        assert_eq!(classify(TypeKind::Double, TypeKind::Int64).unwrap().class, CastClass::Explicit);
        assert!(classify(TypeKind::Bool, TypeKind::Date).is_none());
        assert!(classify(TypeKind::Json, TypeKind::Bytes).is_none());
        assert!(classify(TypeKind::Array, TypeKind::Struct).is_none());
    }

    #[test]
    fn narrower_coercions_cost_less() {
        let to_int64 = classify(TypeKind::Int32, TypeKind::Int64).unwrap().cost;
        let to_double = classify(TypeKind::Int32, TypeKind::Double).unwrap().cost;
        assert!(to_int64 < to_double);
        assert_eq!(cast_table().len(), TypeKind::ALL.len() + 116);
    }
}
