use std::{fmt, sync::Arc};

use crate::types::{EnumType, ProtoType, StructField, StructType, TypeKind};

/// Type outside the built-in lattice; casts to and from it go through a
/// catalog conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedType {
    pub name: String,
}

impl ExtendedType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A SQL type. Structured children are shared behind `Arc`, so clones are
/// cheap; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    Numeric,
    BigNumeric,
    String,
    Bytes,
    Date,
    Timestamp,
    Time,
    Datetime,
    Json,
    Enum(Arc<EnumType>),
    Proto(Arc<ProtoType>),
    Array(Arc<Type>),
    Struct(Arc<StructType>),
    Extended(Arc<ExtendedType>),
}

impl Type {
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Bool => TypeKind::Bool,
            Type::Int32 => TypeKind::Int32,
            Type::Int64 => TypeKind::Int64,
            Type::Uint32 => TypeKind::Uint32,
            Type::Uint64 => TypeKind::Uint64,
            Type::Float => TypeKind::Float,
            Type::Double => TypeKind::Double,
            Type::Numeric => TypeKind::Numeric,
            Type::BigNumeric => TypeKind::BigNumeric,
            Type::String => TypeKind::String,
            Type::Bytes => TypeKind::Bytes,
            Type::Date => TypeKind::Date,
            Type::Timestamp => TypeKind::Timestamp,
            Type::Time => TypeKind::Time,
            Type::Datetime => TypeKind::Datetime,
            Type::Json => TypeKind::Json,
            Type::Enum(_) => TypeKind::Enum,
            Type::Proto(_) => TypeKind::Proto,
            Type::Array(_) => TypeKind::Array,
            Type::Struct(_) => TypeKind::Struct,
            Type::Extended(_) => TypeKind::Extended,
        }
    }

    /// The type for a simple kind, `None` for structured kinds.
    pub fn simple(kind: TypeKind) -> Option<Type> {
        let ty = match kind {
            TypeKind::Bool => Type::Bool,
            TypeKind::Int32 => Type::Int32,
            TypeKind::Int64 => Type::Int64,
            TypeKind::Uint32 => Type::Uint32,
            TypeKind::Uint64 => Type::Uint64,
            TypeKind::Float => Type::Float,
            TypeKind::Double => Type::Double,
            TypeKind::Numeric => Type::Numeric,
            TypeKind::BigNumeric => Type::BigNumeric,
            TypeKind::String => Type::String,
            TypeKind::Bytes => Type::Bytes,
            TypeKind::Date => Type::Date,
            TypeKind::Timestamp => Type::Timestamp,
            TypeKind::Time => Type::Time,
            TypeKind::Datetime => Type::Datetime,
            TypeKind::Json => Type::Json,
            TypeKind::Enum | TypeKind::Proto | TypeKind::Array | TypeKind::Struct | TypeKind::Extended => {
                return None;
            }
        };
        Some(ty)
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Arc::new(element))
    }

    pub fn struct_of(fields: Vec<StructField>) -> Type {
        Type::Struct(Arc::new(StructType::new(fields)))
    }

    pub fn enum_of(def: EnumType) -> Type {
        Type::Enum(Arc::new(def))
    }

    pub fn proto_of(def: ProtoType) -> Type {
        Type::Proto(Arc::new(def))
    }

    pub fn extended(name: impl Into<String>) -> Type {
        Type::Extended(Arc::new(ExtendedType::new(name)))
    }

    pub fn is_simple(&self) -> bool {
        self.kind().is_simple()
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            Type::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_proto(&self) -> Option<&ProtoType> {
        match self {
            Type::Proto(p) => Some(p),
            _ => None,
        }
    }

    /// Looser than `==`: enums and protos only compare by name, arrays and
    /// structs compare children by equivalence and ignore field names.
    pub fn equivalent(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Enum(a), Type::Enum(b)) => a.name == b.name,
            (Type::Proto(a), Type::Proto(b)) => a.name == b.name,
            (Type::Array(a), Type::Array(b)) => a.equivalent(b),
            (Type::Struct(a), Type::Struct(b)) => {
                a.num_fields() == b.num_fields()
                    && a.fields.iter().zip(b.fields.iter()).all(|(x, y)| x.ty.equivalent(&y.ty))
            }
            _ => self == other,
        }
    }

    /// GROUP BY, DISTINCT and set operations other than UNION ALL.
    pub fn supports_grouping(&self) -> bool {
        match self {
            Type::Json | Type::Proto(_) | Type::Extended(_) => false,
            Type::Array(e) => e.supports_grouping(),
            Type::Struct(s) => s.fields.iter().all(|f| f.ty.supports_grouping()),
            _ => true,
        }
    }

    /// `=`, `!=` and `IN`.
    pub fn supports_equality(&self) -> bool {
        match self {
            Type::Json | Type::Proto(_) | Type::Extended(_) | Type::Array(_) => false,
            Type::Struct(s) => s.fields.iter().all(|f| f.ty.supports_equality()),
            _ => true,
        }
    }

    pub fn supports_ordering(&self) -> bool {
        match self {
            Type::Json | Type::Proto(_) | Type::Extended(_) | Type::Struct(_) => false,
            Type::Array(_) => false,
            _ => true,
        }
    }

    pub fn debug_string(&self) -> String {
        match self {
            Type::Enum(e) => format!("ENUM<{}>", e.name),
            Type::Proto(p) => format!("PROTO<{}>", p.name),
            Type::Array(e) => format!("ARRAY<{}>", e.debug_string()),
            Type::Struct(s) => {
                let fields: Vec<String> = s
                    .fields
                    .iter()
                    .map(|f| match &f.name {
                        Some(n) => format!("{} {}", n, f.ty.debug_string()),
                        None => f.ty.debug_string(),
                    })
                    .collect();
                format!("STRUCT<{}>", fields.join(", "))
            }
            Type::Extended(x) => x.name.clone(),
            simple => simple.kind().sql_name().to_string(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(values: &[(&str, i32)]) -> Type {
        Type::enum_of(EnumType::new("color", values))
    }

    #[test]
    fn debug_string_renders_nested_types() {
        let ty = Type::array(Type::struct_of(vec![
            StructField::named("a", Type::Int64),
            StructField::anonymous(Type::String),
        ]));
        assert_eq!(ty.debug_string(), "ARRAY<STRUCT<a INT64, STRING>>");
        assert_eq!(color(&[]).to_string(), "ENUM<color>");
    }

    #[test]
    fn equivalence_is_looser_than_equality() {
        let a = color(&[("RED", 0)]);
        let b = color(&[("RED", 0), ("BLUE", 1)]);
        assert_ne!(a, b);
        assert!(a.equivalent(&b));
        assert!(Type::array(a.clone()).equivalent(&Type::array(b)));
        assert!(!a.equivalent(&Type::Int32));
    }

    #[test]
    fn simple_kinds_map_to_types() {
        for kind in TypeKind::ALL {
            match Type::simple(kind) {
                Some(ty) => assert_eq!(ty.kind(), kind),
                None => assert!(!kind.is_simple()),
            }
        }
    }

    #[test]
    fn comparison_capabilities() {
        let st = Type::struct_of(vec![StructField::named("a", Type::Double)]);
        assert!(st.supports_equality());
        assert!(st.supports_grouping());
        assert!(!st.supports_ordering());
        assert!(!Type::array(Type::Int64).supports_equality());
        assert!(Type::array(Type::Int64).supports_grouping());
        assert!(!Type::Json.supports_grouping());
        assert!(Type::Double.supports_ordering());
    }
}
