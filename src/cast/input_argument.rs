use crate::{
    cast::ConversionSourceKind,
    types::{Type, Value},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentKind {
    /// Constant with a known value (possibly a typed NULL).
    Literal(Value),
    /// Bare `NULL` with no type of its own.
    UntypedNull,
    Parameter { untyped: bool },
    Expression,
}

/// What the coercer knows about an argument: its type plus where it comes
/// from. Literals and parameters coerce more freely than expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct InputArgument {
    pub ty: Type,
    pub kind: ArgumentKind,
}

impl InputArgument {
    pub fn literal(value: Value) -> Self {
        Self { ty: value.ty().clone(), kind: ArgumentKind::Literal(value) }
    }

    /// Untyped NULLs default to INT64 when nothing forces another type.
    pub fn untyped_null() -> Self {
        Self { ty: Type::Int64, kind: ArgumentKind::UntypedNull }
    }

    pub fn parameter(ty: Type) -> Self {
        Self { ty, kind: ArgumentKind::Parameter { untyped: false } }
    }

    pub fn untyped_parameter() -> Self {
        Self { ty: Type::Int64, kind: ArgumentKind::Parameter { untyped: true } }
    }

    pub fn expression(ty: Type) -> Self {
        Self { ty, kind: ArgumentKind::Expression }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ArgumentKind::Literal(_) | ArgumentKind::UntypedNull)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self.kind, ArgumentKind::UntypedNull | ArgumentKind::Parameter { untyped: true })
    }

    pub fn literal_value(&self) -> Option<&Value> {
        match &self.kind {
            ArgumentKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn source_kind(&self) -> ConversionSourceKind {
        match self.kind {
            ArgumentKind::Literal(_) | ArgumentKind::UntypedNull => ConversionSourceKind::Literal,
            ArgumentKind::Parameter { .. } => ConversionSourceKind::Parameter,
            ArgumentKind::Expression => ConversionSourceKind::Other,
        }
    }

    /// Same provenance, narrowed to one child (array element or struct
    /// field) of type `ty`.
    pub fn child(&self, ty: &Type, value: Option<&Value>) -> InputArgument {
        match &self.kind {
            ArgumentKind::Literal(_) => match value {
                Some(v) => InputArgument::literal(v.clone()),
                None => InputArgument::literal(Value::null(ty.clone())),
            },
            ArgumentKind::UntypedNull => InputArgument::untyped_null(),
            ArgumentKind::Parameter { untyped } => InputArgument { ty: ty.clone(), kind: ArgumentKind::Parameter { untyped: *untyped } },
            ArgumentKind::Expression => InputArgument::expression(ty.clone()),
        }
    }
}
