use std::fmt;

use thiserror::Error;

use crate::{ast::Span, types::Type};

/// Longest literal text embedded in an error message.
pub const MAX_LITERAL_DISPLAY_LENGTH: usize = 60;

/// Truncates `text` to [`MAX_LITERAL_DISPLAY_LENGTH`] characters, marking
/// the cut with `...`.
pub fn truncate_literal(text: &str) -> String {
    if text.chars().count() <= MAX_LITERAL_DISPLAY_LENGTH {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_LITERAL_DISPLAY_LENGTH - 3).collect();
    format!("{cut}...")
}

/// Broad category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The statement can never be valid as written.
    Static,
    /// Legal in principle; this particular value failed.
    Dynamic,
    /// Caller misused the API.
    Misuse,
    Unimplemented,
    ResourceExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Column,
    Table,
    Function,
    TableValuedFunction,
    Type,
    Parameter,
    SystemVariable,
    Field,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameKind::Column => "Column",
            NameKind::Table => "Table",
            NameKind::Function => "Function",
            NameKind::TableValuedFunction => "Table-valued function",
            NameKind::Type => "Type",
            NameKind::Parameter => "Query parameter",
            NameKind::SystemVariable => "System variable",
            NameKind::Field => "Field",
        })
    }
}

fn unknown_name_message(kind: &NameKind, name: &str, suggestion: &Option<String>) -> String {
    let base = match kind {
        NameKind::Column => format!("Unrecognized name: {name}"),
        NameKind::Table => format!("Table not found: {name}"),
        NameKind::Function => format!("Function not found: {name}"),
        NameKind::TableValuedFunction => format!("Table-valued function not found: {name}"),
        NameKind::Type => format!("Type not found: {name}"),
        NameKind::Parameter => format!("Query parameter '{name}' not found"),
        NameKind::SystemVariable => format!("Unrecognized system variable: {name}"),
        NameKind::Field => format!("Field name {name} does not exist"),
    };
    match suggestion {
        Some(s) => format!("{base}; Did you mean {s}?"),
        None => base,
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    /// Generic static error.
    #[error("{message}")]
    Sql { message: String, location: Option<Span> },

    #[error("{}", unknown_name_message(.kind, .name, .suggestion))]
    UnknownName { kind: NameKind, name: String, suggestion: Option<String>, location: Option<Span> },

    #[error("{kind} name {name} is ambiguous")]
    AmbiguousName { kind: NameKind, name: String, location: Option<Span> },

    #[error("Unsupported cast from {} to {}", .from.debug_string(), .to.debug_string())]
    UnsupportedCast { from: Type, to: Type, location: Option<Span> },

    /// Evaluation failure of a specific value (bad format, overflow, ...).
    #[error("{message}")]
    Eval { message: String, location: Option<Span> },

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{message}")]
    Unimplemented { message: String, location: Option<Span> },

    #[error("Statement nesting exceeds the maximum depth of {max}")]
    NestingTooDeep { max: usize, location: Option<Span> },
}

impl AnalyzerError {
    pub fn sql(message: impl Into<String>) -> Self {
        AnalyzerError::Sql { message: message.into(), location: None }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        AnalyzerError::Eval { message: message.into(), location: None }
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        AnalyzerError::Unimplemented { message: message.into(), location: None }
    }

    pub fn unsupported_cast(from: &Type, to: &Type) -> Self {
        AnalyzerError::UnsupportedCast { from: from.clone(), to: to.clone(), location: None }
    }

    pub fn unknown(kind: NameKind, name: impl Into<String>, suggestion: Option<String>) -> Self {
        AnalyzerError::UnknownName { kind, name: name.into(), suggestion, location: None }
    }

    pub fn type_not_found(name: &str) -> Self {
        Self::unknown(NameKind::Type, name, None)
    }

    pub fn ambiguous(kind: NameKind, name: impl Into<String>) -> Self {
        AnalyzerError::AmbiguousName { kind, name: name.into(), location: None }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AnalyzerError::Sql { .. }
            | AnalyzerError::UnknownName { .. }
            | AnalyzerError::AmbiguousName { .. }
            | AnalyzerError::UnsupportedCast { .. } => ErrorClass::Static,
            AnalyzerError::Eval { .. } => ErrorClass::Dynamic,
            AnalyzerError::FailedPrecondition(_) | AnalyzerError::InvalidArgument(_) => ErrorClass::Misuse,
            AnalyzerError::Unimplemented { .. } => ErrorClass::Unimplemented,
            AnalyzerError::NestingTooDeep { .. } => ErrorClass::ResourceExhausted,
        }
    }

    pub fn location(&self) -> Option<Span> {
        match self {
            AnalyzerError::Sql { location, .. }
            | AnalyzerError::UnknownName { location, .. }
            | AnalyzerError::AmbiguousName { location, .. }
            | AnalyzerError::UnsupportedCast { location, .. }
            | AnalyzerError::Eval { location, .. }
            | AnalyzerError::Unimplemented { location, .. }
            | AnalyzerError::NestingTooDeep { location, .. } => *location,
            AnalyzerError::FailedPrecondition(_) | AnalyzerError::InvalidArgument(_) => None,
        }
    }

    /// Attaches `span` unless the error already points somewhere more
    /// precise. Misuse errors never carry a location.
    pub fn at(mut self, span: Span) -> Self {
        match &mut self {
            AnalyzerError::Sql { location, .. }
            | AnalyzerError::UnknownName { location, .. }
            | AnalyzerError::AmbiguousName { location, .. }
            | AnalyzerError::UnsupportedCast { location, .. }
            | AnalyzerError::Eval { location, .. }
            | AnalyzerError::Unimplemented { location, .. }
            | AnalyzerError::NestingTooDeep { location, .. } => {
                if location.is_none() {
                    *location = Some(span);
                }
            }
            AnalyzerError::FailedPrecondition(_) | AnalyzerError::InvalidArgument(_) => {}
        }
        self
    }

    /// `message [at line:column]` against the statement text.
    pub fn display_with_source(&self, sql: &str) -> String {
        match self.location() {
            Some(span) => {
                let (line, col) = span.line_col(sql);
                format!("{self} [at {line}:{col}]")
            }
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_literals() {
        let long = "x".repeat(100);
        let cut = truncate_literal(&long);
        assert_eq!(cut.chars().count(), MAX_LITERAL_DISPLAY_LENGTH);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_literal("short"), "short");
    }

    #[test]
    fn location_is_attached_once() {
        let err = AnalyzerError::sql("boom").at(Span::new(7, 8)).at(Span::new(0, 1));
        assert_eq!(err.location(), Some(Span::new(7, 8)));
        assert_eq!(err.display_with_source("SELECT x"), "boom [at 1:8]");
        assert_eq!(AnalyzerError::FailedPrecondition("p".into()).at(Span::new(0, 1)).location(), None);
    }

    #[test]
    fn classes_follow_variants() {
        assert_eq!(AnalyzerError::unsupported_cast(&Type::Bool, &Type::Date).class(), ErrorClass::Static);
        assert_eq!(AnalyzerError::eval("x").class(), ErrorClass::Dynamic);
        assert_eq!(
            AnalyzerError::unsupported_cast(&Type::Bool, &Type::Date).to_string(),
            "Unsupported cast from BOOL to DATE"
        );
        let err = AnalyzerError::unknown(NameKind::Column, "nme", Some("name".into()));
        assert_eq!(err.to_string(), "Unrecognized name: nme; Did you mean name?");
    }
}
