use chrono::{FixedOffset, Offset, Utc};
use indexmap::IndexMap;

use crate::types::{LanguageOptions, Type};

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

/// Per-session analyzer configuration. Read-only while a statement is being
/// analyzed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    pub language: LanguageOptions,
    pub default_time_zone: FixedOffset,
    /// Declared named parameters, keyed by lowercased name.
    pub query_parameters: IndexMap<String, Type>,
    pub positional_parameters: Vec<Type>,
    /// Accept parameters that were not declared and infer their types.
    pub allow_undeclared_parameters: bool,
    /// `@@name` variables, keyed by lowercased dotted path.
    pub system_variables: IndexMap<String, Type>,
    pub prune_unused_columns: bool,
    pub max_nesting_depth: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            language: LanguageOptions::default(),
            default_time_zone: Utc.fix(),
            query_parameters: IndexMap::new(),
            positional_parameters: Vec::new(),
            allow_undeclared_parameters: false,
            system_variables: IndexMap::new(),
            prune_unused_columns: true,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl AnalyzerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(language: LanguageOptions) -> Self {
        Self { language, ..Self::default() }
    }

    pub fn time_zone(mut self, zone: FixedOffset) -> Self {
        self.default_time_zone = zone;
        self
    }

    pub fn parameter(mut self, name: &str, ty: Type) -> Self {
        self.query_parameters.insert(name.to_lowercase(), ty);
        self
    }

    pub fn positional_parameter(mut self, ty: Type) -> Self {
        self.positional_parameters.push(ty);
        self
    }

    pub fn undeclared_parameters(mut self) -> Self {
        self.allow_undeclared_parameters = true;
        self
    }

    pub fn system_variable(mut self, path: &str, ty: Type) -> Self {
        self.system_variables.insert(path.to_lowercase(), ty);
        self
    }

    pub fn without_pruning(mut self) -> Self {
        self.prune_unused_columns = false;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = AnalyzerOptions::new();
        assert_eq!(opts.default_time_zone.local_minus_utc(), 0);
        assert!(opts.prune_unused_columns);
        assert_eq!(opts.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn parameter_names_are_case_insensitive() {
        let opts = AnalyzerOptions::new().parameter("UserId", Type::Int64).system_variable("Time_Zone", Type::String);
        assert_eq!(opts.query_parameters.get("userid"), Some(&Type::Int64));
        assert!(opts.system_variables.contains_key("time_zone"));
    }
}
