use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    analyzer::{AnalyzerError, NameKind, NameList, is_internal_name},
    resolved::ResolvedColumn,
    types::Type,
};

#[derive(Debug, Clone, PartialEq)]
pub enum NameTarget {
    RangeVariable(Arc<NameList>),
    Column(ResolvedColumn),
    /// Bound more than once; referencing it is an error.
    Ambiguous,
    /// Argument of a standalone expression.
    FunctionArgument(Type),
}

#[derive(Debug, Clone, Copy)]
pub struct ScopeLookup<'s> {
    pub target: &'s NameTarget,
    /// Number of subquery boundaries crossed to reach the binding; non-zero
    /// means the reference is correlated.
    pub correlation_depth: usize,
}

/// Case-insensitive name bindings for one query level, chained to the
/// enclosing scopes. Scopes are built, then only read.
#[derive(Debug)]
pub struct NameScope<'p> {
    parent: Option<&'p NameScope<'p>>,
    names: IndexMap<String, NameTarget>,
    /// Lookups that leave this scope cross into an enclosing query.
    correlation_boundary: bool,
    allow_duplicates: bool,
    strict: bool,
}

impl NameScope<'static> {
    pub fn root() -> Self {
        Self { parent: None, names: IndexMap::new(), correlation_boundary: false, allow_duplicates: false, strict: false }
    }
}

impl<'p> NameScope<'p> {
    /// A scope in the same query as `parent`.
    pub fn child(parent: &'p NameScope<'p>) -> Self {
        Self {
            parent: Some(parent),
            names: IndexMap::new(),
            correlation_boundary: false,
            allow_duplicates: parent.allow_duplicates,
            strict: parent.strict,
        }
    }

    /// The outermost scope of a subquery expression nested in `parent`.
    pub fn subquery(parent: &'p NameScope<'p>) -> Self {
        Self { correlation_boundary: true, ..Self::child(parent) }
    }

    pub fn with_rules(mut self, allow_duplicates: bool, strict: bool) -> Self {
        self.allow_duplicates = allow_duplicates;
        self.strict = strict;
        self
    }

    /// Binds `name`, failing if this scope already binds it to something
    /// else (unless duplicates are allowed, which makes it ambiguous).
    pub fn bind(&mut self, name: &str, target: NameTarget) -> Result<(), AnalyzerError> {
        let key = name.to_lowercase();
        match self.names.get(&key) {
            Some(existing) if *existing == target => Ok(()),
            Some(existing) => {
                if self.allow_duplicates {
                    self.names.insert(key, NameTarget::Ambiguous);
                    Ok(())
                } else {
                    let kind = match existing {
                        NameTarget::RangeVariable(_) => NameKind::Table,
                        _ => NameKind::Column,
                    };
                    Err(AnalyzerError::ambiguous(kind, name))
                }
            }
            None => {
                self.names.insert(key, target);
                Ok(())
            }
        }
    }

    /// Binds a column exposed implicitly by a FROM item. Clashes never
    /// fail here; they surface as ambiguity when the name is used.
    pub fn bind_implicit(&mut self, name: &str, column: &ResolvedColumn) {
        if is_internal_name(name) {
            return;
        }
        let key = name.to_lowercase();
        let merged = match self.names.get(&key) {
            None => NameTarget::Column(column.clone()),
            Some(NameTarget::Column(existing)) if existing.id == column.id => return,
            Some(NameTarget::RangeVariable(_)) if !self.strict => return,
            Some(_) => NameTarget::Ambiguous,
        };
        self.names.insert(key, merged);
    }

    /// Range variables bind strictly, columns implicitly.
    pub fn add_name_list(&mut self, list: &NameList) -> Result<(), AnalyzerError> {
        for (alias, vars) in list.range_variables() {
            self.bind(alias, NameTarget::RangeVariable(Arc::clone(vars)))?;
        }
        for c in list.columns() {
            self.bind_implicit(&c.name, &c.column);
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<ScopeLookup<'_>> {
        let key = name.to_lowercase();
        let mut scope = self;
        let mut correlation_depth = 0;
        loop {
            if let Some(target) = scope.names.get(&key) {
                return Some(ScopeLookup { target, correlation_depth });
            }
            if scope.correlation_boundary {
                correlation_depth += 1;
            }
            scope = scope.parent?;
        }
    }

    /// Every name visible from this scope, innermost first.
    pub fn visible_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut scope = Some(self);
        while let Some(s) = scope {
            names.extend(s.names.keys().map(String::as_str));
            scope = s.parent;
        }
        names
    }
}
