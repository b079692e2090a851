use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::{
    analyzer::{
        AccessTracker, AnalyzerError, AnalyzerOptions, AnalyzerOutput, ColumnAllocator, CorrelatedColumns,
        ExprContext, ExprResolver, NameKind, NameScope, NameTarget, QueryResolutionInfo, StatementResolver,
        WithAliasStack,
    },
    ast::{Expr, Span, Statement},
    cast::Coercer,
    catalog::{Catalog, Function},
    resolved::{ParameterName, ResolvedColumn, ResolvedExpr},
    types::{LanguageFeature, LanguageOptions, ProductMode, Type, TypeKind},
};

const STACK_RED_ZONE: usize = 256 << 10;
const STACK_SEGMENT_SIZE: usize = 4 << 20;

/// Warnings and inferred parameter types gathered over a session.
#[derive(Debug, Default)]
pub struct Accumulator {
    pub deprecation_warnings: IndexSet<String>,
    pub undeclared_parameters: IndexMap<String, Type>,
    pub undeclared_positional_parameters: IndexMap<usize, Type>,
    untyped_parameters: IndexSet<ParameterName>,
}

/// State of one analysis session. Not shareable between threads; separate
/// sessions over the same catalog are independent.
pub struct AnalysisContext<'a> {
    pub catalog: &'a dyn Catalog,
    pub options: &'a AnalyzerOptions,
    pub columns: ColumnAllocator,
    pub with_aliases: WithAliasStack,
    pub access: AccessTracker,
    pub accumulator: Accumulator,
    /// One entry per subquery expression being resolved, innermost last.
    pub correlated: Vec<CorrelatedColumns>,
    /// One entry per SELECT block being resolved, innermost last.
    pub select_infos: Vec<QueryResolutionInfo>,
    depth: usize,
    query_names: usize,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(catalog: &'a dyn Catalog, options: &'a AnalyzerOptions) -> Self {
        Self {
            catalog,
            options,
            columns: ColumnAllocator::new(),
            with_aliases: WithAliasStack::new(),
            access: AccessTracker::new(),
            accumulator: Accumulator::default(),
            correlated: Vec::new(),
            select_infos: Vec::new(),
            depth: 0,
            query_names: 0,
        }
    }

    /// Resolves a statement and runs pruning and access stamping on the
    /// result.
    pub fn analyze_statement(
        statement: &Statement,
        options: &'a AnalyzerOptions,
        catalog: &'a dyn Catalog,
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        let kind = statement.kind_name();
        debug!(kind, catalog = catalog.name(), "analyzing statement");
        let mut ctx = Self::new(catalog, options);
        let root = ctx.root_scope();
        let mut resolved = StatementResolver::resolve(&mut ctx, statement, &root)?;
        if !ctx.with_aliases.is_empty() {
            return Err(AnalyzerError::FailedPrecondition("WITH aliases left visible after the statement".into()));
        }
        ctx.access.record_reads(&resolved);
        if options.prune_unused_columns {
            ctx.access.prune(&mut resolved);
        }
        ctx.access.stamp(&mut resolved);
        let output = ctx.finish(Some(resolved), None);
        debug!(
            kind,
            max_column_id = output.max_column_id,
            warnings = output.deprecation_warnings.len(),
            "statement analyzed"
        );
        Ok(output)
    }

    pub fn analyze_expression(
        expr: &Expr,
        options: &'a AnalyzerOptions,
        catalog: &'a dyn Catalog,
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        Self::analyze_expression_with_arguments(expr, &IndexMap::new(), options, catalog)
    }

    /// Resolves a standalone expression in which `arguments` are visible by
    /// name.
    pub fn analyze_expression_with_arguments(
        expr: &Expr,
        arguments: &IndexMap<String, Type>,
        options: &'a AnalyzerOptions,
        catalog: &'a dyn Catalog,
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        let mut ctx = Self::new(catalog, options);
        let root = ctx.root_scope();
        let mut scope = NameScope::child(&root);
        for (name, ty) in arguments {
            scope.bind(name, NameTarget::FunctionArgument(ty.clone()))?;
        }
        let resolved = ExprResolver::resolve(&mut ctx, expr, &ExprContext::new(&scope, "Expression"))?;
        debug!(ty = %resolved.ty(), "expression analyzed");
        Ok(ctx.finish(None, Some(resolved)))
    }

    fn root_scope(&self) -> NameScope<'static> {
        let language = &self.options.language;
        NameScope::root().with_rules(
            language.supports(LanguageFeature::AllowDuplicateColumnNames),
            language.supports(LanguageFeature::StrictNameResolution),
        )
    }

    fn finish(mut self, statement: Option<crate::resolved::ResolvedStatement>, expression: Option<ResolvedExpr>) -> AnalyzerOutput {
        let untyped = std::mem::take(&mut self.accumulator.untyped_parameters);
        for name in untyped {
            match name {
                ParameterName::Named(n) => {
                    self.accumulator.undeclared_parameters.entry(n).or_insert(Type::Int64);
                }
                ParameterName::Positional(p) => {
                    self.accumulator.undeclared_positional_parameters.entry(p).or_insert(Type::Int64);
                }
            }
        }
        let positional = &self.accumulator.undeclared_positional_parameters;
        let last = positional.keys().copied().max().unwrap_or(0);
        let undeclared_positional_parameters =
            (1..=last).map(|p| positional.get(&p).cloned().unwrap_or(Type::Int64)).collect();
        AnalyzerOutput {
            statement,
            expression,
            deprecation_warnings: self.accumulator.deprecation_warnings.into_iter().collect(),
            undeclared_parameters: self.accumulator.undeclared_parameters,
            undeclared_positional_parameters,
            max_column_id: self.columns.max_column_id(),
            column_access: self.access.into_map(),
        }
    }

    pub fn language(&self) -> &LanguageOptions {
        &self.options.language
    }

    pub fn coercer(&self) -> Coercer<'_> {
        Coercer::new(&self.options.language, Some(self.catalog))
    }

    /// Guards recursive resolution against unbounded nesting.
    pub fn enter(&mut self, span: Span) -> Result<(), AnalyzerError> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(AnalyzerError::NestingTooDeep { max: self.options.max_nesting_depth, location: Some(span) });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Runs `f` one nesting level deeper, on a fresh stack segment when the
    /// current one is nearly used up.
    pub fn nested<T>(
        &mut self,
        span: Span,
        f: impl FnOnce(&mut Self) -> Result<T, AnalyzerError>,
    ) -> Result<T, AnalyzerError> {
        self.enter(span)?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || f(self));
        self.leave();
        result.map_err(|e| e.at(span))
    }

    /// `$query` for the first SELECT block, `$subquery1`, ... afterwards.
    pub fn next_query_name(&mut self) -> String {
        self.query_names += 1;
        if self.query_names == 1 { "$query".to_string() } else { format!("$subquery{}", self.query_names - 1) }
    }

    pub fn allocate_column(&mut self, table_name: &str, name: &str, ty: Type) -> ResolvedColumn {
        self.columns.allocate(table_name, name, ty)
    }

    /// Records `column` as correlated in the innermost `depth` subqueries.
    pub fn capture_correlated(&mut self, column: &ResolvedColumn, depth: usize) {
        let start = self.correlated.len().saturating_sub(depth);
        for set in &mut self.correlated[start..] {
            set.capture(column);
        }
    }

    /// Parses a type name against the builtin types and the catalog.
    pub fn resolve_type(&self, name: &str, span: Span) -> Result<Type, AnalyzerError> {
        let ty = Type::parse(name, &|n| self.catalog.find_type(n)).map_err(|e| e.at(span))?;
        if self.options.language.product_mode == ProductMode::External && !is_external_type(&ty) {
            return Err(AnalyzerError::type_not_found(name).at(span));
        }
        Ok(ty)
    }

    pub fn warn_deprecated(&mut self, function: &Function) {
        if function.deprecated && self.options.language.supports(LanguageFeature::DeprecationWarnings) {
            self.accumulator.deprecation_warnings.insert(format!("Function {} is deprecated", function.sql_name()));
        }
    }

    pub fn parameter(&mut self, name: ParameterName) -> Result<ResolvedExpr, AnalyzerError> {
        let declared = match &name {
            ParameterName::Named(n) => self.options.query_parameters.get(&n.to_lowercase()).cloned(),
            ParameterName::Positional(p) => {
                p.checked_sub(1).and_then(|i| self.options.positional_parameters.get(i)).cloned()
            }
        };
        if let Some(ty) = declared {
            return Ok(ResolvedExpr::Parameter { name, ty, untyped: false });
        }
        if !self.options.allow_undeclared_parameters {
            return Err(match &name {
                ParameterName::Named(n) => AnalyzerError::unknown(NameKind::Parameter, n.clone(), None),
                ParameterName::Positional(p) => AnalyzerError::sql(format!(
                    "Query parameter number {p} is not defined ({} provided)",
                    self.options.positional_parameters.len()
                )),
            });
        }
        let name = match name {
            ParameterName::Named(n) => ParameterName::Named(n.to_lowercase()),
            positional => positional,
        };
        let inferred = match &name {
            ParameterName::Named(n) => self.accumulator.undeclared_parameters.get(n).cloned(),
            ParameterName::Positional(p) => self.accumulator.undeclared_positional_parameters.get(p).cloned(),
        };
        Ok(match inferred {
            Some(ty) => ResolvedExpr::Parameter { name, ty, untyped: false },
            None => {
                self.accumulator.untyped_parameters.insert(name.clone());
                ResolvedExpr::Parameter { name, ty: Type::Int64, untyped: true }
            }
        })
    }

    /// Fixes the type of an undeclared parameter the first time a coercion
    /// decides it. Later uses must agree.
    pub fn bind_parameter_type(&mut self, name: &ParameterName, ty: &Type) -> Result<(), AnalyzerError> {
        let existing = match name {
            ParameterName::Named(n) => self.accumulator.undeclared_parameters.get(n),
            ParameterName::Positional(p) => self.accumulator.undeclared_positional_parameters.get(p),
        };
        if let Some(existing) = existing {
            if existing != ty {
                return Err(AnalyzerError::sql(format!(
                    "Undeclared parameter {name} is used assuming different types ({existing} vs {ty})"
                )));
            }
            return Ok(());
        }
        match name {
            ParameterName::Named(n) => {
                self.accumulator.undeclared_parameters.insert(n.clone(), ty.clone());
            }
            ParameterName::Positional(p) => {
                self.accumulator.undeclared_positional_parameters.insert(*p, ty.clone());
            }
        }
        Ok(())
    }

    pub fn system_variable(&self, path: &[String]) -> Result<ResolvedExpr, AnalyzerError> {
        let key = path.join(".").to_lowercase();
        match self.options.system_variables.get(&key) {
            Some(ty) => Ok(ResolvedExpr::SystemVariable { path: path.to_vec(), ty: ty.clone() }),
            None => Err(AnalyzerError::unknown(NameKind::SystemVariable, format!("@@{}", path.join(".")), None)),
        }
    }
}

/// Types available in external product mode.
fn is_external_type(ty: &Type) -> bool {
    match ty {
        Type::Array(e) => is_external_type(e),
        Type::Struct(s) => s.fields.iter().all(|f| is_external_type(&f.ty)),
        other => !matches!(other.kind(), TypeKind::Int32 | TypeKind::Uint32 | TypeKind::Uint64 | TypeKind::Float),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyzer::ErrorClass, catalog::SimpleCatalog};

    #[test]
    fn nesting_depth_is_bounded() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new().max_depth(2);
        let mut ctx = AnalysisContext::new(&catalog, &options);
        ctx.enter(Span::default()).unwrap();
        ctx.enter(Span::default()).unwrap();
        let err = ctx.enter(Span::new(4, 5)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::ResourceExhausted);
        assert_eq!(err.location(), Some(Span::new(4, 5)));
        ctx.leave();
        assert!(ctx.enter(Span::default()).is_ok());
    }

    #[test]
    fn undeclared_parameters_keep_their_first_type() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new().undeclared_parameters();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let p = ParameterName::Named("p".into());
        assert!(matches!(ctx.parameter(p.clone()).unwrap(), ResolvedExpr::Parameter { untyped: true, .. }));
        ctx.bind_parameter_type(&p, &Type::String).unwrap();
        assert!(ctx.bind_parameter_type(&p, &Type::String).is_ok());
        assert!(ctx.bind_parameter_type(&p, &Type::Int64).is_err());
        assert!(matches!(
            ctx.parameter(ParameterName::Named("P".into())).unwrap(),
            ResolvedExpr::Parameter { ty: Type::String, untyped: false, .. }
        ));
    }

    #[test]
    fn undeclared_parameters_need_permission() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new().positional_parameter(Type::Bool);
        let mut ctx = AnalysisContext::new(&catalog, &options);
        assert!(ctx.parameter(ParameterName::Positional(1)).is_ok());
        let err = ctx.parameter(ParameterName::Positional(2)).unwrap_err();
        assert_eq!(err.to_string(), "Query parameter number 2 is not defined (1 provided)");
        let err = ctx.parameter(ParameterName::Named("x".into())).unwrap_err();
        assert_eq!(err.to_string(), "Query parameter 'x' not found");
    }

    #[test]
    fn external_mode_hides_narrow_types() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::with_language(LanguageOptions::new().external());
        let ctx = AnalysisContext::new(&catalog, &options);
        assert!(ctx.resolve_type("INT64", Span::default()).is_ok());
        assert!(ctx.resolve_type("ARRAY<INT32>", Span::default()).is_err());
    }
}
