use std::{fmt, sync::Arc};

use crate::{
    catalog::Function,
    resolved::{ResolvedColumn, ResolvedScan},
    types::{Type, Value},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterName {
    Named(String),
    /// 1-based.
    Positional(usize),
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterName::Named(n) => write!(f, "@{n}"),
            ParameterName::Positional(p) => write!(f, "?{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSubqueryKind {
    Scalar,
    Exists,
    Array,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOrderByItem {
    pub expr: ResolvedExpr,
    pub descending: bool,
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedWindow {
    pub partition_by: Vec<ResolvedExpr>,
    pub order_by: Vec<ResolvedOrderByItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedExpr {
    Literal {
        value: Value,
        /// Written with an explicit type (`DATE '...'`, `CAST(1 AS INT32)`),
        /// so it no longer coerces like a bare literal.
        has_explicit_type: bool,
    },
    Parameter {
        name: ParameterName,
        ty: Type,
        /// Undeclared and not yet bound to a type by any coercion.
        untyped: bool,
    },
    SystemVariable {
        path: Vec<String>,
        ty: Type,
    },
    /// Named argument of a standalone expression.
    Argument {
        name: String,
        ty: Type,
    },
    ColumnRef {
        column: ResolvedColumn,
        /// Refers to a column of an enclosing query.
        correlated: bool,
    },
    FunctionCall {
        function: Arc<Function>,
        args: Vec<ResolvedExpr>,
        ty: Type,
    },
    AggregateCall {
        function: Arc<Function>,
        args: Vec<ResolvedExpr>,
        ty: Type,
        distinct: bool,
    },
    AnalyticCall {
        function: Arc<Function>,
        args: Vec<ResolvedExpr>,
        ty: Type,
        window: ResolvedWindow,
    },
    Cast {
        expr: Box<ResolvedExpr>,
        ty: Type,
        /// SAFE_CAST: failures produce NULL.
        safe: bool,
    },
    MakeStruct {
        fields: Vec<ResolvedExpr>,
        ty: Type,
    },
    MakeArray {
        elements: Vec<ResolvedExpr>,
        ty: Type,
    },
    GetStructField {
        expr: Box<ResolvedExpr>,
        field_index: usize,
        ty: Type,
    },
    Subquery {
        kind: ResolvedSubqueryKind,
        ty: Type,
        /// Left operand of `IN`.
        in_expr: Option<Box<ResolvedExpr>>,
        /// Correlated columns captured from enclosing queries.
        parameters: Vec<ResolvedColumn>,
        scan: Box<ResolvedScan>,
    },
}

impl ResolvedExpr {
    pub fn ty(&self) -> &Type {
        match self {
            ResolvedExpr::Literal { value, .. } => value.ty(),
            ResolvedExpr::ColumnRef { column, .. } => &column.ty,
            ResolvedExpr::Parameter { ty, .. }
            | ResolvedExpr::SystemVariable { ty, .. }
            | ResolvedExpr::Argument { ty, .. }
            | ResolvedExpr::FunctionCall { ty, .. }
            | ResolvedExpr::AggregateCall { ty, .. }
            | ResolvedExpr::AnalyticCall { ty, .. }
            | ResolvedExpr::Cast { ty, .. }
            | ResolvedExpr::MakeStruct { ty, .. }
            | ResolvedExpr::MakeArray { ty, .. }
            | ResolvedExpr::GetStructField { ty, .. }
            | ResolvedExpr::Subquery { ty, .. } => ty,
        }
    }

    pub fn column_ref(column: ResolvedColumn) -> Self {
        ResolvedExpr::ColumnRef { column, correlated: false }
    }

    pub fn literal(value: Value) -> Self {
        ResolvedExpr::Literal { value, has_explicit_type: false }
    }

    /// The referenced column of a plain, uncorrelated column reference.
    pub fn as_column(&self) -> Option<&ResolvedColumn> {
        match self {
            ResolvedExpr::ColumnRef { column, correlated: false } => Some(column),
            _ => None,
        }
    }

    /// Direct child expressions. Subquery scans are reached through
    /// [`ResolvedExpr::subquery_scan`].
    pub fn children(&self) -> Vec<&ResolvedExpr> {
        match self {
            ResolvedExpr::Literal { .. }
            | ResolvedExpr::Parameter { .. }
            | ResolvedExpr::SystemVariable { .. }
            | ResolvedExpr::Argument { .. }
            | ResolvedExpr::ColumnRef { .. } => Vec::new(),
            ResolvedExpr::FunctionCall { args, .. } | ResolvedExpr::AggregateCall { args, .. } => args.iter().collect(),
            ResolvedExpr::AnalyticCall { args, window, .. } => args
                .iter()
                .chain(window.partition_by.iter())
                .chain(window.order_by.iter().map(|o| &o.expr))
                .collect(),
            ResolvedExpr::Cast { expr, .. } | ResolvedExpr::GetStructField { expr, .. } => vec![expr.as_ref()],
            ResolvedExpr::MakeStruct { fields: items, .. } | ResolvedExpr::MakeArray { elements: items, .. } => {
                items.iter().collect()
            }
            ResolvedExpr::Subquery { in_expr, .. } => in_expr.iter().map(|e| e.as_ref()).collect(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut ResolvedExpr> {
        match self {
            ResolvedExpr::Literal { .. }
            | ResolvedExpr::Parameter { .. }
            | ResolvedExpr::SystemVariable { .. }
            | ResolvedExpr::Argument { .. }
            | ResolvedExpr::ColumnRef { .. } => Vec::new(),
            ResolvedExpr::FunctionCall { args, .. } | ResolvedExpr::AggregateCall { args, .. } => {
                args.iter_mut().collect()
            }
            ResolvedExpr::AnalyticCall { args, window, .. } => args
                .iter_mut()
                .chain(window.partition_by.iter_mut())
                .chain(window.order_by.iter_mut().map(|o| &mut o.expr))
                .collect(),
            ResolvedExpr::Cast { expr, .. } | ResolvedExpr::GetStructField { expr, .. } => vec![expr.as_mut()],
            ResolvedExpr::MakeStruct { fields: items, .. } | ResolvedExpr::MakeArray { elements: items, .. } => {
                items.iter_mut().collect()
            }
            ResolvedExpr::Subquery { in_expr, .. } => in_expr.iter_mut().map(|e| e.as_mut()).collect(),
        }
    }

    pub fn subquery_scan(&self) -> Option<&ResolvedScan> {
        match self {
            ResolvedExpr::Subquery { scan, .. } => Some(scan),
            _ => None,
        }
    }

    pub fn subquery_scan_mut(&mut self) -> Option<&mut ResolvedScan> {
        match self {
            ResolvedExpr::Subquery { scan, .. } => Some(scan),
            _ => None,
        }
    }

    /// Whether this expression (outside subqueries) calls an aggregate.
    pub fn contains_aggregate(&self) -> bool {
        matches!(self, ResolvedExpr::AggregateCall { .. }) || self.children().iter().any(|c| c.contains_aggregate())
    }

    pub fn node_name(&self) -> &'static str {
        match self {
            ResolvedExpr::Literal { .. } => "Literal",
            ResolvedExpr::Parameter { .. } => "Parameter",
            ResolvedExpr::SystemVariable { .. } => "SystemVariable",
            ResolvedExpr::Argument { .. } => "Argument",
            ResolvedExpr::ColumnRef { .. } => "ColumnRef",
            ResolvedExpr::FunctionCall { .. } => "FunctionCall",
            ResolvedExpr::AggregateCall { .. } => "AggregateFunctionCall",
            ResolvedExpr::AnalyticCall { .. } => "AnalyticFunctionCall",
            ResolvedExpr::Cast { .. } => "Cast",
            ResolvedExpr::MakeStruct { .. } => "MakeStruct",
            ResolvedExpr::MakeArray { .. } => "MakeArray",
            ResolvedExpr::GetStructField { .. } => "GetStructField",
            ResolvedExpr::Subquery { .. } => "SubqueryExpr",
        }
    }
}

impl fmt::Display for ResolvedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedExpr::Literal { value, .. } => write!(f, "{}", value.debug_string()),
            ResolvedExpr::Parameter { name, .. } => write!(f, "{name}"),
            ResolvedExpr::SystemVariable { path, .. } => write!(f, "@@{}", path.join(".")),
            ResolvedExpr::Argument { name, .. } => write!(f, "{name}"),
            ResolvedExpr::ColumnRef { column, .. } => write!(f, "{column}"),
            ResolvedExpr::FunctionCall { function, args, .. }
            | ResolvedExpr::AggregateCall { function, args, .. }
            | ResolvedExpr::AnalyticCall { function, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", function.name, args.join(", "))
            }
            ResolvedExpr::Cast { expr, ty, .. } => write!(f, "CAST({expr} AS {ty})"),
            ResolvedExpr::GetStructField { expr, field_index, .. } => write!(f, "{expr}.[{field_index}]"),
            ResolvedExpr::MakeStruct { fields: items, .. } | ResolvedExpr::MakeArray { elements: items, .. } => {
                let items: Vec<String> = items.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", self.node_name(), items.join(", "))
            }
            ResolvedExpr::Subquery { kind, .. } => write!(f, "{kind:?}Subquery"),
        }
    }
}

/// An expression computed into a fresh column.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedColumn {
    pub column: ResolvedColumn,
    pub expr: ResolvedExpr,
}
