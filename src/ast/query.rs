use crate::ast::{Expr, ExprKind, OrderByItem, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub with: Option<WithClause>,
    pub body: QueryExpr,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub recursive: bool,
    pub entries: Vec<WithEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithEntry {
    pub alias: String,
    pub query: Query,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    Select(Box<Select>),
    SetOperation(SetOperation),
    /// Parenthesized query with its own WITH / ORDER BY / LIMIT.
    Nested(Box<Query>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub op: SetOperator,
    /// `ALL` when true, `DISTINCT` otherwise.
    pub all: bool,
    pub inputs: Vec<QueryExpr>,
    pub span: Span,
}

impl SetOperation {
    pub fn name(&self) -> String {
        let op = match self.op {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        };
        format!("{op} {}", if self.all { "ALL" } else { "DISTINCT" })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr { expr: Expr, alias: Option<String> },
    /// `*`
    Star { span: Span },
    /// `t.*`
    QualifiedStar { qualifier: String, span: Span },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<TableExpr>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleUnit {
    Rows,
    Percent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub method: String,
    pub size: Expr,
    pub unit: SampleUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Comma,
    Cross,
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TvfArg {
    Expr(Expr),
    /// `TABLE name`
    Table(Vec<String>),
    Query(Box<Query>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableExpr {
    Table { path: Vec<String>, alias: Option<String>, sample: Option<Sample>, span: Span },
    Subquery { query: Box<Query>, alias: Option<String>, span: Span },
    Tvf { name: String, args: Vec<TvfArg>, alias: Option<String>, span: Span },
    Join { kind: JoinKind, left: Box<TableExpr>, right: Box<TableExpr>, on: Option<Expr>, span: Span },
}

impl TableExpr {
    pub fn table(dotted: &str) -> Self {
        TableExpr::Table {
            path: dotted.split('.').map(str::to_string).collect(),
            alias: None,
            sample: None,
            span: Span::default(),
        }
    }

    pub fn aliased(dotted: &str, alias: &str) -> Self {
        match Self::table(dotted) {
            TableExpr::Table { path, sample, span, .. } => {
                TableExpr::Table { path, alias: Some(alias.to_string()), sample, span }
            }
            other => other,
        }
    }

    pub fn subquery(query: Query, alias: Option<&str>) -> Self {
        TableExpr::Subquery { query: Box::new(query), alias: alias.map(str::to_string), span: Span::default() }
    }

    pub fn join(kind: JoinKind, left: TableExpr, right: TableExpr, on: Option<Expr>) -> Self {
        TableExpr::Join { kind, left: Box::new(left), right: Box::new(right), on, span: Span::default() }
    }

    pub fn span(&self) -> Span {
        match self {
            TableExpr::Table { span, .. }
            | TableExpr::Subquery { span, .. }
            | TableExpr::Tvf { span, .. }
            | TableExpr::Join { span, .. } => *span,
        }
    }
}

impl Select {
    pub fn new(items: Vec<SelectItem>) -> Self {
        Self { items, ..Default::default() }
    }

    pub fn from(mut self, from: TableExpr) -> Self {
        self.from = Some(from);
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    pub fn group_by(mut self, keys: Vec<Expr>) -> Self {
        self.group_by = keys;
        self
    }

    pub fn having(mut self, predicate: Expr) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn into_query(self) -> Query {
        Query::new(QueryExpr::Select(Box::new(self)))
    }
}

impl SelectItem {
    pub fn expr(expr: Expr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: &str) -> Self {
        SelectItem::Expr { expr, alias: Some(alias.to_string()) }
    }

    pub fn star() -> Self {
        SelectItem::Star { span: Span::default() }
    }
}

impl Query {
    pub fn new(body: QueryExpr) -> Self {
        Self { with: None, body, order_by: Vec::new(), limit: None, offset: None, span: Span::default() }
    }

    pub fn set_operation(op: SetOperator, all: bool, inputs: Vec<Query>) -> Self {
        let inputs = inputs.into_iter().map(QueryExpr::from).collect();
        Query::new(QueryExpr::SetOperation(SetOperation { op, all, inputs, span: Span::default() }))
    }

    pub fn with(mut self, recursive: bool, entries: Vec<(&str, Query)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(alias, query)| WithEntry { alias: alias.to_string(), query, span: Span::default() })
            .collect();
        self.with = Some(WithClause { recursive, entries });
        self
    }

    pub fn order_by(mut self, items: Vec<OrderByItem>) -> Self {
        self.order_by = items;
        self
    }

    pub fn limit(mut self, limit: Expr, offset: Option<Expr>) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Whether the query reads a table named `alias` (single-part,
    /// case-insensitive) that is not shadowed by an inner WITH entry.
    pub fn references_table(&self, alias: &str) -> bool {
        if let Some(with) = &self.with {
            for entry in &with.entries {
                // a recursive inner entry with the same name hides the alias
                // from its own body
                let shadows = entry.alias.eq_ignore_ascii_case(alias);
                if !(shadows && with.recursive) && entry.query.references_table(alias) {
                    return true;
                }
                if shadows {
                    return false;
                }
            }
        }
        self.body.references_table(alias) || self.order_by.iter().any(|o| expr_references(&o.expr, alias))
    }
}

impl From<Query> for QueryExpr {
    /// Unwraps plain queries so set operations hold their inputs directly.
    fn from(query: Query) -> Self {
        if query.with.is_none() && query.order_by.is_empty() && query.limit.is_none() {
            query.body
        } else {
            QueryExpr::Nested(Box::new(query))
        }
    }
}

impl QueryExpr {
    pub fn references_table(&self, alias: &str) -> bool {
        match self {
            QueryExpr::Select(select) => select.references_table(alias),
            QueryExpr::SetOperation(op) => op.inputs.iter().any(|i| i.references_table(alias)),
            QueryExpr::Nested(query) => query.references_table(alias),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            QueryExpr::Select(s) => s.span,
            QueryExpr::SetOperation(op) => op.span,
            QueryExpr::Nested(q) => q.span,
        }
    }
}

impl Select {
    fn references_table(&self, alias: &str) -> bool {
        let in_items = self.items.iter().any(|item| match item {
            SelectItem::Expr { expr, .. } => expr_references(expr, alias),
            _ => false,
        });
        in_items
            || self.from.as_ref().is_some_and(|f| f.references_table(alias))
            || self.where_clause.as_ref().is_some_and(|e| expr_references(e, alias))
            || self.group_by.iter().any(|e| expr_references(e, alias))
            || self.having.as_ref().is_some_and(|e| expr_references(e, alias))
    }
}

impl TableExpr {
    fn references_table(&self, alias: &str) -> bool {
        match self {
            TableExpr::Table { path, .. } => path.len() == 1 && path[0].eq_ignore_ascii_case(alias),
            TableExpr::Subquery { query, .. } => query.references_table(alias),
            TableExpr::Tvf { args, .. } => args.iter().any(|a| match a {
                TvfArg::Expr(e) => expr_references(e, alias),
                TvfArg::Table(path) => path.len() == 1 && path[0].eq_ignore_ascii_case(alias),
                TvfArg::Query(q) => q.references_table(alias),
            }),
            TableExpr::Join { left, right, on, .. } => {
                left.references_table(alias)
                    || right.references_table(alias)
                    || on.as_ref().is_some_and(|e| expr_references(e, alias))
            }
        }
    }
}

/// Table references inside expression subqueries.
fn expr_references(expr: &Expr, alias: &str) -> bool {
    expr.any(&|e| match &e.kind {
        ExprKind::Subquery { query, .. } | ExprKind::InSubquery { query, .. } => query.references_table(alias),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select_from(table: &str) -> Query {
        Select::new(vec![SelectItem::star()]).from(TableExpr::table(table)).into_query()
    }

    #[test]
    fn finds_direct_and_nested_references() {
        assert!(select_from("r").references_table("R"));
        assert!(!select_from("t").references_table("r"));

        let nested = Select::new(vec![SelectItem::expr(Expr::subquery(
            crate::ast::SubqueryKind::Exists,
            select_from("r"),
        ))])
        .into_query();
        assert!(nested.references_table("r"));

        let union = Query::set_operation(SetOperator::Union, true, vec![select_from("t"), select_from("r")]);
        assert!(union.references_table("r"));
    }

    #[test]
    fn inner_with_entry_shadows() {
        let q = select_from("r").with(false, vec![("r", select_from("t"))]);
        assert!(!q.references_table("r"));
        let q = select_from("x").with(false, vec![("x", select_from("r"))]);
        assert!(q.references_table("r"));
    }
}
