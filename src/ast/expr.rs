use crate::ast::{Query, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// `DATE '2020-01-01'`, `NUMERIC '1.5'`, `JSON '{}'` and the like.
    Typed { type_name: String, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Concat,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl BinaryOp {
    /// Catalog function implementing the operator.
    pub fn function_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "$add",
            BinaryOp::Subtract => "$subtract",
            BinaryOp::Multiply => "$multiply",
            BinaryOp::Divide => "$divide",
            BinaryOp::Concat => "$concat_op",
            BinaryOp::Equal => "$equal",
            BinaryOp::NotEqual => "$not_equal",
            BinaryOp::Less => "$less",
            BinaryOp::LessOrEqual => "$less_or_equal",
            BinaryOp::Greater => "$greater",
            BinaryOp::GreaterOrEqual => "$greater_or_equal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    Scalar,
    Exists,
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub descending: bool,
    /// `NULLS FIRST` / `NULLS LAST` when written.
    pub nulls_first: Option<bool>,
}

impl OrderByItem {
    pub fn asc(expr: Expr) -> Self {
        Self { expr, descending: false, nulls_first: None }
    }

    pub fn desc(expr: Expr) -> Self {
        Self { expr, descending: true, nulls_first: None }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub distinct: bool,
    /// `COUNT(*)`
    pub star: bool,
    pub over: Option<WindowSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// `a`, `t.a`, `t.s.f`
    Path(Vec<String>),
    NamedParameter(String),
    /// `?`; 1-based position in the statement.
    PositionalParameter(usize),
    /// `@@name`
    SystemVariable(Vec<String>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull { operand: Box<Expr>, negated: bool },
    InList { operand: Box<Expr>, list: Vec<Expr>, negated: bool },
    InSubquery { operand: Box<Expr>, query: Box<Query>, negated: bool },
    Like { operand: Box<Expr>, pattern: Box<Expr>, negated: bool },
    Between { operand: Box<Expr>, low: Box<Expr>, high: Box<Expr>, negated: bool },
    FunctionCall(FunctionCall),
    Cast { operand: Box<Expr>, type_name: String, safe: bool },
    Subquery { kind: SubqueryKind, query: Box<Query> },
    /// `STRUCT(a, b AS x)`
    Struct(Vec<(Expr, Option<String>)>),
    /// `ARRAY[a, b]`, optionally `ARRAY<T>[...]`
    Array { element_type: Option<String>, elements: Vec<Expr> },
    /// `(expr).field`
    FieldAccess { operand: Box<Expr>, field: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, span: Span::default() }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn null() -> Self {
        Self::new(ExprKind::Literal(Literal::Null))
    }

    pub fn bool(v: bool) -> Self {
        Self::new(ExprKind::Literal(Literal::Bool(v)))
    }

    pub fn int(v: i64) -> Self {
        Self::new(ExprKind::Literal(Literal::Int(v)))
    }

    pub fn float(v: f64) -> Self {
        Self::new(ExprKind::Literal(Literal::Float(v)))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::new(ExprKind::Literal(Literal::String(v.into())))
    }

    pub fn typed_literal(type_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(ExprKind::Literal(Literal::Typed { type_name: type_name.into(), text: text.into() }))
    }

    /// Dotted path, e.g. `Expr::path("t.a")`.
    pub fn path(dotted: &str) -> Self {
        Self::new(ExprKind::Path(dotted.split('.').map(str::to_string).collect()))
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::new(ExprKind::NamedParameter(name.into()))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) })
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Equal, left, right)
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::FunctionCall(FunctionCall {
            name: name.into(),
            args,
            distinct: false,
            star: false,
            over: None,
        }))
    }

    pub fn count_star() -> Self {
        Self::new(ExprKind::FunctionCall(FunctionCall {
            name: "count".into(),
            args: Vec::new(),
            distinct: false,
            star: true,
            over: None,
        }))
    }

    /// Adds an OVER clause to a function call; other expressions are
    /// returned unchanged.
    pub fn over(mut self, window: WindowSpec) -> Self {
        if let ExprKind::FunctionCall(call) = &mut self.kind {
            call.over = Some(window);
        }
        self
    }

    pub fn cast(operand: Expr, type_name: impl Into<String>) -> Self {
        Self::new(ExprKind::Cast { operand: Box::new(operand), type_name: type_name.into(), safe: false })
    }

    pub fn safe_cast(operand: Expr, type_name: impl Into<String>) -> Self {
        Self::new(ExprKind::Cast { operand: Box::new(operand), type_name: type_name.into(), safe: true })
    }

    pub fn subquery(kind: SubqueryKind, query: Query) -> Self {
        Self::new(ExprKind::Subquery { kind, query: Box::new(query) })
    }

    /// The literal integer, if this is one (GROUP BY / ORDER BY ordinals).
    pub fn as_int_literal(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::Literal(Literal::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Single-name path, if this is one.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Path(path) if path.len() == 1 => Some(&path[0]),
            _ => None,
        }
    }

    /// Calls `f` on every direct child expression. Subquery bodies are not
    /// visited.
    pub fn for_each_child(&self, f: &mut dyn FnMut(&Expr)) {
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Path(_)
            | ExprKind::NamedParameter(_)
            | ExprKind::PositionalParameter(_)
            | ExprKind::SystemVariable(_)
            | ExprKind::Subquery { .. } => {}
            ExprKind::Unary { operand, .. }
            | ExprKind::Not(operand)
            | ExprKind::IsNull { operand, .. }
            | ExprKind::Cast { operand, .. }
            | ExprKind::FieldAccess { operand, .. }
            | ExprKind::InSubquery { operand, .. } => f(operand),
            ExprKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            ExprKind::And(items) | ExprKind::Or(items) => items.iter().for_each(f),
            ExprKind::InList { operand, list, .. } => {
                f(operand);
                list.iter().for_each(f);
            }
            ExprKind::Like { operand, pattern, .. } => {
                f(operand);
                f(pattern);
            }
            ExprKind::Between { operand, low, high, .. } => {
                f(operand);
                f(low);
                f(high);
            }
            ExprKind::FunctionCall(call) => {
                call.args.iter().for_each(&mut *f);
                if let Some(window) = &call.over {
                    window.partition_by.iter().for_each(&mut *f);
                    window.order_by.iter().for_each(|item| f(&item.expr));
                }
            }
            ExprKind::Struct(fields) => fields.iter().for_each(|(e, _)| f(e)),
            ExprKind::Array { elements, .. } => elements.iter().for_each(f),
        }
    }

    /// Whether `pred` holds for this expression or any descendant outside
    /// subqueries.
    pub fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        let mut found = false;
        self.for_each_child(&mut |child| found = found || child.any(pred));
        found
    }

    pub fn contains_subquery(&self) -> bool {
        self.any(&|e| matches!(e.kind, ExprKind::Subquery { .. } | ExprKind::InSubquery { .. }))
    }
}
