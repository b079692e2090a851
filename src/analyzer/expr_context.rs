use crate::analyzer::NameScope;

/// Where an expression is being resolved: the visible names, the clause
/// (for messages) and which kinds of calls may appear.
#[derive(Debug, Clone, Copy)]
pub struct ExprContext<'s> {
    pub scope: &'s NameScope<'s>,
    pub clause: &'static str,
    pub allow_aggregates: bool,
    pub allow_analytic: bool,
    /// Resolving the arguments of an aggregate call.
    pub in_aggregate: bool,
}

impl<'s> ExprContext<'s> {
    pub fn new(scope: &'s NameScope<'s>, clause: &'static str) -> Self {
        Self { scope, clause, allow_aggregates: false, allow_analytic: false, in_aggregate: false }
    }

    pub fn with_aggregates(mut self) -> Self {
        self.allow_aggregates = true;
        self
    }

    pub fn with_analytic(mut self) -> Self {
        self.allow_analytic = true;
        self
    }

    pub fn inside_aggregate(mut self) -> Self {
        self.in_aggregate = true;
        self.allow_aggregates = false;
        self.allow_analytic = false;
        self
    }

    pub fn without_analytic(mut self) -> Self {
        self.allow_analytic = false;
        self
    }
}
