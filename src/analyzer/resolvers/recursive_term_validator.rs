use crate::{
    analyzer::AnalyzerError,
    ast::JoinKind,
    resolved::{ResolvedExpr, ResolvedScan, ResolvedTvfArg, ScanKind},
};

/// Nesting counters for the constructs a recursive reference may not
/// appear under. Passed down by value, so each subtree sees exactly the
/// constructs enclosing it.
#[derive(Debug, Clone, Copy, Default)]
struct Nesting {
    aggregate: u32,
    analytic: u32,
    limit_offset: u32,
    order_by: u32,
    sample: u32,
    subquery: u32,
    left_join_right: u32,
    right_join_left: u32,
    full_join: u32,
    tvf_argument: u32,
    with_entry: u32,
}

impl Nesting {
    /// A disallowed construct enclosing the reference, as it reads in an
    /// error message.
    fn violation(&self) -> Option<&'static str> {
        let checks = [
            (self.aggregate, "inside an aggregate function"),
            (self.analytic, "inside an analytic function"),
            (self.limit_offset, "in a query with LIMIT or OFFSET"),
            (self.order_by, "in a query with ORDER BY"),
            (self.sample, "inside TABLESAMPLE"),
            (self.subquery, "inside an expression subquery"),
            (self.left_join_right, "in the right operand of a LEFT JOIN"),
            (self.right_join_left, "in the left operand of a RIGHT JOIN"),
            (self.full_join, "in an operand of a FULL JOIN"),
            (self.tvf_argument, "in a table-valued function argument"),
            (self.with_entry, "inside an inner WITH entry"),
        ];
        checks.iter().find(|(count, _)| *count > 0).map(|(_, reason)| *reason)
    }
}

/// Checks the recursive term of a WITH RECURSIVE entry: at most one
/// reference to the entry, and none from a non-monotonic context.
pub struct RecursiveTermValidator<'a> {
    alias: &'a str,
    /// Name the user wrote, for messages.
    display_name: &'a str,
    seen_recursive_reference: bool,
}

impl<'a> RecursiveTermValidator<'a> {
    pub fn new(alias: &'a str, display_name: &'a str) -> Self {
        Self { alias, display_name, seen_recursive_reference: false }
    }

    /// Validates `term` and reports whether it references the entry at all.
    pub fn validate(mut self, term: &ResolvedScan) -> Result<bool, AnalyzerError> {
        self.scan(term, Nesting::default())?;
        Ok(self.seen_recursive_reference)
    }

    fn scan(&mut self, scan: &ResolvedScan, nesting: Nesting) -> Result<(), AnalyzerError> {
        for expr in scan.expressions() {
            self.expr(expr, nesting)?;
        }
        match &scan.kind {
            ScanKind::RecursiveRef { alias } if alias == self.alias => self.reference(nesting),
            ScanKind::Aggregate { input, .. } => {
                self.scan(input, Nesting { aggregate: nesting.aggregate + 1, ..nesting })
            }
            ScanKind::Analytic { input, .. } => {
                self.scan(input, Nesting { analytic: nesting.analytic + 1, ..nesting })
            }
            ScanKind::LimitOffset { input, .. } => {
                self.scan(input, Nesting { limit_offset: nesting.limit_offset + 1, ..nesting })
            }
            ScanKind::OrderBy { input, .. } => {
                self.scan(input, Nesting { order_by: nesting.order_by + 1, ..nesting })
            }
            ScanKind::Sample { input, .. } => self.scan(input, Nesting { sample: nesting.sample + 1, ..nesting }),
            ScanKind::Join { kind, left, right, .. } => {
                let (left_nesting, right_nesting) = match kind {
                    JoinKind::Left => (nesting, Nesting { left_join_right: nesting.left_join_right + 1, ..nesting }),
                    JoinKind::Right => (Nesting { right_join_left: nesting.right_join_left + 1, ..nesting }, nesting),
                    JoinKind::Full => {
                        let inside = Nesting { full_join: nesting.full_join + 1, ..nesting };
                        (inside, inside)
                    }
                    JoinKind::Comma | JoinKind::Cross | JoinKind::Inner => (nesting, nesting),
                };
                self.scan(left, left_nesting)?;
                self.scan(right, right_nesting)
            }
            ScanKind::Tvf { args, .. } => {
                let inside = Nesting { tvf_argument: nesting.tvf_argument + 1, ..nesting };
                for arg in args {
                    if let ResolvedTvfArg::Relation(input) = arg {
                        self.scan(input, inside)?;
                    }
                }
                Ok(())
            }
            ScanKind::With { entries, query, .. } => {
                let inside = Nesting { with_entry: nesting.with_entry + 1, ..nesting };
                for entry in entries {
                    self.scan(&entry.scan, inside)?;
                }
                self.scan(query, nesting)
            }
            _ => {
                for input in scan.inputs() {
                    self.scan(input, nesting)?;
                }
                Ok(())
            }
        }
    }

    fn expr(&mut self, expr: &ResolvedExpr, nesting: Nesting) -> Result<(), AnalyzerError> {
        if let Some(scan) = expr.subquery_scan() {
            self.scan(scan, Nesting { subquery: nesting.subquery + 1, ..nesting })?;
        }
        for child in expr.children() {
            self.expr(child, nesting)?;
        }
        Ok(())
    }

    fn reference(&mut self, nesting: Nesting) -> Result<(), AnalyzerError> {
        if let Some(reason) = nesting.violation() {
            return Err(AnalyzerError::sql(format!(
                "A recursive reference to {} is not allowed {reason}",
                self.display_name
            )));
        }
        if self.seen_recursive_reference {
            return Err(AnalyzerError::sql(format!(
                "Multiple recursive references to {} are not allowed",
                self.display_name
            )));
        }
        self.seen_recursive_reference = true;
        Ok(())
    }
}
