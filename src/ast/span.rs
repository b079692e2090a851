use std::fmt;

/// Byte range into the statement text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// 1-based line and column of `start` in `sql`.
    pub fn line_col(&self, sql: &str) -> (usize, usize) {
        let upto = &sql[..self.start.min(sql.len())];
        let line = upto.matches('\n').count() + 1;
        let col = match upto.rfind('\n') {
            Some(nl) => upto[nl + 1..].chars().count() + 1,
            None => upto.chars().count() + 1,
        };
        (line, col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_from_one() {
        let sql = "SELECT a\nFROM t";
        assert_eq!(Span::new(0, 1).line_col(sql), (1, 1));
        assert_eq!(Span::new(14, 15).line_col(sql), (2, 6));
    }
}
