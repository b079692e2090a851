use std::fmt;

use crate::types::Type;

/// Session-unique column identity. Resolved nodes refer to columns by id,
/// never by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedColumn {
    pub id: ColumnId,
    /// Table, alias or internal pseudo-table (`$query`, `$aggregate`, ...).
    pub table_name: String,
    pub name: String,
    pub ty: Type,
}

impl fmt::Display for ResolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.table_name, self.name, self.id)
    }
}

/// Read/write flags stamped onto DML statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ColumnAccess {
    pub read: bool,
    pub write: bool,
}

impl ColumnAccess {
    pub const NONE: ColumnAccess = ColumnAccess { read: false, write: false };
    pub const READ: ColumnAccess = ColumnAccess { read: true, write: false };
    pub const WRITE: ColumnAccess = ColumnAccess { read: false, write: true };
    pub const READ_WRITE: ColumnAccess = ColumnAccess { read: true, write: true };

    pub fn merge(self, other: ColumnAccess) -> ColumnAccess {
        ColumnAccess { read: self.read || other.read, write: self.write || other.write }
    }
}

impl fmt::Display for ColumnAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match (self.read, self.write) {
            (true, true) => "READ_WRITE",
            (true, false) => "READ",
            (false, true) => "WRITE",
            (false, false) => "NONE",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_flags_merge() {
        assert_eq!(ColumnAccess::READ.merge(ColumnAccess::WRITE), ColumnAccess::READ_WRITE);
        assert_eq!(ColumnAccess::NONE.merge(ColumnAccess::READ).to_string(), "READ");
    }

    #[test]
    fn columns_render_with_their_id() {
        let c = ResolvedColumn { id: ColumnId(3), table_name: "t".into(), name: "a".into(), ty: Type::Int64 };
        assert_eq!(c.to_string(), "t.a#3");
    }
}
