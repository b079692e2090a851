//! Name resolution, scoping and type checking of statements into the
//! resolved tree.

pub mod analyzer_error;
pub use analyzer_error::*;

pub mod analyzer_options;
pub use analyzer_options::*;

pub mod analyzer_output;
pub use analyzer_output::*;

pub mod column_allocator;
pub use column_allocator::*;

pub mod correlated_columns;
pub use correlated_columns::*;

pub mod with_alias_stack;
pub use with_alias_stack::*;

pub mod name_list;
pub use name_list::*;

pub mod name_scope;
pub use name_scope::*;

pub mod access_tracker;
pub use access_tracker::*;

pub mod expr_context;
pub use expr_context::*;

pub mod query_resolution_info;
pub use query_resolution_info::*;

pub mod analysis_context;
pub use analysis_context::*;

pub mod resolvers;
pub use resolvers::*;
