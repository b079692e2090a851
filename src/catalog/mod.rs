pub mod catalog;
pub use catalog::*;

pub mod table;
pub use table::*;

pub mod function;
pub use function::*;

pub mod table_valued_function;
pub use table_valued_function::*;

pub mod builtin_functions;
pub use builtin_functions::*;

pub mod suggest;
pub use suggest::*;

pub mod simple_catalog;
pub use simple_catalog::*;
