pub mod type_kind;
pub use type_kind::*;

pub mod enum_type;
pub use enum_type::*;

pub mod proto_type;
pub use proto_type::*;

pub mod struct_type;
pub use struct_type::*;

pub mod sql_type;
pub use sql_type::*;

pub mod type_parser;

pub mod value;
pub use value::*;

pub mod language_options;
pub use language_options::*;
