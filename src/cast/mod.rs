pub mod cast_class;
pub use cast_class::*;

pub mod cast_table;
pub use cast_table::*;

pub mod convert;
pub mod temporal;

pub mod conversion;
pub use conversion::*;

pub mod message_codec;
pub use message_codec::*;

pub mod input_argument;
pub use input_argument::*;

pub mod coercer;
pub use coercer::*;

pub mod cast_value;
pub use cast_value::*;
