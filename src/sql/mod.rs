//! Safe SQL building: identifiers from the schema only, values as named parameters.

mod builder;
mod clause;
mod condition;
mod operator;
pub mod params;

pub use builder::{insert, is_identifier, param_name, select, update, QueryBuf};
pub use clause::*;
pub use condition::*;
pub use operator::{in_list, Operator};
pub use params::*;
