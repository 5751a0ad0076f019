//! Record-type schemas: column descriptors, the registry, and JSON declarations.

mod column;
mod decl;
mod registry;

pub use column::*;
pub use decl::*;
pub use registry::*;
