//! MBT Partition Model
//!
//! Typed values of a component-based application model.
//!
//! # Core Concepts
//!
//! - [`Partition`]: one instance of a state, exchange or data type; `None`
//!   values are wildcards and [`Partition::matches`] honours them
//! - [`Catalog`]: the codes one type declares, with description lookup
//! - [`TypeRegistry`]: validated catalogs of every type, built from
//!   [`TypeSpec`] declarations
//!
//! # Example
//!
//! ```rust
//! use mbt_model::{CodeSpec, TypeRegistry, TypeSpec};
//! use indexmap::IndexMap;
//!
//! let registry = TypeRegistry::build([TypeSpec::state("State")
//!     .code(CodeSpec::new("State(True)").value(true))
//!     .code(CodeSpec::new("State(False)").value(false))])?;
//!
//! let on = registry.make("State", "State(True)", &[], &IndexMap::new())?;
//! let any = registry.catalog("State")?.unconstrained();
//! assert!(any.matches(&on));
//! # Ok::<(), mbt_model::DefinitionError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod catalog;
mod error;
mod partition;
mod registry;
mod value;

pub use catalog::{Catalog, Code, Constructor, Description};
pub use error::{DefinitionError, Result};
pub use partition::{Argument, Partition, PartitionClass};
pub use registry::{basename, CodeSpec, TypeRegistry, TypeSpec};
pub use value::Value;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Argument, Catalog, Code, CodeSpec, Constructor, DefinitionError, Partition,
        PartitionClass, TypeRegistry, TypeSpec, Value,
    };
}
