//! MBT Engine
//!
//! Sandboxed simulation of transitions and bounded search for test paths.
//!
//! # Core Concepts
//!
//! - [`Sandbox`]: isolated copy of an application; applying a transition
//!   cascades its exchanges and yields a [`Run`] tree
//! - [`RunCollection`]: every run the origin transitions of a model start
//! - [`ReachabilityCache`]: memoized "may follow" relation between runs
//! - [`Pathfinder`]: depth-first search, with a time budget, for runs leading
//!   from one configuration to another
//!
//! # Example
//!
//! ```rust,ignore
//! use mbt_engine::{Pathfinder, RunCollection, Sandbox};
//!
//! let runs = RunCollection::from_model(Arc::clone(app.model()));
//! let mut sandbox = Sandbox::new(&app);
//! let run = sandbox.apply_transition(press)?;
//!
//! let mut finder = Pathfinder::new(&app, &runs);
//! if let Some(path) = finder.find_path(&run, &run) {
//!     for step in path {
//!         println!("{}", step.name());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod collection;
pub mod config;
pub mod error;
mod pathfinder;
mod reachability;
mod run;
mod sandbox;

pub use collection::{RunCollection, RunId};
pub use config::{EngineConfig, PathfinderConfig, SandboxConfig};
pub use error::{ConfigError, EngineError, Result, SandboxError};
pub use pathfinder::{PathOutcome, Pathfinder};
pub use reachability::ReachabilityCache;
pub use run::{Run, StateEntry};
pub use sandbox::Sandbox;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        EngineConfig, EngineError, PathOutcome, Pathfinder, Run, RunCollection, RunId, Sandbox,
        SandboxError,
    };
}
