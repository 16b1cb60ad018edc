//! MBT Transitions
//!
//! Guarded state-change rules and the component state machines built from
//! them.
//!
//! # Core Concepts
//!
//! - [`Transition`]: `initial`/`incoming` guards, `final`/`outgoing`/`returned`
//!   effects, with argument bindings computed once at build time
//! - [`binding::resolve`]: per-execution lookup of free argument values
//! - [`Component`]: live states plus owned transitions
//! - [`Application`]: one live instance of a validated [`Model`]
//!
//! # Example
//!
//! ```rust
//! use mbt_model::{CodeSpec, TypeSpec};
//! use mbt_transition::{Application, ComponentSpec, Model, ModelSpec, TransitionSpec};
//! use std::sync::Arc;
//!
//! let spec = ModelSpec {
//!     types: vec![
//!         TypeSpec::state("State")
//!             .code(CodeSpec::new("State(True)").value(true))
//!             .code(CodeSpec::new("State(False)").value(false)),
//!         TypeSpec::exchange("Action").value_code("AC"),
//!     ],
//!     components: vec![ComponentSpec::new("C1").with_state("State").with_transition(
//!         TransitionSpec::new("toggle")
//!             .with_initial("State", "State(True)")
//!             .with_incoming("Action", "AC")
//!             .with_final("State", "State(False)"),
//!     )],
//! };
//! let app = Application::new(Arc::new(Model::build(spec)?));
//! let c1 = app.component("C1").unwrap();
//! assert!(c1.block_by_name("toggle").unwrap().is_matching_initial(c1.states()));
//! # Ok::<(), mbt_model::DefinitionError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod application;
pub mod binding;
mod component;
mod transition;

pub use application::{Application, ApplicationId, Model, ModelSpec};
pub use binding::{ArgumentBinding, Bindings, Role};
pub use component::{Component, ComponentSpec};
pub use transition::{CodeRef, Transition, TransitionCode, TransitionSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application, ApplicationId, Component, ComponentSpec, Model, ModelSpec, Role, Transition,
        TransitionSpec,
    };
}
