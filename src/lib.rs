//! # Expert Panel
//!
//! Routes an inbound message to a small panel of domain specialists, runs
//! each specialist's assessment and response, then has a coordinator merge
//! and review the answers into one reply.
//!
//! The pipeline:
//!
//! 1. [`routing`] asks the coordinator which specialists fit the message and
//!    parses the free-form answer into a bounded [`SelectionResult`].
//! 2. [`graph`] turns the selection into an ordered list of [`UnitOfWork`]s
//!    with explicit dependencies.
//! 3. [`executor`] runs the units one at a time, feeding each unit the
//!    outputs of its dependencies.
//!
//! [`ExpertPanel`] ties the steps together; the `expert-panel` and `server`
//! binaries are thin wrappers around it.

pub mod config;
pub mod display;
pub mod error;
pub mod executor;
pub mod graph;
pub mod llms;
pub mod panel;
pub mod routing;
pub mod server;
pub mod specialists;
pub mod task;
pub mod tasks;
pub mod utilities;

pub use config::PanelConfig;
pub use error::PanelError;
pub use executor::{ExecutionReport, ReviewVerdict, SequentialExecutor};
pub use graph::TaskGraphBuilder;
pub use llms::{BaseLLM, GeneratorSet, LlmError, TextGenerator};
pub use panel::{ExpertPanel, PanelOutput};
pub use routing::{Router, RoutingOutcome, SelectionParser, SelectionResult};
pub use specialists::{SpecialistProfile, SpecialistRegistry};
pub use task::{UnitKind, UnitOfWork, UnitStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
