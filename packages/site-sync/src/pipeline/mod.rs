//! Sync pipeline stages.
//!
//! - `identify`: page markup -> candidate components
//! - `params`: positional parameter extraction and placeholder rendering
//! - `styles`: style rule translation
//! - `convert`: candidate component -> conversion artifact
//! - `orchestrator`: sequences a full run

mod dom;

pub mod convert;
pub mod identify;
pub mod orchestrator;
pub mod params;
pub mod styles;

pub use convert::Transformer;
pub use identify::ComponentIdentifier;
pub use orchestrator::{
    ChangeSummary, ComponentFailure, ComponentSummary, Orchestrator, RunOptions, RunOutcome,
    StatsReport, SyncReport,
};
pub use params::ParameterPlan;
