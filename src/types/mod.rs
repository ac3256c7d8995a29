//! Type definitions for the trace observability SDK
//!
//! This module contains all the type definitions used throughout the SDK,
//! organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `StepId`, `EventId`, `AgentName`)
//! - [`items`] - Raw runtime records and the normalized trace item union
//! - [`records`] - Session, step, and event records
//! - [`options`] - Main configuration options

pub mod identifiers;
pub mod items;
pub mod options;
pub mod records;

// Re-export commonly used types
pub use identifiers::{AgentName, EventId, SessionId, StepId};
pub use items::{AgentExecutionResult, RuntimeItem, TraceItem};
pub use options::{ObserverOptions, ObserverOptionsBuilder, RevisitPolicy};
pub use records::{
    Event, EventKind, RunSummary, SessionSnapshot, Step, StepFields, StepOutcome,
};
