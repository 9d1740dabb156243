//! Daybrief Core - domain model, availability engine, configuration
//!
//! This crate holds everything the daybrief system computes without I/O:
//!
//! - the dispatch domain model (`Operation`, `OperationResult`,
//!   `DispatchOutcome`) shared by the dispatcher and the adapters
//! - the calendar domain model (`CalendarId`, `BusyInterval`) and the
//!   availability engine that turns busy intervals into ranked free slots
//! - layered configuration with validation
//!
//! Network transport lives in `daybrief-gateway`; orchestration lives in
//! `daybrief-agent`. Nothing in this crate suspends or blocks, so every
//! function here is safe to call concurrently on independent inputs.

pub mod availability;
pub mod config;
pub mod domain;
pub mod errors;

pub use availability::{AvailabilityEngine, DefaultSlotScorer, SlotContext, SlotScorer};
pub use domain::calendar::{
    busy_intervals_from_events, BusyInterval, CalendarId, CalendarPayloadError, IntervalError,
};
pub use domain::operation::{
    DispatchOutcome, Operation, OperationResult, OperationStatus, OverallStatus,
};
pub use domain::query::{AvailabilityQuery, Candidate, PreferenceWeights, TimeOfDay, TimeSlot};
pub use errors::QueryError;
