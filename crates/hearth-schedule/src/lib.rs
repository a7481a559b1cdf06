//! # hearth-schedule: Standing Order Engine
//!
//! Turns standing order templates into concrete, numbered order instances
//! over a rolling horizon, and keeps them consistent with manual orders and
//! template edits.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hearth Scheduling Flow                           │
//! │                                                                         │
//! │  cron / admin action / manual order submit                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                hearth-schedule (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐    │   │
//! │  │   │ service      │  │ materializer │  │ intake           │    │   │
//! │  │   │ create/edit  │─►│ horizon walk │  │ manual override  │    │   │
//! │  │   │ cancel/delete│  │ batch runs   │  │ delivery preview │    │   │
//! │  │   └──────────────┘  └──────┬───────┘  └────────┬─────────┘    │   │
//! │  │                            │   ┌──────────┐     │              │   │
//! │  │                            └──►│ sequence │◄────┘              │   │
//! │  │                                └────┬─────┘                    │   │
//! │  │   store traits: TemplateStore • OrderStore • CounterStore      │   │
//! │  └─────────────────────────────────────┼───────────────────────────┘   │
//! │                                        ▼                                │
//! │             hearth-db (SQLite)  or  memory::InMemoryStore               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`materializer`] - Rolling-horizon instance generation and batch runs
//! - [`intake`] - Manual order submission and the override rule
//! - [`service`] - Template lifecycle (create, update, cancel, delete)
//! - [`sequence`] - Gap-tolerant order number allocation
//! - [`store`] - Storage traits implemented by backends
//! - [`memory`] - Mutex-backed in-memory backend
//! - [`config`] - TOML configuration with environment overrides
//! - [`error`] - Store and engine error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod intake;
pub mod materializer;
pub mod memory;
pub mod sequence;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ScheduleConfig;
pub use error::{ScheduleError, ScheduleResult, StoreError, StoreResult};
pub use intake::OrderIntake;
pub use materializer::{RegenerationReport, StandingOrderMaterializer, TemplateFailure};
pub use memory::InMemoryStore;
pub use sequence::SequenceAllocator;
pub use service::{StandingOrderService, TemplateChange};
pub use store::{CounterStore, InsertOutcome, OrderStore, TemplateStore};
