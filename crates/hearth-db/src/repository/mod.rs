//! # Repository Module
//!
//! SQLite implementations of the scheduling storage traits.
//!
//! ## Trait Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  hearth-schedule trait      repository            tables                │
//! │  ─────────────────────      ──────────            ──────                │
//! │  TemplateStore          ──► TemplateRepository    standing_order_*      │
//! │  OrderStore             ──► OrderRepository       order_instances,      │
//! │                                                   order_items           │
//! │  CounterStore           ──► CounterRepository     counters              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each repository also exposes inherent methods returning [`DbResult`], for
//! callers that want database errors rather than the engine's classes.
//!
//! [`DbResult`]: crate::error::DbResult

pub mod counter;
pub mod order;
pub mod template;
