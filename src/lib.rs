//! Rollcall - chain event reconciliation and roll-up materialization.
//!
//! Polls a gifting contract over JSON-RPC, records every log exactly once in
//! an append-only event stream, and recomputes time-bucketed roll-ups from
//! that stream for the read-side API layer.

pub mod api;
pub mod chain;
pub mod config;
pub mod events;
pub mod materialize;
pub mod pipeline;
pub mod processor;
pub mod reconcile;
pub mod storage;
pub mod utils;
