//! # spotmatch-engine
//!
//! One single-writer task per symbol, and the [`EngineRegistry`] that
//! routes requests to them.
//!
//! Each task owns its symbol's order book and market data. Orders of one
//! symbol are matched and settled strictly in arrival order; different
//! symbols run in parallel.

mod command;
mod registry;
mod symbol;

pub use command::{OrderTicket, SubmitOutcome};
pub use registry::EngineRegistry;
