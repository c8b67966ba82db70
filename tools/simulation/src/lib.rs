//! Simulation tooling for the matching engine
//!
//! - `bots` — synthetic trader agents and their portfolio accounting
//! - `csv` — the tabular order ingest/export boundary
//! - `harness` — engine + agent fleet wiring for simulation runs

pub mod bots;
pub mod csv;
pub mod harness;

pub use bots::{Portfolio, RandomTrader, TraderConfig, TraderStats};
pub use csv::{import_orders, ImportReport};
pub use harness::{Simulation, SimulationConfig};
