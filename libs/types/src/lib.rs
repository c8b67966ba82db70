//! Shared types for the matching simulator
//!
//! Identifier, numeric, order, fill, trade, and error types used by the
//! matching engine and the simulation tooling.

pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;

pub use errors::{OrderError, SubmitError};
pub use ids::{OrderId, Symbol, TradeId, TraderId};
pub use numeric::Price;
pub use order::{Fill, Order, OrderStatus, Side};
pub use trade::Trade;
