//! Matching engine
//!
//! Per-symbol central limit order books with price-time priority matching.
//!
//! - `book` — price levels and one side of a book
//! - `order_book` — a symbol's bid/ask pair plus its bounded trade ring
//! - `matching` — crossing predicate and trade executor
//! - `engine` — the serialized matching engine: submission queue, worker,
//!   active-order index, global trade history, fill notification
//! - `stats` — performance counters and published snapshots
//! - `events` — the fill listener seam between engine and traders
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced; FIFO within a price level
//! - Trades execute at the resting (maker) price
//! - Conservation of quantity on every order
//! - A quiescent book is never crossed

pub mod book;
pub mod engine;
pub mod events;
pub mod matching;
pub mod order_book;
pub mod stats;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use types::Order;

pub use engine::{EngineState, MatchingEngine, ENGINE_TRADE_CAPACITY};
pub use events::FillListener;
pub use order_book::{BookSnapshot, BookStatistics, DepthLevel, LevelSnapshot, OrderBook};
pub use stats::{PerformanceStats, SymbolStatistics, SymbolSummary};

/// An order shared between the book that owns its resting position and the
/// engine's active-order index. The matcher thread is the sole mutator.
pub type SharedOrder = Arc<Mutex<Order>>;

/// Lock a mutex, recovering the guard if a panicking thread poisoned it.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot an order out of its shared handle.
pub(crate) fn order_snapshot(order: &SharedOrder) -> Order {
    lock_unpoisoned(order).clone()
}
