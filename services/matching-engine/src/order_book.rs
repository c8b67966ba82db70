//! Per-symbol order book
//!
//! Two [`BookSide`]s plus a bounded ring of recent trades, behind one
//! mutex. External queries copy snapshots out under the guard, so readers
//! never observe a half-mutated book. The matcher is the sole mutator.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use types::{Order, OrderError, OrderId, Price, Side, Symbol, Trade};

use crate::book::BookSide;
use crate::{lock_unpoisoned, SharedOrder};

pub use crate::book::side::LevelSnapshot;

/// Capacity of the per-book trade ring; oldest trades are evicted.
pub const BOOK_TRADE_CAPACITY: usize = 1000;

/// One price level of a depth view, with volume accumulated down the book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: u64,
    pub order_count: usize,
    pub cumulative_volume: u64,
}

/// Point-in-time view of a book.
#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<LevelSnapshot>,
    pub asks: Vec<LevelSnapshot>,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub spread: Option<Decimal>,
    pub mid_price: Option<Decimal>,
}

/// Aggregate statistics for a book.
#[derive(Debug, Clone, Serialize)]
pub struct BookStatistics {
    pub symbol: Symbol,
    pub total_bid_volume: u64,
    pub total_ask_volume: u64,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub total_orders: usize,
    pub spread: Option<Decimal>,
    pub mid_price: Option<Decimal>,
    pub is_crossed: bool,
}

pub(crate) struct BookInner {
    pub(crate) bids: BookSide,
    pub(crate) asks: BookSide,
    trades: VecDeque<Trade>,
}

impl BookInner {
    fn best_bid_price(&self) -> Option<Price> {
        self.bids.best_price()
    }

    fn best_ask_price(&self) -> Option<Price> {
        self.asks.best_price()
    }

    fn spread(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask.as_decimal() - bid.as_decimal()),
            _ => None,
        }
    }

    fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => {
                Some((bid.as_decimal() + ask.as_decimal()) / Decimal::from(2))
            }
            _ => None,
        }
    }

    pub(crate) fn is_crossed(&self) -> bool {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub(crate) fn push_trade(&mut self, trade: Trade) {
        if self.trades.len() >= BOOK_TRADE_CAPACITY {
            self.trades.pop_front();
        }
        self.trades.push_back(trade);
    }
}

/// Order book for a single symbol.
pub struct OrderBook {
    symbol: Symbol,
    inner: Mutex<BookInner>,
}

impl OrderBook {
    /// Create an empty book for `symbol`.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            inner: Mutex::new(BookInner {
                bids: BookSide::new(Side::Buy),
                asks: BookSide::new(Side::Sell),
                trades: VecDeque::with_capacity(BOOK_TRADE_CAPACITY),
            }),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Rest an order on its side of the book.
    ///
    /// Adding an order for another symbol is a contract violation and
    /// leaves the book untouched.
    pub fn add(&self, order: SharedOrder) -> Result<(), OrderError> {
        let (symbol, side) = {
            let o = lock_unpoisoned(&order);
            (o.symbol.clone(), o.side)
        };
        if symbol != self.symbol {
            return Err(OrderError::SymbolMismatch {
                order: symbol.to_string(),
                book: self.symbol.to_string(),
            });
        }

        let mut inner = lock_unpoisoned(&self.inner);
        inner.side_mut(side).add(order);
        Ok(())
    }

    /// Remove an order from the given side. Returns whether it was found.
    pub fn remove(&self, order_id: &OrderId, side: Side) -> bool {
        let mut inner = lock_unpoisoned(&self.inner);
        inner.side_mut(side).remove(order_id).is_some()
    }

    /// Snapshot of the best bid order.
    pub fn best_bid(&self) -> Option<Order> {
        let inner = lock_unpoisoned(&self.inner);
        inner.bids.best_order().map(|o| lock_unpoisoned(&o).clone())
    }

    /// Snapshot of the best ask order.
    pub fn best_ask(&self) -> Option<Order> {
        let inner = lock_unpoisoned(&self.inner);
        inner.asks.best_order().map(|o| lock_unpoisoned(&o).clone())
    }

    pub fn best_bid_price(&self) -> Option<Price> {
        lock_unpoisoned(&self.inner).best_bid_price()
    }

    pub fn best_ask_price(&self) -> Option<Price> {
        lock_unpoisoned(&self.inner).best_ask_price()
    }

    /// `best_ask - best_bid`; None when either side is empty.
    pub fn spread(&self) -> Option<Decimal> {
        lock_unpoisoned(&self.inner).spread()
    }

    /// `(best_bid + best_ask) / 2`; None when either side is empty.
    pub fn mid_price(&self) -> Option<Decimal> {
        lock_unpoisoned(&self.inner).mid_price()
    }

    /// Up to `n` best levels per side: `(bids, asks)`, best first.
    pub fn top_levels(&self, n: usize) -> (Vec<LevelSnapshot>, Vec<LevelSnapshot>) {
        let inner = lock_unpoisoned(&self.inner);
        (inner.bids.top_levels(n), inner.asks.top_levels(n))
    }

    /// Record a trade in the book's bounded ring.
    pub fn append_trade(&self, trade: Trade) {
        lock_unpoisoned(&self.inner).push_trade(trade);
    }

    /// The most recent `count` trades, oldest first.
    pub fn recent_trades(&self, count: usize) -> Vec<Trade> {
        let inner = lock_unpoisoned(&self.inner);
        let len = inner.trades.len();
        inner.trades.iter().skip(len.saturating_sub(count)).cloned().collect()
    }

    /// Total resting volume at one price on one side.
    pub fn volume_at(&self, price: Price, side: Side) -> u64 {
        let inner = lock_unpoisoned(&self.inner);
        match side {
            Side::Buy => inner.bids.volume_at(price),
            Side::Sell => inner.asks.volume_at(price),
        }
    }

    /// A book is crossed when `best_bid >= best_ask` with both present.
    /// Only transient inside the matcher; never observable at quiescence.
    pub fn is_crossed(&self) -> bool {
        lock_unpoisoned(&self.inner).is_crossed()
    }

    /// Drop all resting orders and trade history.
    pub fn clear(&self) {
        let mut inner = lock_unpoisoned(&self.inner);
        inner.bids.clear();
        inner.asks.clear();
        inner.trades.clear();
    }

    /// Complete point-in-time view with up to `depth` levels per side.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let inner = lock_unpoisoned(&self.inner);
        BookSnapshot {
            symbol: self.symbol.clone(),
            timestamp: Utc::now(),
            bids: inner.bids.top_levels(depth),
            asks: inner.asks.top_levels(depth),
            best_bid: inner.best_bid_price(),
            best_ask: inner.best_ask_price(),
            spread: inner.spread(),
            mid_price: inner.mid_price(),
        }
    }

    /// Depth view with cumulative volume down each side: `(bids, asks)`.
    pub fn market_depth(&self, depth: usize) -> (Vec<DepthLevel>, Vec<DepthLevel>) {
        let (bids, asks) = self.top_levels(depth);
        (accumulate(bids), accumulate(asks))
    }

    /// Aggregate statistics for the book.
    pub fn statistics(&self) -> BookStatistics {
        let inner = lock_unpoisoned(&self.inner);
        BookStatistics {
            symbol: self.symbol.clone(),
            total_bid_volume: inner.bids.total_volume(),
            total_ask_volume: inner.asks.total_volume(),
            bid_levels: inner.bids.level_count(),
            ask_levels: inner.asks.level_count(),
            total_orders: inner.bids.order_count() + inner.asks.order_count(),
            spread: inner.spread(),
            mid_price: inner.mid_price(),
            is_crossed: inner.is_crossed(),
        }
    }

    /// Run `f` with exclusive access to the book internals. Matcher only.
    pub(crate) fn with_inner<R>(&self, f: impl FnOnce(&mut BookInner) -> R) -> R {
        let mut inner = lock_unpoisoned(&self.inner);
        f(&mut inner)
    }
}

fn accumulate(levels: Vec<LevelSnapshot>) -> Vec<DepthLevel> {
    let mut cumulative = 0u64;
    levels
        .into_iter()
        .map(|level| {
            cumulative += level.quantity;
            DepthLevel {
                price: level.price,
                quantity: level.quantity,
                order_count: level.order_count,
                cumulative_volume: cumulative,
            }
        })
        .collect()
}
