//! Engine performance counters
//!
//! Torn-read-free counters (atomics plus a small guarded latency window)
//! and the snapshot types the engine publishes: rolling orders-per-second
//! sampled at 1 Hz, mean latency over the most recent window of
//! processing-time samples, and cumulative trade throughput.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::Serialize;
use types::{Price, Symbol, Trade};

use crate::lock_unpoisoned;
use crate::order_book::BookStatistics;

/// Number of per-order latency samples retained for the rolling mean.
pub const LATENCY_WINDOW: usize = 1000;

/// Published engine performance snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub total_trades: u64,
    pub total_volume: u64,
    /// Cumulative: total trades over engine uptime.
    pub trades_per_second: f64,
    /// Rolling: orders processed since the previous 1 Hz sample.
    pub orders_per_second: f64,
    /// Mean over the most recent latency window, in milliseconds.
    pub avg_latency_ms: f64,
    pub active_orders: usize,
    pub symbols_active: usize,
    pub runtime_seconds: f64,
}

/// Per-symbol market summary.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolSummary {
    pub symbol: Symbol,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub spread: Option<Decimal>,
    pub mid_price: Option<Decimal>,
    /// Volume-weighted average price of the recent trade tail.
    pub vwap: Decimal,
    /// Total resting volume, both sides.
    pub volume: u64,
    pub trade_count: usize,
}

/// Detailed per-symbol statistics over the recent trade tail.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolStatistics {
    pub symbol: Symbol,
    pub last_price: Option<Price>,
    pub high_price: Option<Price>,
    pub low_price: Option<Price>,
    pub vwap: Decimal,
    pub total_volume: u64,
    pub trade_count: usize,
    pub book: BookStatistics,
}

/// Volume-weighted average price over a set of trades; zero when empty.
pub fn vwap(trades: &[Trade]) -> Decimal {
    let total_volume: u64 = trades.iter().map(|t| t.quantity).sum();
    if total_volume == 0 {
        return Decimal::ZERO;
    }
    let total_value: Decimal = trades.iter().map(|t| t.value()).sum();
    total_value / Decimal::from(total_volume)
}

/// Rolling latency window with oldest-wins eviction.
#[derive(Debug)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, millis: f64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(millis);
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

struct RateSample {
    last_tick: Instant,
    orders_since_tick: u64,
    orders_per_second: f64,
}

/// Shared engine counters. Writers are the matcher thread; readers are
/// observers, which never see torn values.
pub(crate) struct EngineCounters {
    total_trades: AtomicU64,
    total_volume: AtomicU64,
    orders_processed: AtomicU64,
    rate: Mutex<RateSample>,
    latency: Mutex<LatencyWindow>,
    started: Mutex<Instant>,
}

impl EngineCounters {
    pub(crate) fn new() -> Self {
        Self {
            total_trades: AtomicU64::new(0),
            total_volume: AtomicU64::new(0),
            orders_processed: AtomicU64::new(0),
            rate: Mutex::new(RateSample {
                last_tick: Instant::now(),
                orders_since_tick: 0,
                orders_per_second: 0.0,
            }),
            latency: Mutex::new(LatencyWindow::new(LATENCY_WINDOW)),
            started: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn record_trade(&self, quantity: u64) {
        self.total_trades.fetch_add(1, Ordering::Relaxed);
        self.total_volume.fetch_add(quantity, Ordering::Relaxed);
    }

    pub(crate) fn record_order(&self, processing_time: Duration) {
        self.orders_processed.fetch_add(1, Ordering::Relaxed);
        lock_unpoisoned(&self.rate).orders_since_tick += 1;
        lock_unpoisoned(&self.latency).record(processing_time.as_secs_f64() * 1000.0);
    }

    /// Resample the rolling order rate if at least a second has elapsed.
    /// Returns true when a new sample was taken (time to publish).
    pub(crate) fn tick_if_due(&self) -> bool {
        let mut rate = lock_unpoisoned(&self.rate);
        let elapsed = rate.last_tick.elapsed();
        if elapsed < Duration::from_secs(1) {
            return false;
        }
        rate.orders_per_second = rate.orders_since_tick as f64 / elapsed.as_secs_f64();
        rate.orders_since_tick = 0;
        rate.last_tick = Instant::now();
        true
    }

    pub(crate) fn total_trades(&self) -> u64 {
        self.total_trades.load(Ordering::Relaxed)
    }

    pub(crate) fn orders_processed(&self) -> u64 {
        self.orders_processed.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self, active_orders: usize, symbols_active: usize) -> PerformanceStats {
        let total_trades = self.total_trades.load(Ordering::Relaxed);
        let runtime = lock_unpoisoned(&self.started).elapsed().as_secs_f64();
        PerformanceStats {
            total_trades,
            total_volume: self.total_volume.load(Ordering::Relaxed),
            trades_per_second: total_trades as f64 / runtime.max(1.0),
            orders_per_second: lock_unpoisoned(&self.rate).orders_per_second,
            avg_latency_ms: lock_unpoisoned(&self.latency).average(),
            active_orders,
            symbols_active,
            runtime_seconds: runtime,
        }
    }

    pub(crate) fn reset(&self) {
        self.total_trades.store(0, Ordering::Relaxed);
        self.total_volume.store(0, Ordering::Relaxed);
        self.orders_processed.store(0, Ordering::Relaxed);
        let mut rate = lock_unpoisoned(&self.rate);
        rate.orders_since_tick = 0;
        rate.orders_per_second = 0.0;
        rate.last_tick = Instant::now();
        lock_unpoisoned(&self.latency).clear();
        *lock_unpoisoned(&self.started) = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{OrderId, TradeId, TraderId};

    fn trade(quantity: u64, price: u64) -> Trade {
        Trade::new(
            TradeId::new(1),
            Symbol::new("AAPL"),
            quantity,
            Price::from_u64(price),
            TraderId::new("B"),
            TraderId::new("S"),
            OrderId::new(),
            OrderId::new(),
        )
    }

    #[test]
    fn test_latency_window_eviction() {
        let mut window = LatencyWindow::new(3);
        window.record(10.0);
        window.record(20.0);
        window.record(30.0);
        window.record(40.0); // evicts 10.0

        assert_eq!(window.len(), 3);
        assert!((window.average() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_latency_window_empty_average() {
        let window = LatencyWindow::new(10);
        assert_eq!(window.average(), 0.0);
    }

    #[test]
    fn test_counters_accumulate() {
        let counters = EngineCounters::new();
        counters.record_trade(10);
        counters.record_trade(25);
        counters.record_order(Duration::from_micros(500));

        let stats = counters.snapshot(3, 2);
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.total_volume, 35);
        assert_eq!(stats.active_orders, 3);
        assert_eq!(stats.symbols_active, 2);
        assert!(stats.avg_latency_ms > 0.0);
    }

    #[test]
    fn test_tick_not_due_immediately() {
        let counters = EngineCounters::new();
        counters.record_order(Duration::from_micros(100));
        assert!(!counters.tick_if_due());
    }

    #[test]
    fn test_reset() {
        let counters = EngineCounters::new();
        counters.record_trade(10);
        counters.record_order(Duration::from_micros(100));

        counters.reset();
        let stats = counters.snapshot(0, 0);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.total_volume, 0);
        assert_eq!(stats.avg_latency_ms, 0.0);
        assert_eq!(counters.orders_processed(), 0);
    }

    #[test]
    fn test_vwap() {
        let trades = vec![trade(10, 100), trade(30, 104)];
        // (1000 + 3120) / 40 = 103
        assert_eq!(vwap(&trades), Decimal::from(103));
        assert_eq!(vwap(&[]), Decimal::ZERO);
    }
}
