//! Random trader agent
//!
//! An autonomous agent that generates limit orders against the engine on
//! its own timer. Decisions come from a per-agent seeded RNG, so a given
//! seed reproduces the same order stream against the same book state.
//!
//! Each tick: pick a symbol, estimate a reference price (a private random
//! walk starting at $100, floored at $1), choose a side with a
//! position-dependent bias, draw a size and a price around the reference,
//! clamp to what cash and inventory allow, and submit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use matching_engine::{FillListener, MatchingEngine};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::{Order, Price, Side, Symbol, TraderId};

use crate::bots::portfolio::Portfolio;

/// Agent tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderConfig {
    /// Smallest order the agent will submit.
    pub min_order_size: u64,
    /// Largest order the agent will submit.
    pub max_order_size: u64,
    /// Half-width of the uniform price perturbation around the reference.
    pub volatility: f64,
    /// Minimum tick inter-arrival, milliseconds.
    pub min_delay_ms: u64,
    /// Maximum tick inter-arrival, milliseconds.
    pub max_delay_ms: u64,
    /// Reference price a symbol starts at.
    pub initial_reference: f64,
    /// Floor for the reference price walk.
    pub min_reference: f64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            min_order_size: 10,
            max_order_size: 100,
            volatility: 0.02,
            min_delay_ms: 50,
            max_delay_ms: 500,
            initial_reference: 100.0,
            min_reference: 1.0,
        }
    }
}

impl TraderConfig {
    /// High-frequency profile: smaller clips, faster ticks.
    pub fn hft() -> Self {
        Self {
            min_order_size: 5,
            max_order_size: 50,
            min_delay_ms: 10,
            max_delay_ms: 50,
            ..Self::default()
        }
    }
}

/// Snapshot of a trader's performance.
#[derive(Debug, Clone, Serialize)]
pub struct TraderStats {
    pub trader_id: TraderId,
    pub initial_cash: Decimal,
    pub cash: Decimal,
    pub portfolio_value: Decimal,
    pub total_pnl: Decimal,
    pub orders_sent: u64,
    pub orders_filled: u64,
    pub total_volume: u64,
    pub fill_rate: f64,
    pub positions: BTreeMap<String, i64>,
}

struct TraderInner {
    portfolio: Portfolio,
    reference_prices: HashMap<Symbol, f64>,
    rng: ChaCha8Rng,
}

/// A synthetic trader agent.
pub struct RandomTrader {
    trader_id: TraderId,
    symbols: Vec<Symbol>,
    config: TraderConfig,
    engine: Arc<MatchingEngine>,
    inner: Mutex<TraderInner>,
    active: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RandomTrader {
    /// Create an agent. The caller registers it with the engine so the
    /// engine holds only a weak reference back.
    pub fn new(
        trader_id: TraderId,
        initial_cash: Decimal,
        symbols: Vec<Symbol>,
        engine: Arc<MatchingEngine>,
        config: TraderConfig,
        seed: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            trader_id,
            symbols,
            config,
            engine,
            inner: Mutex::new(TraderInner {
                portfolio: Portfolio::new(initial_cash),
                reference_prices: HashMap::new(),
                rng: ChaCha8Rng::seed_from_u64(seed),
            }),
            active: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    pub fn trader_id(&self) -> &TraderId {
        &self.trader_id
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Start the tick timer. No-op when already trading.
    pub fn start_trading(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::AcqRel) {
            return;
        }
        let trader = Arc::clone(self);
        *lock(&self.worker) = Some(thread::spawn(move || trader.run_loop()));
        debug!(trader = %self.trader_id, "trading started");
    }

    /// Halt the tick timer. Resting orders are not retracted.
    pub fn stop_trading(&self) {
        self.active.store(false, Ordering::Release);
        if let Some(worker) = lock(&self.worker).take() {
            if worker.join().is_err() {
                warn!(trader = %self.trader_id, "trader worker panicked");
            }
        }
        debug!(trader = %self.trader_id, "trading stopped");
    }

    pub fn is_trading(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn run_loop(&self) {
        while self.active.load(Ordering::Acquire) {
            let delay_ms = {
                let mut inner = lock(&self.inner);
                let (lo, hi) = (self.config.min_delay_ms, self.config.max_delay_ms.max(self.config.min_delay_ms));
                inner.rng.gen_range(lo..=hi)
            };

            // Sleep in slices so stop_trading returns promptly.
            let deadline = Instant::now() + Duration::from_millis(delay_ms);
            while Instant::now() < deadline {
                if !self.active.load(Ordering::Acquire) {
                    return;
                }
                thread::sleep(Duration::from_millis(10));
            }

            if self.active.load(Ordering::Acquire) {
                self.tick();
            }
        }
    }

    /// One decision cycle. Returns whether an order was submitted; a tick
    /// whose clamped size falls below the minimum is skipped.
    pub fn tick(&self) -> bool {
        if self.symbols.is_empty() {
            return false;
        }

        let order = {
            let mut inner = lock(&self.inner);
            self.build_order(&mut inner)
        };

        // Submit outside the portfolio guard: the fill callback takes it.
        match order {
            Some(order) => {
                self.engine.submit(order);
                lock(&self.inner).portfolio.record_order_sent();
                true
            }
            None => false,
        }
    }

    fn build_order(&self, inner: &mut TraderInner) -> Option<Order> {
        let symbol = self.symbols[inner.rng.gen_range(0..self.symbols.len())].clone();
        let reference = self.reference_price(inner, &symbol);
        let side = self.decide_side(inner, &symbol);

        let mut quantity = inner.rng.gen_range(self.config.min_order_size..=self.config.max_order_size);

        // Bid below the reference, ask above it.
        let variation: f64 = inner.rng.gen_range(-self.config.volatility..=self.config.volatility);
        let raw_price = match side {
            Side::Buy => reference * (1.0 - variation.abs()),
            Side::Sell => reference * (1.0 + variation.abs()),
        };
        let price = Price::from_f64_cents(raw_price)?;

        match side {
            Side::Buy => {
                // Shrink to what cash affords; skip if that is sub-minimum.
                if price.value_of(quantity) > inner.portfolio.cash() {
                    let affordable = (inner.portfolio.cash() / price.as_decimal())
                        .floor()
                        .to_u64()
                        .unwrap_or(0);
                    if affordable < self.config.min_order_size {
                        return None;
                    }
                    quantity = affordable;
                }
            }
            Side::Sell => {
                // Never sell more than the position holds.
                let held = inner.portfolio.position(&symbol);
                if quantity as i64 > held {
                    if held < self.config.min_order_size as i64 {
                        return None;
                    }
                    quantity = held as u64;
                }
            }
        }

        match Order::new(self.trader_id.clone(), symbol, side, quantity, price) {
            Ok(order) => Some(order),
            Err(err) => {
                warn!(trader = %self.trader_id, %err, "generated order rejected");
                None
            }
        }
    }

    /// Private reference-price walk: ±1% per step, floored. It ignores the
    /// real book, so valuations track this walk rather than executions.
    fn reference_price(&self, inner: &mut TraderInner, symbol: &Symbol) -> f64 {
        let current = inner
            .reference_prices
            .get(symbol)
            .copied()
            .unwrap_or(self.config.initial_reference);
        let change = (inner.rng.gen::<f64>() - 0.5) * 0.02;
        let next = (current * (1.0 + change)).max(self.config.min_reference);
        inner.reference_prices.insert(symbol.clone(), next);
        next
    }

    /// Large position leans toward selling; a flat book leans toward
    /// buying; anything in between is a coin flip.
    fn decide_side(&self, inner: &mut TraderInner, symbol: &Symbol) -> Side {
        let position = inner.portfolio.position(symbol);
        if position > 500 {
            if inner.rng.gen_bool(0.7) { Side::Sell } else { Side::Buy }
        } else if position == 0 {
            if inner.rng.gen_bool(0.7) { Side::Buy } else { Side::Sell }
        } else if inner.rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    pub fn cash(&self) -> Decimal {
        lock(&self.inner).portfolio.cash()
    }

    pub fn position(&self, symbol: &Symbol) -> i64 {
        lock(&self.inner).portfolio.position(symbol)
    }

    pub fn average_cost(&self, symbol: &Symbol) -> Decimal {
        lock(&self.inner).portfolio.average_cost(symbol)
    }

    /// Cash plus positions marked at each symbol's reference price.
    pub fn portfolio_value(&self) -> Decimal {
        let mut inner = lock(&self.inner);
        let held: Vec<(Symbol, i64)> = inner
            .portfolio
            .positions()
            .map(|(s, p)| (s.clone(), p))
            .filter(|(_, p)| *p != 0)
            .collect();

        let mut total = inner.portfolio.cash();
        for (symbol, position) in held {
            let reference = self.reference_price(&mut inner, &symbol);
            total += Decimal::from(position)
                * Decimal::from_f64(reference).unwrap_or(Decimal::ZERO);
        }
        total
    }

    pub fn total_pnl(&self) -> Decimal {
        self.portfolio_value() - lock(&self.inner).portfolio.initial_cash()
    }

    pub fn position_pnl(&self, symbol: &Symbol) -> Decimal {
        let mut inner = lock(&self.inner);
        if inner.portfolio.position(symbol) == 0 {
            return Decimal::ZERO;
        }
        let reference = self.reference_price(&mut inner, symbol);
        inner
            .portfolio
            .position_pnl(symbol, Decimal::from_f64(reference).unwrap_or(Decimal::ZERO))
    }

    /// Snapshot of this trader's performance.
    pub fn stats(&self) -> TraderStats {
        let portfolio_value = self.portfolio_value();
        let inner = lock(&self.inner);
        let portfolio = &inner.portfolio;
        let sent = portfolio.orders_sent();
        TraderStats {
            trader_id: self.trader_id.clone(),
            initial_cash: portfolio.initial_cash(),
            cash: portfolio.cash(),
            portfolio_value,
            total_pnl: portfolio_value - portfolio.initial_cash(),
            orders_sent: sent,
            orders_filled: portfolio.orders_filled(),
            total_volume: portfolio.total_volume(),
            fill_rate: portfolio.orders_filled() as f64 / sent.max(1) as f64,
            positions: portfolio
                .positions()
                .map(|(s, p)| (s.to_string(), p))
                .collect(),
        }
    }
}

impl FillListener for RandomTrader {
    fn trader_id(&self) -> &TraderId {
        &self.trader_id
    }

    fn on_fill(&self, order: &Order, quantity: u64, price: Price) {
        let mut inner = lock(&self.inner);
        match order.side {
            Side::Buy => inner.portfolio.apply_buy(&order.symbol, quantity, price),
            Side::Sell => inner.portfolio.apply_sell(&order.symbol, quantity, price),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
