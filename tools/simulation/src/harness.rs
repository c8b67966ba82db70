//! Simulation harness
//!
//! Wires an engine to a fleet of random trader agents: builds and
//! registers the agents, starts and stops everything in the right order,
//! and aggregates per-trader statistics.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use matching_engine::{FillListener, MatchingEngine};
use rust_decimal::Decimal;
use tracing::info;
use types::{Symbol, TraderId};

use crate::bots::{RandomTrader, TraderConfig, TraderStats};

/// Fleet configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub symbols: Vec<String>,
    pub trader_count: usize,
    pub initial_cash: Decimal,
    pub trader_config: TraderConfig,
    /// Base RNG seed; trader `i` gets `seed + i`.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["AAPL".to_string(), "GOOGL".to_string(), "MSFT".to_string()],
            trader_count: 4,
            initial_cash: Decimal::from(100_000),
            trader_config: TraderConfig::default(),
            seed: 42,
        }
    }
}

/// An engine plus its registered agent fleet.
pub struct Simulation {
    engine: Arc<MatchingEngine>,
    traders: Vec<Arc<RandomTrader>>,
}

impl Simulation {
    /// Build the engine and agents and register every agent's fill
    /// listener. Nothing runs until [`start`](Simulation::start).
    pub fn new(config: SimulationConfig) -> Self {
        let engine = MatchingEngine::new();
        let symbols: Vec<Symbol> = config.symbols.iter().map(Symbol::new).collect();

        let traders: Vec<Arc<RandomTrader>> = (0..config.trader_count)
            .map(|i| {
                let trader = RandomTrader::new(
                    TraderId::new(format!("TRADER_{:03}", i + 1)),
                    config.initial_cash,
                    symbols.clone(),
                    engine.clone(),
                    config.trader_config.clone(),
                    config.seed + i as u64,
                );
                engine.register_trader(&(trader.clone() as Arc<dyn FillListener>));
                trader
            })
            .collect();

        info!(traders = traders.len(), symbols = symbols.len(), "simulation built");
        Self { engine, traders }
    }

    /// Start the engine, then the agents.
    pub fn start(&self) {
        self.engine.start();
        for trader in &self.traders {
            trader.start_trading();
        }
    }

    /// Stop the agents, drain the queue, then stop the engine.
    pub fn stop(&self) {
        for trader in &self.traders {
            trader.stop_trading();
        }
        self.engine.wait_until_idle(Duration::from_secs(5));
        self.engine.stop();
    }

    /// Run the fleet for `duration`, then stop it.
    pub fn run_for(&self, duration: Duration) {
        self.start();
        thread::sleep(duration);
        self.stop();
    }

    pub fn engine(&self) -> &Arc<MatchingEngine> {
        &self.engine
    }

    pub fn traders(&self) -> &[Arc<RandomTrader>] {
        &self.traders
    }

    /// Per-trader performance snapshots.
    pub fn trader_stats(&self) -> Vec<TraderStats> {
        self.traders.iter().map(|t| t.stats()).collect()
    }

    /// Orders sent across the fleet.
    pub fn total_orders_sent(&self) -> u64 {
        self.trader_stats().iter().map(|s| s.orders_sent).sum()
    }
}
