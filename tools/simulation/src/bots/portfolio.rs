//! Trader portfolio accounting
//!
//! Cash, per-symbol positions, average cost basis, and fill counters.
//! Buy fills re-weight the cost basis; a position returning to flat resets
//! it. Positions may go negative only through externally injected orders
//! (CSV); agent-generated flow is clamped before submission.

use std::collections::HashMap;

use rust_decimal::Decimal;
use types::{Price, Symbol};

/// One trader's cash, positions, and counters.
#[derive(Debug, Clone)]
pub struct Portfolio {
    initial_cash: Decimal,
    cash: Decimal,
    positions: HashMap<Symbol, i64>,
    average_costs: HashMap<Symbol, Decimal>,
    orders_sent: u64,
    orders_filled: u64,
    total_volume: u64,
}

impl Portfolio {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            positions: HashMap::new(),
            average_costs: HashMap::new(),
            orders_sent: 0,
            orders_filled: 0,
            total_volume: 0,
        }
    }

    /// Account for a buy fill: pay cash, grow the position, re-weight the
    /// average cost with the new lot.
    pub fn apply_buy(&mut self, symbol: &Symbol, quantity: u64, price: Price) {
        let cost = price.value_of(quantity);
        self.cash -= cost;

        let old_position = self.position(symbol);
        let old_basis = self.average_cost(symbol) * Decimal::from(old_position);
        let new_position = old_position + quantity as i64;

        self.positions.insert(symbol.clone(), new_position);
        if new_position > 0 {
            self.average_costs
                .insert(symbol.clone(), (old_basis + cost) / Decimal::from(new_position));
        }

        self.orders_filled += 1;
        self.total_volume += quantity;
    }

    /// Account for a sell fill: collect cash, shrink the position, reset
    /// the cost basis when the position reaches exactly zero.
    pub fn apply_sell(&mut self, symbol: &Symbol, quantity: u64, price: Price) {
        let proceeds = price.value_of(quantity);
        self.cash += proceeds;

        let new_position = self.position(symbol) - quantity as i64;
        self.positions.insert(symbol.clone(), new_position);
        if new_position == 0 {
            self.average_costs.insert(symbol.clone(), Decimal::ZERO);
        }

        self.orders_filled += 1;
        self.total_volume += quantity;
    }

    pub fn record_order_sent(&mut self) {
        self.orders_sent += 1;
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    pub fn position(&self, symbol: &Symbol) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn average_cost(&self, symbol: &Symbol) -> Decimal {
        self.average_costs.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&Symbol, i64)> {
        self.positions.iter().map(|(s, p)| (s, *p))
    }

    pub fn orders_sent(&self) -> u64 {
        self.orders_sent
    }

    pub fn orders_filled(&self) -> u64 {
        self.orders_filled
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    /// Cash plus every position marked at its reference price.
    pub fn value(&self, mut reference: impl FnMut(&Symbol) -> Decimal) -> Decimal {
        let mut total = self.cash;
        for (symbol, position) in &self.positions {
            if *position != 0 {
                total += Decimal::from(*position) * reference(symbol);
            }
        }
        total
    }

    /// Unrealized P&L for one symbol against a reference price.
    pub fn position_pnl(&self, symbol: &Symbol, reference: Decimal) -> Decimal {
        let position = Decimal::from(self.position(symbol));
        position * reference - position * self.average_cost(symbol)
    }
}
