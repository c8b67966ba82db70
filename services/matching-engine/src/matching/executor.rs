//! Trade execution
//!
//! Fills both sides of a match and builds the trade record. Trade ids come
//! from a monotonic counter owned by the executor, so ids strictly increase
//! in execution order.

use types::{Order, OrderError, Price, Side, Symbol, Trade, TradeId};

use crate::{lock_unpoisoned, SharedOrder};

/// Builds trades and assigns monotonic trade ids.
pub struct TradeExecutor {
    next_trade_id: u64,
}

impl TradeExecutor {
    /// Create an executor whose first trade id is `000001`.
    pub fn new() -> Self {
        Self { next_trade_id: 1 }
    }

    /// Number of trades executed so far.
    pub fn trades_executed(&self) -> u64 {
        self.next_trade_id - 1
    }

    /// Reset the id counter (engine `clear`).
    pub fn reset(&mut self) {
        self.next_trade_id = 1;
    }

    /// Execute `quantity` at `price` between an incoming and a resting
    /// order, at the resting (maker) price.
    ///
    /// Both orders are filled; the buyer/seller roles on the trade come
    /// from the orders' sides, regardless of which was aggressive. A fill
    /// that would violate an order's contract leaves the incoming order
    /// untouched and yields the error.
    pub fn execute(
        &mut self,
        symbol: &Symbol,
        incoming: &SharedOrder,
        resting: &SharedOrder,
        quantity: u64,
        price: Price,
    ) -> Result<Trade, OrderError> {
        // Fill the resting side first so a contract failure there leaves
        // the incoming order clean.
        let (resting_side, resting_trader, resting_order_id) = {
            let mut o = lock_unpoisoned(resting);
            o.fill(quantity, price)?;
            (o.side, o.trader_id.clone(), o.order_id)
        };
        let (incoming_trader, incoming_order_id) = {
            let mut o = lock_unpoisoned(incoming);
            o.fill(quantity, price)?;
            (o.trader_id.clone(), o.order_id)
        };

        let trade_id = TradeId::new(self.next_trade_id);
        self.next_trade_id += 1;

        let (buyer_id, seller_id, buy_order_id, sell_order_id) = match resting_side {
            Side::Sell => (incoming_trader, resting_trader, incoming_order_id, resting_order_id),
            Side::Buy => (resting_trader, incoming_trader, resting_order_id, incoming_order_id),
        };

        Ok(Trade::new(
            trade_id,
            symbol.clone(),
            quantity,
            price,
            buyer_id,
            seller_id,
            buy_order_id,
            sell_order_id,
        ))
    }
}

impl Default for TradeExecutor {
    fn default() -> Self {
        Self::new()
    }
}
