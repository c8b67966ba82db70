//! Trade record
//!
//! An immutable execution between a buy and a sell order. Trade ids are
//! assigned by the engine, strictly increasing in emit order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{OrderId, Symbol, TradeId, TraderId};
use crate::numeric::Price;
use crate::order::Side;

/// A single execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub quantity: u64,
    pub price: Price,
    pub buyer_id: TraderId,
    pub seller_id: TraderId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    /// Exported side label. The legacy export contract pins this to `BUY`
    /// regardless of which side was aggressive.
    pub side: Side,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: TradeId,
        symbol: Symbol,
        quantity: u64,
        price: Price,
        buyer_id: TraderId,
        seller_id: TraderId,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
    ) -> Self {
        Self {
            trade_id,
            timestamp: Utc::now(),
            symbol,
            quantity,
            price,
            buyer_id,
            seller_id,
            buy_order_id,
            sell_order_id,
            side: Side::Buy,
        }
    }

    /// Trade value (price × quantity).
    pub fn value(&self) -> Decimal {
        self.price.value_of(self.quantity)
    }
}
