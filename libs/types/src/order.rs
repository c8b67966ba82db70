//! Order lifecycle types
//!
//! An order is immutable except for fill accounting and status. Fills are
//! applied only by the matcher; cancellation only through the engine.
//! Status runs `Pending -> PartiallyFilled -> Filled`, or any active state
//! to `Cancelled`. `Filled` and `Cancelled` are terminal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{OrderError, SubmitError};
use crate::ids::{OrderId, Symbol, TraderId};
use crate::numeric::Price;

/// Order side (buyer or seller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Parse a side label case-insensitively (`BUY`/`SELL`).
    pub fn parse(s: &str) -> Result<Self, SubmitError> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(SubmitError::UnknownSide(other.to_string())),
        }
    }

    /// The canonical uppercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted and awaiting matching.
    Pending,
    /// Some quantity executed, remainder still working.
    PartiallyFilled,
    /// Completely executed (terminal).
    Filled,
    /// Cancelled with remaining quantity (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Check whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// A single execution against part or all of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub quantity: u64,
    pub price: Price,
    pub time: DateTime<Utc>,
}

/// A limit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub trader_id: TraderId,
    pub symbol: Symbol,
    pub side: Side,
    pub original_quantity: u64,
    pub remaining_quantity: u64,
    pub price: Price,
    pub status: OrderStatus,
    /// Tie-breaker for time priority at a price level.
    pub submit_time: DateTime<Utc>,
    /// Executions in the order they happened.
    pub fills: Vec<Fill>,
}

impl Order {
    /// Create a new pending order, validating the submission.
    pub fn new(
        trader_id: TraderId,
        symbol: Symbol,
        side: Side,
        quantity: u64,
        price: Price,
    ) -> Result<Self, SubmitError> {
        if trader_id.is_empty() {
            return Err(SubmitError::EmptyTraderId);
        }
        if symbol.is_empty() {
            return Err(SubmitError::EmptySymbol);
        }
        if quantity == 0 {
            return Err(SubmitError::InvalidQuantity);
        }

        Ok(Self {
            order_id: OrderId::new(),
            trader_id,
            symbol,
            side,
            original_quantity: quantity,
            remaining_quantity: quantity,
            price,
            status: OrderStatus::Pending,
            submit_time: Utc::now(),
            fills: Vec::new(),
        })
    }

    /// Apply a fill of `quantity` shares at `price`.
    ///
    /// Errors (and leaves the order untouched) if the quantity is zero,
    /// exceeds the remainder, or the order is already terminal.
    pub fn fill(&mut self, quantity: u64, price: Price) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::Terminal { status: self.status });
        }
        if quantity == 0 {
            return Err(OrderError::ZeroFill);
        }
        if quantity > self.remaining_quantity {
            return Err(OrderError::Overfill {
                requested: quantity,
                remaining: self.remaining_quantity,
            });
        }

        self.fills.push(Fill {
            quantity,
            price,
            time: Utc::now(),
        });
        self.remaining_quantity -= quantity;
        self.status = if self.remaining_quantity == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };

        debug_assert!(self.check_invariant(), "fill accounting out of balance");
        Ok(())
    }

    /// Cancel the order. Only succeeds from active states; terminal states
    /// are left untouched and return false.
    pub fn cancel(&mut self) -> bool {
        if self.is_active() {
            self.status = OrderStatus::Cancelled;
            true
        } else {
            false
        }
    }

    /// Total executed quantity.
    pub fn filled_quantity(&self) -> u64 {
        self.fills.iter().map(|f| f.quantity).sum()
    }

    /// Volume-weighted average fill price, zero when nothing has filled.
    pub fn average_fill_price(&self) -> Decimal {
        let total_quantity = self.filled_quantity();
        if total_quantity == 0 {
            return Decimal::ZERO;
        }
        let total_value: Decimal = self.fills.iter().map(|f| f.price.value_of(f.quantity)).sum();
        total_value / Decimal::from(total_quantity)
    }

    /// Whether the order can still fill.
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::PartiallyFilled)
    }

    /// Whether the order is completely executed.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Conservation check: fills + remainder account for the original size.
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity() + self.remaining_quantity == self.original_quantity
    }
}
