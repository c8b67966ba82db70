//! Crossing detection
//!
//! Determines when an incoming order can trade against a resting order
//! based on price compatibility.

use types::{Price, Side};

/// Check whether an incoming order crosses a resting order's price.
///
/// A buy crosses when its limit is at or above the resting ask; a sell
/// crosses when its limit is at or below the resting bid.
pub fn crosses(incoming_side: Side, incoming_price: Price, resting_price: Price) -> bool {
    match incoming_side {
        Side::Buy => incoming_price >= resting_price,
        Side::Sell => incoming_price <= resting_price,
    }
}
