//! Fill notification seam
//!
//! The engine notifies traders of executions through this trait. Callbacks
//! run on the matcher thread: they must not block, and they must not call
//! back into the engine synchronously except to enqueue via `submit`.

use types::{Order, Price, TraderId};

/// Receives fill notifications for one trader id.
///
/// The engine holds registered listeners weakly, so a dropped trader is
/// unregistered implicitly. For a single trade the buyer's listener fires
/// before the seller's, and both fire before any later trade's callbacks.
pub trait FillListener: Send + Sync {
    /// The trader id this listener accounts for.
    fn trader_id(&self) -> &TraderId;

    /// Called once per fill event with a snapshot of the affected order,
    /// the executed quantity, and the execution price.
    fn on_fill(&self, order: &Order, quantity: u64, price: Price);
}
