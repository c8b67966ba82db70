//! One side of an order book
//!
//! Price levels in a `BTreeMap` so iteration order is deterministic: for
//! bids the best price is the highest key, for asks the lowest. A side-level
//! id index makes cancellation a map lookup plus a short scan of one level.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use types::{Order, OrderId, Price, Side};

use crate::book::price_level::PriceLevel;
use crate::{lock_unpoisoned, SharedOrder};

/// Aggregated view of one price level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSnapshot {
    pub price: Price,
    pub quantity: u64,
    pub order_count: usize,
}

/// One side (bid or ask) of a single symbol's book.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
    orders: HashMap<OrderId, SharedOrder>,
}

impl BookSide {
    /// Create an empty side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            orders: HashMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Add a resting order: append to its level's FIFO and index it by id.
    pub fn add(&mut self, order: SharedOrder) {
        let (order_id, price, side) = {
            let o = lock_unpoisoned(&order);
            (o.order_id, o.price, o.side)
        };
        debug_assert_eq!(side, self.side, "order routed to the wrong side");

        self.levels.entry(price).or_default().push(order.clone());
        self.orders.insert(order_id, order);
    }

    /// Remove an order by id, dropping its level if that empties it.
    ///
    /// Returns the removed handle, or None for an unknown id.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<SharedOrder> {
        let order = self.orders.remove(order_id)?;
        let price = lock_unpoisoned(&order).price;

        if let Some(level) = self.levels.get_mut(&price) {
            level.remove(order_id);
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
        Some(order)
    }

    /// The best price on this side: highest for bids, lowest for asks.
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// The best order: front of the FIFO at the best price.
    pub fn best_order(&self) -> Option<SharedOrder> {
        self.best().map(|(_, order)| order)
    }

    /// Best price together with the order at its front.
    pub fn best(&self) -> Option<(Price, SharedOrder)> {
        let price = self.best_price()?;
        let level = self.levels.get(&price)?;
        level.front().map(|order| (price, order.clone()))
    }

    /// Account for a fill of `quantity` against the best order.
    ///
    /// If the front order is now exhausted it is popped from the level and
    /// the id index, and an emptied level is dropped. Returns the popped
    /// order when one was removed.
    pub fn fill_best(&mut self, quantity: u64) -> Option<SharedOrder> {
        let price = self.best_price()?;
        let level = self.levels.get_mut(&price)?;
        level.record_front_fill(quantity);

        let exhausted = level
            .front()
            .map(|o| lock_unpoisoned(o).remaining_quantity == 0)
            .unwrap_or(false);
        if !exhausted {
            return None;
        }

        let popped = level.pop_front();
        if level.is_empty() {
            self.levels.remove(&price);
        }
        if let Some(order) = &popped {
            let order_id = lock_unpoisoned(order).order_id;
            self.orders.remove(&order_id);
        }
        popped
    }

    /// Snapshot of all orders at one price, front first.
    pub fn orders_at(&self, price: Price) -> Vec<Order> {
        self.levels
            .get(&price)
            .map(|level| level.iter().map(|o| lock_unpoisoned(o).clone()).collect())
            .unwrap_or_default()
    }

    /// Total remaining quantity at one price.
    pub fn volume_at(&self, price: Price) -> u64 {
        self.levels.get(&price).map(|l| l.total_quantity()).unwrap_or(0)
    }

    /// Up to `n` best price levels, best first.
    pub fn top_levels(&self, n: usize) -> Vec<LevelSnapshot> {
        let snapshot = |(price, level): (&Price, &PriceLevel)| LevelSnapshot {
            price: *price,
            quantity: level.total_quantity(),
            order_count: level.order_count(),
        };
        match self.side {
            Side::Buy => self.levels.iter().rev().take(n).map(snapshot).collect(),
            Side::Sell => self.levels.iter().take(n).map(snapshot).collect(),
        }
    }

    /// Total remaining quantity across the whole side.
    pub fn total_volume(&self) -> u64 {
        self.levels.values().map(|l| l.total_quantity()).sum()
    }

    /// Whether an order id rests on this side.
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Number of non-empty price levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of resting orders.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.orders.clear();
    }

    /// Consistency check: every cached level aggregate matches its orders,
    /// no empty level is retained, and the index agrees with the levels.
    pub fn audit(&self) -> bool {
        let levels_consistent = self.levels.values().all(|l| !l.is_empty() && l.audit());
        let indexed: usize = self.levels.values().map(|l| l.order_count()).sum();
        levels_consistent && indexed == self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use types::{Symbol, TraderId};

    fn shared(side: Side, quantity: u64, price: u64) -> SharedOrder {
        let order = Order::new(
            TraderId::new("T1"),
            Symbol::new("AAPL"),
            side,
            quantity,
            Price::from_u64(price),
        )
        .unwrap();
        Arc::new(Mutex::new(order))
    }

    #[test]
    fn test_bid_best_is_highest() {
        let mut bids = BookSide::new(Side::Buy);
        bids.add(shared(Side::Buy, 10, 100));
        bids.add(shared(Side::Buy, 10, 102));
        bids.add(shared(Side::Buy, 10, 99));

        assert_eq!(bids.best_price(), Some(Price::from_u64(102)));
        assert!(bids.audit());
    }

    #[test]
    fn test_ask_best_is_lowest() {
        let mut asks = BookSide::new(Side::Sell);
        asks.add(shared(Side::Sell, 10, 101));
        asks.add(shared(Side::Sell, 10, 103));
        asks.add(shared(Side::Sell, 10, 102));

        assert_eq!(asks.best_price(), Some(Price::from_u64(101)));
    }

    #[test]
    fn test_best_order_is_fifo_head() {
        let mut bids = BookSide::new(Side::Buy);
        let first = shared(Side::Buy, 10, 100);
        let first_id = first.lock().unwrap().order_id;
        bids.add(first);
        bids.add(shared(Side::Buy, 20, 100));

        let best = bids.best_order().unwrap();
        assert_eq!(best.lock().unwrap().order_id, first_id);
    }

    #[test]
    fn test_remove_drops_empty_level() {
        let mut bids = BookSide::new(Side::Buy);
        let order = shared(Side::Buy, 10, 100);
        let order_id = order.lock().unwrap().order_id;
        bids.add(order);

        assert!(bids.remove(&order_id).is_some());
        assert!(bids.is_empty());
        assert_eq!(bids.level_count(), 0);
        assert!(!bids.contains(&order_id));
        assert!(bids.remove(&order_id).is_none());
    }

    #[test]
    fn test_fill_best_pops_exhausted_front() {
        let mut asks = BookSide::new(Side::Sell);
        let front = shared(Side::Sell, 10, 101);
        let front_id = front.lock().unwrap().order_id;
        asks.add(front.clone());
        asks.add(shared(Side::Sell, 20, 101));

        front.lock().unwrap().fill(10, Price::from_u64(101)).unwrap();
        let popped = asks.fill_best(10).unwrap();

        assert_eq!(popped.lock().unwrap().order_id, front_id);
        assert!(!asks.contains(&front_id));
        assert_eq!(asks.total_volume(), 20);
        assert!(asks.audit());
    }

    #[test]
    fn test_fill_best_partial_keeps_front() {
        let mut asks = BookSide::new(Side::Sell);
        let front = shared(Side::Sell, 10, 101);
        asks.add(front.clone());

        front.lock().unwrap().fill(4, Price::from_u64(101)).unwrap();
        assert!(asks.fill_best(4).is_none());
        assert_eq!(asks.total_volume(), 6);
        assert!(asks.audit());
    }

    #[test]
    fn test_top_levels_best_first() {
        let mut bids = BookSide::new(Side::Buy);
        bids.add(shared(Side::Buy, 10, 100));
        bids.add(shared(Side::Buy, 20, 102));
        bids.add(shared(Side::Buy, 30, 101));
        bids.add(shared(Side::Buy, 5, 102));

        let levels = bids.top_levels(2);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, Price::from_u64(102));
        assert_eq!(levels[0].quantity, 25);
        assert_eq!(levels[0].order_count, 2);
        assert_eq!(levels[1].price, Price::from_u64(101));
    }

    #[test]
    fn test_volume_at_price() {
        let mut asks = BookSide::new(Side::Sell);
        asks.add(shared(Side::Sell, 10, 101));
        asks.add(shared(Side::Sell, 15, 101));
        asks.add(shared(Side::Sell, 7, 102));

        assert_eq!(asks.volume_at(Price::from_u64(101)), 25);
        assert_eq!(asks.volume_at(Price::from_u64(105)), 0);
        assert_eq!(asks.total_volume(), 32);
    }
}
