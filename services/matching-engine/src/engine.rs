//! Multi-symbol matching engine
//!
//! Producers (trader agents, CSV ingest) share one submission queue; a
//! single worker thread drains it and performs all matching, so every
//! mutation of a book, the active-order index, and the trade history is
//! serialized. Observers read snapshots under short-lived guards.
//!
//! Lifecycle: `Idle` on construction, `Running` after [`start`], `Stopped`
//! after [`stop`], restartable. Orders queued while stopped stay queued and
//! are drained on the next start; [`clear`] discards them.
//!
//! [`start`]: MatchingEngine::start
//! [`stop`]: MatchingEngine::stop
//! [`clear`]: MatchingEngine::clear

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, error, info, warn};
use types::{Order, OrderId, Price, Side, Symbol, Trade, TraderId};

use crate::events::FillListener;
use crate::matching::{crossing, TradeExecutor};
use crate::order_book::OrderBook;
use crate::stats::{vwap, EngineCounters, PerformanceStats, SymbolStatistics, SymbolSummary};
use crate::{lock_unpoisoned, order_snapshot, SharedOrder};

/// Capacity of the engine-wide trade history; oldest trades are evicted.
pub const ENGINE_TRADE_CAPACITY: usize = 10_000;

/// How long the worker sleeps on an empty queue before rechecking the
/// shutdown flag and the stats tick.
const IDLE_WAIT: Duration = Duration::from_millis(200);

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopped,
}

/// Submission queue shared by producers and the worker. Contents survive a
/// stop/start cycle.
struct SubmitQueue {
    orders: Mutex<VecDeque<Order>>,
    available: Condvar,
}

impl SubmitQueue {
    fn new() -> Self {
        Self {
            orders: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    fn push(&self, order: Order) {
        lock_unpoisoned(&self.orders).push_back(order);
        self.available.notify_one();
    }

    fn try_pop(&self) -> Option<Order> {
        lock_unpoisoned(&self.orders).pop_front()
    }

    fn wait_for_work(&self, timeout: Duration) {
        let guard = lock_unpoisoned(&self.orders);
        if guard.is_empty() {
            drop(
                self.available
                    .wait_timeout(guard, timeout)
                    .map(|(g, _)| g)
                    .unwrap_or_else(|e| e.into_inner().0),
            );
        }
    }

    fn len(&self) -> usize {
        lock_unpoisoned(&self.orders).len()
    }

    fn clear(&self) {
        lock_unpoisoned(&self.orders).clear();
    }
}

struct Lifecycle {
    state: EngineState,
    worker: Option<JoinHandle<()>>,
}

/// One execution as recorded during a match loop, with the order handles
/// needed to notify both parties after the book guard is released.
struct Execution {
    trade: Trade,
    buy_order: SharedOrder,
    sell_order: SharedOrder,
}

/// The multi-symbol matching engine.
pub struct MatchingEngine {
    queue: SubmitQueue,
    books: DashMap<Symbol, Arc<OrderBook>>,
    active_orders: Mutex<HashMap<OrderId, SharedOrder>>,
    listeners: Mutex<HashMap<TraderId, Weak<dyn FillListener>>>,
    history: Mutex<VecDeque<Trade>>,
    executor: Mutex<TradeExecutor>,
    counters: EngineCounters,
    subscribers: Mutex<Vec<Sender<PerformanceStats>>>,
    running: AtomicBool,
    busy: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl MatchingEngine {
    /// Create a new engine in the `Idle` state.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: SubmitQueue::new(),
            books: DashMap::new(),
            active_orders: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(ENGINE_TRADE_CAPACITY)),
            executor: Mutex::new(TradeExecutor::new()),
            counters: EngineCounters::new(),
            subscribers: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                state: EngineState::Idle,
                worker: None,
            }),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        lock_unpoisoned(&self.lifecycle).state
    }

    /// Start the worker. No-op when already running.
    pub fn start(self: &Arc<Self>) {
        let mut lifecycle = lock_unpoisoned(&self.lifecycle);
        if lifecycle.state == EngineState::Running {
            return;
        }
        self.running.store(true, Ordering::Release);
        self.busy.store(true, Ordering::Release);
        let engine = Arc::clone(self);
        lifecycle.worker = Some(thread::spawn(move || engine.run_loop()));
        lifecycle.state = EngineState::Running;
        info!("matching engine started");
    }

    /// Stop the worker. Idempotent; queued orders remain for the next
    /// start. Must not be called from a fill callback.
    pub fn stop(&self) {
        let mut lifecycle = lock_unpoisoned(&self.lifecycle);
        self.running.store(false, Ordering::Release);
        self.queue.available.notify_all();
        if let Some(worker) = lifecycle.worker.take() {
            if worker.join().is_err() {
                error!("engine worker panicked");
            }
        }
        if lifecycle.state == EngineState::Running {
            lifecycle.state = EngineState::Stopped;
            info!("matching engine stopped");
        }
    }

    /// Bind a trader id to its fill listener. The engine keeps only a weak
    /// reference; a dropped trader unregisters implicitly.
    pub fn register_trader(&self, listener: &Arc<dyn FillListener>) {
        let trader_id = listener.trader_id().clone();
        debug!(trader = %trader_id, "trader registered");
        lock_unpoisoned(&self.listeners).insert(trader_id, Arc::downgrade(listener));
    }

    /// Enqueue an order for matching. Returns promptly; legal in any state.
    pub fn submit(&self, order: Order) {
        debug!(order_id = %order.order_id, symbol = %order.symbol, side = %order.side,
               quantity = order.remaining_quantity, price = %order.price, "order submitted");
        self.queue.push(order);
    }

    /// Cancel an order by id. Returns whether an active order was found
    /// and cancelled; a fully filled or unknown order yields false.
    ///
    /// Serialized against matching through the book guard: a cancel never
    /// interleaves with a match in progress, so any fills that already
    /// happened stand and only the remainder is cancelled.
    pub fn cancel(&self, order_id: &OrderId) -> bool {
        let shared = lock_unpoisoned(&self.active_orders).get(order_id).cloned();
        let Some(shared) = shared else {
            debug!(%order_id, "cancel miss");
            return false;
        };

        let (symbol, side) = {
            let order = lock_unpoisoned(&shared);
            (order.symbol.clone(), order.side)
        };
        let book = self.get_order_book(&symbol);
        let cancelled = book.with_inner(|inner| {
            inner.side_mut(side).remove(order_id);
            lock_unpoisoned(&shared).cancel()
        });

        if cancelled {
            lock_unpoisoned(&self.active_orders).remove(order_id);
            debug!(%order_id, "order cancelled");
        }
        cancelled
    }

    /// The book for `symbol`, created lazily on first use.
    pub fn get_order_book(&self, symbol: &Symbol) -> Arc<OrderBook> {
        self.books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(OrderBook::new(symbol.clone())))
            .clone()
    }

    /// Discard queued orders, books, trade history, the active-order
    /// index, and counters. Registered traders stay registered.
    pub fn clear(&self) {
        self.queue.clear();
        self.books.clear();
        lock_unpoisoned(&self.active_orders).clear();
        lock_unpoisoned(&self.history).clear();
        lock_unpoisoned(&self.executor).reset();
        self.counters.reset();
        info!("engine cleared");
    }

    // -------------------------------------------------------------------
    // Worker
    // -------------------------------------------------------------------

    fn run_loop(&self) {
        while self.running.load(Ordering::Acquire) {
            if let Some(order) = self.queue.try_pop() {
                self.process_order(order);
            } else {
                self.busy.store(false, Ordering::Release);
                self.queue.wait_for_work(IDLE_WAIT);
                self.busy.store(true, Ordering::Release);
            }
            if self.counters.tick_if_due() {
                self.publish_stats();
            }
        }
        self.busy.store(false, Ordering::Release);
    }

    /// Match one dequeued order to completion.
    fn process_order(&self, order: Order) {
        let started = Instant::now();
        let order_id = order.order_id;
        let symbol = order.symbol.clone();
        let side = order.side;
        let limit = order.price;

        let shared: SharedOrder = Arc::new(Mutex::new(order));
        lock_unpoisoned(&self.active_orders).insert(order_id, shared.clone());

        let book = self.get_order_book(&symbol);
        let mut executions: Vec<Execution> = Vec::new();
        let mut removed_makers: Vec<OrderId> = Vec::new();
        let mut rested = false;

        book.with_inner(|inner| {
            let mut executor = lock_unpoisoned(&self.executor);
            loop {
                let (incoming_remaining, incoming_active) = {
                    let o = lock_unpoisoned(&shared);
                    (o.remaining_quantity, o.is_active())
                };
                // A cancel that won the race leaves the order terminal.
                if incoming_remaining == 0 || !incoming_active {
                    break;
                }

                let Some((maker_price, maker)) = inner.side_mut(side.opposite()).best() else {
                    break;
                };
                if !crossing::crosses(side, limit, maker_price) {
                    break;
                }

                let maker_remaining = lock_unpoisoned(&maker).remaining_quantity;
                let quantity = incoming_remaining.min(maker_remaining);
                debug_assert!(quantity > 0, "resting order with zero remainder");
                if quantity == 0 {
                    error!(%order_id, "zero-quantity match candidate; dropping maker");
                    if let Some(popped) = inner.side_mut(side.opposite()).fill_best(0) {
                        removed_makers.push(lock_unpoisoned(&popped).order_id);
                    }
                    continue;
                }

                // Execute at the resting (maker) price.
                match executor.execute(&symbol, &shared, &maker, quantity, maker_price) {
                    Ok(trade) => {
                        if let Some(popped) = inner.side_mut(side.opposite()).fill_best(quantity) {
                            removed_makers.push(lock_unpoisoned(&popped).order_id);
                        }
                        inner.push_trade(trade.clone());
                        let (buy_order, sell_order) = match side {
                            Side::Buy => (shared.clone(), maker.clone()),
                            Side::Sell => (maker.clone(), shared.clone()),
                        };
                        debug!(trade_id = %trade.trade_id, symbol = %trade.symbol,
                               quantity = trade.quantity, price = %trade.price, "trade");
                        executions.push(Execution { trade, buy_order, sell_order });
                    }
                    Err(err) => {
                        error!(%order_id, %err, "match aborted by contract violation");
                        break;
                    }
                }
            }

            // Rest the residual, if any.
            let still_active = {
                let o = lock_unpoisoned(&shared);
                o.is_active() && o.remaining_quantity > 0
            };
            if still_active {
                inner.side_mut(side).add(shared.clone());
                rested = true;
            }

            debug_assert!(!inner.is_crossed(), "book crossed at quiescence");
            if inner.is_crossed() {
                error!(symbol = %symbol, "book crossed at quiescence");
            }
        });

        {
            let mut active = lock_unpoisoned(&self.active_orders);
            if !rested {
                active.remove(&order_id);
            }
            for maker_id in &removed_makers {
                active.remove(maker_id);
            }
        }

        if !executions.is_empty() {
            let mut history = lock_unpoisoned(&self.history);
            for execution in &executions {
                if history.len() >= ENGINE_TRADE_CAPACITY {
                    history.pop_front();
                }
                history.push_back(execution.trade.clone());
                self.counters.record_trade(execution.trade.quantity);
            }
        }

        // Buyer before seller, trade by trade, after the book guard is
        // released so callbacks can re-enter submit.
        for execution in &executions {
            let trade = &execution.trade;
            self.notify_fill(&trade.buyer_id, &execution.buy_order, trade.quantity, trade.price);
            self.notify_fill(&trade.seller_id, &execution.sell_order, trade.quantity, trade.price);
        }

        self.counters.record_order(started.elapsed());
    }

    fn notify_fill(&self, trader_id: &TraderId, order: &SharedOrder, quantity: u64, price: Price) {
        let listener = {
            let mut listeners = lock_unpoisoned(&self.listeners);
            match listeners.get(trader_id).map(Weak::upgrade) {
                Some(Some(listener)) => Some(listener),
                Some(None) => {
                    warn!(trader = %trader_id, "dropping dead fill listener");
                    listeners.remove(trader_id);
                    None
                }
                None => None,
            }
        };
        if let Some(listener) = listener {
            let snapshot = order_snapshot(order);
            listener.on_fill(&snapshot, quantity, price);
        }
    }

    fn publish_stats(&self) {
        let stats = self.performance_stats();
        lock_unpoisoned(&self.subscribers).retain(|tx| tx.send(stats.clone()).is_ok());
    }

    // -------------------------------------------------------------------
    // Observability
    // -------------------------------------------------------------------

    /// The most recent `count` trades across all symbols, oldest first.
    pub fn recent_trades(&self, count: usize) -> Vec<Trade> {
        let history = lock_unpoisoned(&self.history);
        let len = history.len();
        history.iter().skip(len.saturating_sub(count)).cloned().collect()
    }

    /// The most recent `count` trades for one symbol, oldest first.
    pub fn recent_trades_for_symbol(&self, symbol: &Symbol, count: usize) -> Vec<Trade> {
        let history = lock_unpoisoned(&self.history);
        let matching: Vec<Trade> = history.iter().filter(|t| &t.symbol == symbol).cloned().collect();
        let len = matching.len();
        matching.into_iter().skip(len.saturating_sub(count)).collect()
    }

    /// The entire retained trade history, oldest first.
    pub fn all_trades(&self) -> Vec<Trade> {
        lock_unpoisoned(&self.history).iter().cloned().collect()
    }

    /// Snapshots of all active orders belonging to one trader.
    pub fn trader_orders(&self, trader_id: &TraderId) -> Vec<Order> {
        lock_unpoisoned(&self.active_orders)
            .values()
            .filter_map(|shared| {
                let order = lock_unpoisoned(shared);
                (&order.trader_id == trader_id).then(|| order.clone())
            })
            .collect()
    }

    /// Current performance counters.
    pub fn performance_stats(&self) -> PerformanceStats {
        let active = lock_unpoisoned(&self.active_orders).len();
        self.counters.snapshot(active, self.books.len())
    }

    /// Subscribe to the ~1 Hz performance snapshot stream.
    pub fn subscribe_stats(&self) -> Receiver<PerformanceStats> {
        let (tx, rx) = mpsc::channel();
        lock_unpoisoned(&self.subscribers).push(tx);
        rx
    }

    /// Per-symbol market summaries, sorted by symbol.
    pub fn market_summary(&self) -> Vec<SymbolSummary> {
        let mut summaries: Vec<SymbolSummary> = self
            .books
            .iter()
            .map(|entry| {
                let book = entry.value();
                let stats = book.statistics();
                let recent = book.recent_trades(5);
                SymbolSummary {
                    symbol: book.symbol().clone(),
                    best_bid: book.best_bid_price(),
                    best_ask: book.best_ask_price(),
                    spread: stats.spread,
                    mid_price: stats.mid_price,
                    vwap: vwap(&recent),
                    volume: stats.total_bid_volume + stats.total_ask_volume,
                    trade_count: recent.len(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        summaries
    }

    /// Detailed statistics for one symbol over its recent trade tail, or
    /// None when the symbol has no book.
    pub fn symbol_statistics(&self, symbol: &Symbol) -> Option<SymbolStatistics> {
        let book = self.books.get(symbol)?.clone();
        let recent = self.recent_trades_for_symbol(symbol, 100);
        Some(SymbolStatistics {
            symbol: symbol.clone(),
            last_price: recent.last().map(|t| t.price),
            high_price: recent.iter().map(|t| t.price).max(),
            low_price: recent.iter().map(|t| t.price).min(),
            vwap: vwap(&recent),
            total_volume: recent.iter().map(|t| t.quantity).sum(),
            trade_count: recent.len(),
            book: book.statistics(),
        })
    }

    /// Orders submitted but not yet processed.
    pub fn pending_orders(&self) -> usize {
        self.queue.len()
    }

    /// Number of orders in the active index.
    pub fn active_order_count(&self) -> usize {
        lock_unpoisoned(&self.active_orders).len()
    }

    /// Block until the queue is drained and the worker is idle, or the
    /// timeout passes. Returns whether the engine went idle.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending_orders() == 0 && !self.busy.load(Ordering::Acquire) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for MatchingEngine {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.queue.available.notify_all();
    }
}
