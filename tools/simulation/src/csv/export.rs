//! CSV export
//!
//! Stable tabular serialization of trades, order-book snapshots, trader
//! performance, market summaries, and engine metrics. Prices render to
//! four decimals, monetary values to two, timestamps as
//! `yyyy-MM-dd hh:mm:ss.SSS`.
//!
//! The trade table's `Side` column is the literal `BUY` by convention: it
//! labels the aggressive side, which this format has always recorded as
//! the buyer. A richer export would add a column rather than change it.

use matching_engine::{BookSnapshot, PerformanceStats, SymbolSummary};
use rust_decimal::Decimal;
use types::Trade;

use crate::bots::TraderStats;
use crate::csv::write_record;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One row per trade. Empty input yields an empty string.
pub fn export_trades(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    write_record(
        &mut out,
        &[
            "Trade ID", "Timestamp", "Symbol", "Side", "Quantity", "Price", "Value",
            "Buyer ID", "Seller ID", "Buy Order ID", "Sell Order ID",
        ]
        .map(String::from),
    );

    for trade in trades {
        write_record(
            &mut out,
            &[
                trade.trade_id.to_string(),
                trade.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                trade.symbol.to_string(),
                trade.side.to_string(),
                trade.quantity.to_string(),
                format!("{:.4}", trade.price.as_decimal()),
                format!("{:.2}", trade.value()),
                trade.buyer_id.to_string(),
                trade.seller_id.to_string(),
                trade.buy_order_id.to_string(),
                trade.sell_order_id.to_string(),
            ],
        );
    }
    out
}

/// One row per level per side, level 1 being the best, with volume
/// accumulated down each side.
pub fn export_order_books(snapshots: &[BookSnapshot]) -> String {
    if snapshots.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    write_record(
        &mut out,
        &[
            "Symbol", "Timestamp", "Side", "Price Level", "Price", "Quantity",
            "Order Count", "Cumulative Volume",
        ]
        .map(String::from),
    );

    for snapshot in snapshots {
        let timestamp = snapshot.timestamp.format(TIMESTAMP_FORMAT).to_string();
        for (label, levels) in [("BID", &snapshot.bids), ("ASK", &snapshot.asks)] {
            let mut cumulative = 0u64;
            for (i, level) in levels.iter().enumerate() {
                cumulative += level.quantity;
                write_record(
                    &mut out,
                    &[
                        snapshot.symbol.to_string(),
                        timestamp.clone(),
                        label.to_string(),
                        (i + 1).to_string(),
                        format!("{:.4}", level.price.as_decimal()),
                        level.quantity.to_string(),
                        level.order_count.to_string(),
                        cumulative.to_string(),
                    ],
                );
            }
        }
    }
    out
}

/// One row per trader.
pub fn export_trader_performance(traders: &[TraderStats]) -> String {
    if traders.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    write_record(
        &mut out,
        &[
            "Trader ID", "Initial Cash", "Current Cash", "Portfolio Value", "Total P&L",
            "P&L %", "Orders Sent", "Orders Filled", "Fill Rate %", "Total Volume",
            "Avg Order Size",
        ]
        .map(String::from),
    );

    for stats in traders {
        let pnl_pct = if stats.initial_cash > Decimal::ZERO {
            stats.total_pnl / stats.initial_cash * Decimal::from(100)
        } else {
            Decimal::ZERO
        };
        let fill_rate_pct = stats.fill_rate * 100.0;
        let avg_order_size = stats.total_volume as f64 / stats.orders_filled.max(1) as f64;

        write_record(
            &mut out,
            &[
                stats.trader_id.to_string(),
                format!("{:.2}", stats.initial_cash),
                format!("{:.2}", stats.cash),
                format!("{:.2}", stats.portfolio_value),
                format!("{:.2}", stats.total_pnl),
                format!("{:.2}", pnl_pct),
                stats.orders_sent.to_string(),
                stats.orders_filled.to_string(),
                format!("{:.2}", fill_rate_pct),
                stats.total_volume.to_string(),
                format!("{:.2}", avg_order_size),
            ],
        );
    }
    out
}

/// One row per symbol.
pub fn export_market_summary(summaries: &[SymbolSummary]) -> String {
    if summaries.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    write_record(
        &mut out,
        &[
            "Symbol", "Best Bid", "Best Ask", "Spread", "Spread %", "Mid Price", "VWAP",
            "Volume", "Trade Count",
        ]
        .map(String::from),
    );

    for summary in summaries {
        let spread_pct = match (summary.spread, summary.mid_price) {
            (Some(spread), Some(mid)) if mid > Decimal::ZERO => spread / mid * Decimal::from(100),
            _ => Decimal::ZERO,
        };
        write_record(
            &mut out,
            &[
                summary.symbol.to_string(),
                summary.best_bid.map(|p| format!("{:.4}", p.as_decimal())).unwrap_or_default(),
                summary.best_ask.map(|p| format!("{:.4}", p.as_decimal())).unwrap_or_default(),
                summary.spread.map(|s| format!("{s:.4}")).unwrap_or_default(),
                format!("{spread_pct:.4}"),
                summary.mid_price.map(|m| format!("{m:.4}")).unwrap_or_default(),
                format!("{:.4}", summary.vwap),
                summary.volume.to_string(),
                summary.trade_count.to_string(),
            ],
        );
    }
    out
}

/// One row per metric with its unit.
pub fn export_engine_metrics(stats: &PerformanceStats) -> String {
    let mut out = String::new();
    write_record(&mut out, &["Metric", "Value", "Unit"].map(String::from));

    let rows: [(&str, String, &str); 8] = [
        ("Total Trades", stats.total_trades.to_string(), "count"),
        ("Total Volume", stats.total_volume.to_string(), "shares"),
        ("Trades Per Second", format!("{:.2}", stats.trades_per_second), "trades/sec"),
        ("Orders Per Second", format!("{:.2}", stats.orders_per_second), "orders/sec"),
        ("Average Latency", format!("{:.2}", stats.avg_latency_ms), "milliseconds"),
        ("Active Orders", stats.active_orders.to_string(), "count"),
        ("Runtime", format!("{:.2}", stats.runtime_seconds), "seconds"),
        ("Active Symbols", stats.symbols_active.to_string(), "count"),
    ];
    for (metric, value, unit) in rows {
        write_record(&mut out, &[metric.to_string(), value, unit.to_string()]);
    }
    out
}

/// A reference table in the import format.
pub fn sample_orders_csv() -> String {
    let mut out = String::new();
    write_record(
        &mut out,
        &["trader_id", "symbol", "side", "quantity", "price", "timestamp"].map(String::from),
    );
    let rows = [
        ["TRADER_001", "AAPL", "BUY", "100", "150.25", "2025-07-06 10:00:00"],
        ["TRADER_002", "AAPL", "SELL", "75", "150.50", "2025-07-06 10:00:15"],
        ["TRADER_001", "GOOGL", "BUY", "50", "2800.75", "2025-07-06 10:00:30"],
    ];
    for row in rows {
        write_record(&mut out, &row.map(String::from));
    }
    out
}
