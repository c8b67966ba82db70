//! CSV order ingest
//!
//! Header-bearing table with required columns `trader_id, symbol, side,
//! quantity, price` (case-insensitive, any order) and an optional,
//! informational `timestamp`; unknown columns are ignored. Rows that fail
//! validation are skipped and reported by data-row number; good rows are
//! submitted through the engine's normal entry point.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use matching_engine::MatchingEngine;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromStr;
use serde::Serialize;
use tracing::{info, warn};
use types::{Order, Price, Side, Symbol, TraderId};

use crate::csv::split_record;

/// Columns an order table must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["trader_id", "symbol", "side", "quantity", "price"];

/// Outcome of one import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// False only when the table itself is unusable (missing header
    /// columns); row-level failures leave this true.
    pub success: bool,
    pub orders_submitted: usize,
    pub orders_failed: usize,
    pub total_rows: usize,
    /// Data-row number (1-based) to failure message.
    pub errors: BTreeMap<usize, String>,
    pub symbols_imported: Vec<String>,
    pub traders_imported: Vec<String>,
    /// Table-level validation failure, when `success` is false.
    pub error: Option<String>,
}

impl ImportReport {
    fn table_failure(message: String) -> Self {
        Self {
            success: false,
            orders_submitted: 0,
            orders_failed: 0,
            total_rows: 0,
            errors: BTreeMap::new(),
            symbols_imported: Vec::new(),
            traders_imported: Vec::new(),
            error: Some(message),
        }
    }
}

/// Parse `content` and submit every valid row through `engine`.
pub fn import_orders(engine: &MatchingEngine, content: &str) -> ImportReport {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return ImportReport::table_failure("empty input".to_string());
    };

    let columns: HashMap<String, usize> = split_record(header_line)
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_lowercase(), i))
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.contains_key(**c))
        .copied()
        .collect();
    if !missing.is_empty() {
        let message = format!("Missing required columns: {}", missing.join(", "));
        warn!(%message, "order import rejected");
        return ImportReport::table_failure(message);
    }

    let mut submitted = 0usize;
    let mut failed = 0usize;
    let mut total_rows = 0usize;
    let mut errors = BTreeMap::new();
    let mut symbols = BTreeSet::new();
    let mut traders = BTreeSet::new();

    for line in lines {
        total_rows += 1;
        let fields = split_record(line);

        match parse_row(&columns, &fields) {
            Ok(order) => {
                symbols.insert(order.symbol.to_string());
                traders.insert(order.trader_id.to_string());
                engine.submit(order);
                submitted += 1;
            }
            Err(message) => {
                warn!(row = total_rows, %message, "order row skipped");
                errors.insert(total_rows, message);
                failed += 1;
            }
        }
    }

    info!(submitted, failed, total_rows, "order import complete");
    ImportReport {
        success: true,
        orders_submitted: submitted,
        orders_failed: failed,
        total_rows,
        errors,
        symbols_imported: symbols.into_iter().collect(),
        traders_imported: traders.into_iter().collect(),
        error: None,
    }
}

fn field<'a>(
    columns: &HashMap<String, usize>,
    fields: &'a [String],
    name: &str,
) -> Result<&'a str, String> {
    let index = columns[name];
    fields
        .get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("missing value for '{name}'"))
}

fn parse_row(columns: &HashMap<String, usize>, fields: &[String]) -> Result<Order, String> {
    let trader_id = field(columns, fields, "trader_id")?;
    if trader_id.is_empty() {
        return Err("trader_id is empty".to_string());
    }

    let symbol = field(columns, fields, "symbol")?;
    if symbol.is_empty() {
        return Err("symbol is empty".to_string());
    }

    let side = Side::parse(field(columns, fields, "side")?)
        .map_err(|e| format!("invalid side: {e}"))?;

    let quantity_raw = field(columns, fields, "quantity")?;
    let quantity = quantity_raw
        .parse::<i64>()
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| format!("quantity '{quantity_raw}' is not a positive integer"))?;

    let price_raw = field(columns, fields, "price")?;
    let price = Decimal::from_str(price_raw)
        .ok()
        .and_then(Price::try_new)
        .ok_or_else(|| format!("price '{price_raw}' is not a positive decimal"))?;

    // An inline `timestamp` column is informational only; the engine
    // assigns its own submit time.

    Order::new(
        TraderId::new(trader_id),
        Symbol::new(symbol),
        side,
        quantity as u64,
        price,
    )
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> std::sync::Arc<MatchingEngine> {
        MatchingEngine::new()
    }

    #[test]
    fn test_import_valid_rows() {
        let engine = engine();
        let csv = "trader_id,symbol,side,quantity,price\n\
                   T1,aapl,buy,100,150.25\n\
                   T2,AAPL,SELL,75,150.50\n";

        let report = import_orders(&engine, csv);
        assert!(report.success);
        assert_eq!(report.orders_submitted, 2);
        assert_eq!(report.orders_failed, 0);
        assert_eq!(report.total_rows, 2);
        assert!(report.errors.is_empty());
        assert_eq!(report.symbols_imported, vec!["AAPL"]);
        assert_eq!(report.traders_imported, vec!["T1", "T2"]);
        assert_eq!(engine.pending_orders(), 2);
    }

    #[test]
    fn test_header_case_and_order_insensitive() {
        let engine = engine();
        let csv = "Price,SIDE,Trader_Id,Quantity,Symbol\n\
                   150.25,BUY,T1,100,AAPL\n";

        let report = import_orders(&engine, csv);
        assert!(report.success);
        assert_eq!(report.orders_submitted, 1);
    }

    #[test]
    fn test_unknown_columns_ignored_timestamp_informational() {
        let engine = engine();
        let csv = "trader_id,symbol,side,quantity,price,timestamp,note\n\
                   T1,AAPL,BUY,10,150.25,2025-07-06 10:00:00,ignored\n";

        let report = import_orders(&engine, csv);
        assert_eq!(report.orders_submitted, 1);
    }

    #[test]
    fn test_missing_columns_rejected_with_list() {
        let engine = engine();
        let csv = "trader_id,side,quantity\nT1,BUY,10\n";

        let report = import_orders(&engine, csv);
        assert!(!report.success);
        let message = report.error.unwrap();
        assert!(message.contains("symbol"));
        assert!(message.contains("price"));
        assert_eq!(engine.pending_orders(), 0);
    }

    #[test]
    fn test_bad_rows_skipped_and_reported_by_line() {
        let engine = engine();
        let csv = "trader_id,symbol,side,quantity,price\n\
                   T1,AAPL,BUY,100,150.25\n\
                   T2,AAPL,SELL,75,150.50\n\
                   T3,AAPL,HOLD,50,150.00\n\
                   T4,AAPL,BUY,-5,150.00\n";

        let report = import_orders(&engine, csv);
        assert!(report.success);
        assert_eq!(report.orders_submitted, 2);
        assert_eq!(report.orders_failed, 2);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.errors.keys().copied().collect::<Vec<_>>(), vec![3, 4]);
        assert!(report.errors[&3].contains("HOLD"));
        assert!(report.errors[&4].contains("-5"));
        assert_eq!(engine.pending_orders(), 2);
    }

    #[test]
    fn test_empty_and_nonnumeric_fields_fail() {
        let engine = engine();
        let csv = "trader_id,symbol,side,quantity,price\n\
                   ,AAPL,BUY,10,150.00\n\
                   T1,,BUY,10,150.00\n\
                   T1,AAPL,BUY,ten,150.00\n\
                   T1,AAPL,BUY,10,zero\n\
                   T1,AAPL,BUY,10,0\n";

        let report = import_orders(&engine, csv);
        assert_eq!(report.orders_submitted, 0);
        assert_eq!(report.orders_failed, 5);
        assert_eq!(engine.pending_orders(), 0);
    }

    #[test]
    fn test_empty_input() {
        let report = import_orders(&engine(), "");
        assert!(!report.success);
    }

    #[test]
    fn test_quoted_fields() {
        let engine = engine();
        let csv = "trader_id,symbol,side,quantity,price\n\
                   \"DESK,A\",AAPL,BUY,10,150.00\n";

        let report = import_orders(&engine, csv);
        assert_eq!(report.orders_submitted, 1);
        assert_eq!(report.traders_imported, vec!["DESK,A"]);
    }
}
