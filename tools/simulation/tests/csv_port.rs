//! CSV port integration: ingest through a live engine and export
//! round-trips.

use std::time::Duration;

use matching_engine::MatchingEngine;
use simulation::csv::{export_order_books, export_trades, import_orders};
use types::{Price, Side, Symbol};

#[test]
fn mixed_rows_import_into_running_engine() {
    let engine = MatchingEngine::new();
    engine.start();

    // Two valid rows, one bad side, one negative quantity. Prices do not
    // cross so the good rows rest on the book.
    let csv = "trader_id,symbol,side,quantity,price\n\
               T1,AAPL,BUY,100,149.00\n\
               T2,AAPL,SELL,75,151.00\n\
               T3,AAPL,HOLD,50,150.00\n\
               T4,AAPL,BUY,-5,150.00\n";

    let report = import_orders(&engine, csv);
    assert!(report.success);
    assert_eq!(report.orders_submitted, 2);
    assert_eq!(report.orders_failed, 2);
    assert_eq!(report.total_rows, 4);
    assert_eq!(report.errors.keys().copied().collect::<Vec<_>>(), vec![3, 4]);

    assert!(engine.wait_until_idle(Duration::from_secs(2)));

    // Only the two valid rows changed engine state
    let book = engine.get_order_book(&Symbol::new("AAPL"));
    assert_eq!(book.best_bid_price(), Some(Price::from_u64(149)));
    assert_eq!(book.best_ask_price(), Some(Price::from_u64(151)));
    assert_eq!(book.volume_at(Price::from_u64(149), Side::Buy), 100);
    assert_eq!(book.volume_at(Price::from_u64(151), Side::Sell), 75);
    assert!(engine.all_trades().is_empty());

    engine.stop();
}

#[test]
fn imported_orders_match_like_any_other() {
    let engine = MatchingEngine::new();
    engine.start();

    let csv = "trader_id,symbol,side,quantity,price\n\
               MAKER,AAPL,SELL,50,150.00\n\
               TAKER,AAPL,BUY,50,150.00\n";
    let report = import_orders(&engine, csv);
    assert_eq!(report.orders_submitted, 2);

    assert!(engine.wait_until_idle(Duration::from_secs(2)));
    let trades = engine.all_trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity, 50);
    assert_eq!(trades[0].buyer_id.as_str(), "TAKER");
    assert_eq!(trades[0].seller_id.as_str(), "MAKER");

    engine.stop();
}

#[test]
fn exported_trades_reparse_to_the_same_rows() {
    let engine = MatchingEngine::new();
    engine.start();

    let csv = "trader_id,symbol,side,quantity,price\n\
               S1,AAPL,SELL,10,150.25\n\
               B1,AAPL,BUY,10,150.25\n\
               S2,GOOGL,SELL,5,2800.00\n\
               B2,GOOGL,BUY,5,2800.00\n";
    import_orders(&engine, csv);
    assert!(engine.wait_until_idle(Duration::from_secs(2)));

    let trades = engine.all_trades();
    assert_eq!(trades.len(), 2);

    let exported = export_trades(&trades);
    let lines: Vec<&str> = exported.lines().collect();
    assert_eq!(lines.len(), 1 + trades.len());

    for (line, trade) in lines[1..].iter().zip(&trades) {
        let fields = reparse(line);
        assert_eq!(fields[0], trade.trade_id.to_string());
        assert_eq!(fields[2], trade.symbol.to_string());
        assert_eq!(fields[3], "BUY");
        assert_eq!(fields[4], trade.quantity.to_string());
        assert_eq!(fields[5], format!("{:.4}", trade.price.as_decimal()));
        assert_eq!(fields[6], format!("{:.2}", trade.value()));
        assert_eq!(fields[7], trade.buyer_id.to_string());
        assert_eq!(fields[8], trade.seller_id.to_string());
        assert_eq!(fields[9], trade.buy_order_id.to_string());
        assert_eq!(fields[10], trade.sell_order_id.to_string());
    }

    engine.stop();
}

#[test]
fn book_snapshot_export_levels_best_first() {
    let engine = MatchingEngine::new();
    engine.start();

    let csv = "trader_id,symbol,side,quantity,price\n\
               T1,AAPL,BUY,10,99.00\n\
               T2,AAPL,BUY,20,98.00\n\
               T3,AAPL,SELL,30,101.00\n\
               T4,AAPL,SELL,40,102.00\n";
    import_orders(&engine, csv);
    assert!(engine.wait_until_idle(Duration::from_secs(2)));

    let snapshot = engine.get_order_book(&Symbol::new("AAPL")).snapshot(5);
    let exported = export_order_books(&[snapshot]);
    let rows: Vec<Vec<String>> = exported.lines().skip(1).map(reparse).collect();
    assert_eq!(rows.len(), 4);

    // Bids first, level 1 = best bid, cumulative volume accumulates
    assert_eq!(rows[0][2], "BID");
    assert_eq!(rows[0][3], "1");
    assert_eq!(rows[0][4], "99.0000");
    assert_eq!(rows[0][7], "10");
    assert_eq!(rows[1][3], "2");
    assert_eq!(rows[1][7], "30");

    assert_eq!(rows[2][2], "ASK");
    assert_eq!(rows[2][4], "101.0000");
    assert_eq!(rows[3][7], "70");

    engine.stop();
}

#[test]
fn fields_with_delimiters_survive_round_trip() {
    let engine = MatchingEngine::new();
    engine.start();

    let csv = "trader_id,symbol,side,quantity,price\n\
               \"DESK,A\",AAPL,SELL,10,150.00\n\
               \"DESK,B\",AAPL,BUY,10,150.00\n";
    import_orders(&engine, csv);
    assert!(engine.wait_until_idle(Duration::from_secs(2)));

    let trades = engine.all_trades();
    assert_eq!(trades.len(), 1);

    let exported = export_trades(&trades);
    let row = reparse(exported.lines().nth(1).unwrap());
    assert_eq!(row[7], "DESK,B");
    assert_eq!(row[8], "DESK,A");

    engine.stop();
}

/// Parse a CSV line the way a plain table reader would.
fn reparse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }
    }
    fields.push(field);
    fields
}

#[test]
fn price_parse_is_decimal_exact() {
    // Guard against float drift in the ingest path
    let engine = MatchingEngine::new();
    let csv = "trader_id,symbol,side,quantity,price\n\
               T1,AAPL,BUY,10,150.10\n";
    import_orders(&engine, csv);
    engine.start();
    assert!(engine.wait_until_idle(Duration::from_secs(2)));

    let book = engine.get_order_book(&Symbol::new("AAPL"));
    assert_eq!(book.best_bid_price(), Some(Price::from_str("150.10").unwrap()));
    engine.stop();
}
