//! CSV order port
//!
//! Parses externally supplied order batches and submits them through the
//! same engine entry point the agents use, and serializes trades, book
//! snapshots, trader performance, and engine metrics into a stable tabular
//! form. Records are parsed and written by hand; fields containing commas,
//! quotes, or newlines are quoted with doubled internal quotes.

pub mod export;
pub mod import;

pub use export::{
    export_engine_metrics, export_market_summary, export_order_books, export_trader_performance,
    export_trades, sample_orders_csv,
};
pub use import::{import_orders, ImportReport};

/// Split one CSV record into trimmed fields, honoring quoting.
pub(crate) fn split_record(line: &str) -> Vec<String> {
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
                ',' => {
                    fields.push(field.trim().to_string());
                    field.clear();
                }
                _ => field.push(c),
            }
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Quote a field when it contains a comma, quote, or newline.
pub(crate) fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Append one record to the output buffer.
pub(crate) fn write_record(out: &mut String, fields: &[String]) {
    let escaped: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}
