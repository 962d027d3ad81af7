use crate::aggregation::Aggregator;
use crate::types::AggregationError;
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// CSV dialect options for tabular export.
///
/// Every option has a default; construct with `CsvDialect::default()` and
/// override the fields that differ.
#[derive(Debug, Clone, Copy)]
pub struct CsvDialect {
    pub delimiter: u8,
    pub quote_style: QuoteStyle,
    pub terminator: Terminator,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote_style: QuoteStyle::Necessary,
            terminator: Terminator::CRLF,
        }
    }
}

/// Write an aggregator as CSV text.
///
/// Header row is the schema fields followed by "count" and "amount"; each
/// data row is a key's values in schema order followed by its total's count
/// and amount. Rows come out in `field_sorted(sort_fields, reverse)` order.
pub fn write_csv(
    aggregator: &Aggregator,
    sort_fields: &[&str],
    reverse: bool,
    dialect: &CsvDialect,
) -> Result<String, AggregationError> {
    let mut writer = WriterBuilder::new()
        .delimiter(dialect.delimiter)
        .quote_style(dialect.quote_style)
        .terminator(dialect.terminator)
        .from_writer(Vec::new());

    let mut header: Vec<String> = aggregator.fields().to_vec();
    header.push("count".to_string());
    header.push("amount".to_string());
    writer.write_record(&header)?;

    for (key, total) in aggregator.field_sorted(sort_fields, reverse)? {
        let mut row: Vec<String> = key.iter().map(|v| v.to_string()).collect();
        row.push(total.count.to_string());
        row.push(total.amount.to_string());
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AggregationError::Csv(e.into_error().into()))?;
    // A non-UTF-8 dialect byte (e.g. a 0xFF delimiter) must surface, not
    // come back as an empty export
    Ok(String::from_utf8(bytes)?)
}
