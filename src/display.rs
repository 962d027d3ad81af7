use crate::aggregation::Aggregator;
use crate::types::Value;

/// Display a preview of an aggregator's totals
pub fn display_totals_table(title: &str, aggregator: &Aggregator) {
    if aggregator.is_empty() {
        println!("No data to display");
        return;
    }

    let width = 24 * (aggregator.fields().len() + 2);

    println!("\n{}", "=".repeat(width));
    println!("{:^1$}", title, width);
    println!("{}", "=".repeat(width));

    // Header
    for field in aggregator.fields() {
        print!("{:<24}", field);
    }
    println!("{:>12} {:>16}", "count", "amount");
    println!("{}", "-".repeat(width));

    let rows = aggregator.value_sorted(false, true);

    // Display first 10 rows
    for (key, total) in rows.iter().take(10) {
        print_row(key, total.count, total.amount);
    }

    // Display last 10 rows if we have more than 10 rows
    if rows.len() > 20 {
        println!("{:^1$}", "...", width);
    }
    if rows.len() > 10 {
        let shown = rows.len().min(20) - 10;
        for (key, total) in rows.iter().rev().take(shown).rev() {
            print_row(key, total.count, total.amount);
        }
    }

    println!("{}", "-".repeat(width));
    println!("Total rows: {}", rows.len());

    // Summary statistics
    let total_count: u64 = rows.iter().map(|(_, t)| t.count).sum();
    let total_amount: f64 = rows.iter().map(|(_, t)| t.amount).sum();
    println!("Total Count: {}", total_count);
    println!("Total Amount: {:.2}", total_amount);
    if total_count > 0 {
        println!("Average Amount: {:.4}", total_amount / total_count as f64);
    }
    println!("{}", "=".repeat(width));
}

fn print_row(key: &[Value], count: u64, amount: f64) {
    for value in key {
        print!("{:<24}", value.to_string());
    }
    println!("{:>12} {:>16.4}", count, amount);
}
