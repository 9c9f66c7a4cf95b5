//! CSV export and console summary of the ranked results.

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::domain::ReportRow;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write every surviving row, headers included, to `path`.
pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Print the best and worst `count` rows by the ranking metric.
pub fn print_summary(rows: &[ReportRow], count: usize) {
    let shown = count.min(rows.len());

    println!("\n=== TOP {shown} BY ISK/HOUR ===\n");
    print_table(&rows[..shown]);

    if rows.len() > shown {
        let worst = rows.len().min(count);
        println!("\n=== WORST {worst} ===\n");
        print_table(&rows[rows.len() - worst..]);
    }
}

fn print_table(rows: &[ReportRow]) {
    println!(
        "{:<36} {:>14} {:>12} {:>12} {:>9} {:>8} {:>14}",
        "Name", "Profit", "BP Cost", "Volume/day", "Mine h", "PI h", "ISK/hour"
    );
    println!("{}", "-".repeat(111));
    for row in rows {
        println!(
            "{:<36} {:>14.0} {:>12.0} {:>12.1} {:>9.2} {:>8.2} {:>14.0}",
            shortened(&row.name, 36),
            row.profit,
            row.blueprint_cost,
            row.daily_volume,
            row.mining_hours,
            row.pi_hours,
            row.isk_per_hour
        );
    }
}

fn shortened(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let mut short: String = name.chars().take(max - 1).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ReportRow {
        ReportRow {
            type_id: 34,
            name: "Test Widget".to_string(),
            volume_m3: 0.5,
            build_cost: 900.0,
            blueprint_cost: 10.0,
            blueprint_price: 40_000.0,
            total_cost: 910.0,
            sell_value: 1500.0,
            profit: 590.0,
            daily_volume: 120.0,
            mining_hours: 2.0,
            pi_hours: 0.0,
            total_hours: 2.0,
            isk_per_hour: 295.0,
        }
    }

    #[test]
    fn csv_rows_carry_headers_and_values() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(sample_row()).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("type_id,name,volume_m3"));
        assert!(header.ends_with("total_hours,isk_per_hour"));
        assert!(lines.next().unwrap().contains("Test Widget"));
    }

    #[test]
    fn long_names_are_shortened_for_the_console() {
        assert_eq!(shortened("short", 10), "short");
        let long = "a".repeat(40);
        let short = shortened(&long, 36);
        assert_eq!(short.chars().count(), 36);
        assert!(short.ends_with('…'));
    }
}
