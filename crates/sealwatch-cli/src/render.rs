//! Terminal output: per-block lines and the final summary table

use {
    colored::Colorize,
    sealwatch_chain::ChainClient,
    sealwatch_core::{BlockRecord, ScanReport},
    tokio::sync::mpsc,
    tracing::debug,
};

pub struct Symbols {
    pub signed: String,
    pub missed: String,
}

/// Print records as the scan produces them; ends when the channel closes.
pub async fn print_records(
    mut rx: mpsc::Receiver<BlockRecord>,
    symbols: Symbols,
    show_addresses: bool,
) {
    while let Some(record) = rx.recv().await {
        println!("{}", format_record(&record, &symbols, show_addresses));
    }
}

/// One line per block: epoch, block number, the seal rendered with the
/// highest validator index leftmost, the missed count, and an epoch
/// boundary marker.
fn format_record(record: &BlockRecord, symbols: &Symbols, show_addresses: bool) -> String {
    let mut seal = String::new();
    for k in (0..record.signed.len()).rev() {
        if record.signed[k] {
            seal.push_str(&symbols.signed.green().to_string());
        } else {
            seal.push_str(&symbols.missed.red().to_string());
        }
    }

    let addresses = if show_addresses && !record.down.is_empty() {
        let list: Vec<String> = record.down.iter().map(|v| v.to_string()).collect();
        format!(" {}", list.join(","))
    } else {
        String::new()
    };
    let marker = if record.epoch_change { " EPOCH CHANGE" } else { "" };

    format!(
        "{} {} {} {} down{}{}",
        record.epoch, record.block, seal, record.down_count, addresses, marker
    )
}

/// Final summary table, worst signers last.
pub async fn print_snapshot<C: ChainClient>(client: &C, report: &ScanReport) {
    if report.snapshot.is_empty() {
        return;
    }

    let headers = ["down", "total", "percent", "name", "address", "signer"];
    let mut rows: Vec<[String; 6]> = Vec::with_capacity(report.snapshot.len());
    for stat in &report.snapshot {
        let name = match client.display_name_of(&stat.address).await {
            Ok(name) => name.unwrap_or_default(),
            Err(e) => {
                debug!("name lookup for {} failed: {}", stat.address, e);
                String::new()
            }
        };
        let signer = report
            .signers
            .get(&stat.address)
            .map(|s| s.to_string())
            .unwrap_or_default();
        rows.push([
            stat.missed_blocks.to_string(),
            stat.total_blocks.to_string(),
            format!("{:.0}%", stat.miss_ratio() * 100.0),
            name,
            stat.address.to_string(),
            signer,
        ]);
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let render_line = |cells: &[&str]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!();
    println!("{}", render_line(&headers));
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        println!("{}", render_line(&cells));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealwatch_common::types::ValidatorId;

    fn record() -> BlockRecord {
        BlockRecord {
            epoch: 2,
            block: 25,
            validators: vec![
                ValidatorId::from("account_a"),
                ValidatorId::from("account_b"),
                ValidatorId::from("account_c"),
            ],
            signed: vec![true, false, true],
            raw_signed: vec![true, false, true],
            down: vec![ValidatorId::from("account_b")],
            down_count: 1,
            epoch_change: true,
        }
    }

    fn symbols() -> Symbols {
        Symbols { signed: ".".into(), missed: "X".into() }
    }

    #[test]
    fn test_format_record_line() {
        colored::control::set_override(false);
        let line = format_record(&record(), &symbols(), true);
        assert_eq!(line, "2 25 .X. 1 down account_b EPOCH CHANGE");
    }

    #[test]
    fn test_format_record_hides_addresses() {
        colored::control::set_override(false);
        let mut rec = record();
        rec.epoch_change = false;
        let line = format_record(&rec, &symbols(), false);
        assert_eq!(line, "2 25 .X. 1 down");
    }
}
