//! Plain-text tables for ledger output

use super::tax::TaxSummary;
use super::types::{LedgerOutput, RealizedEvent};
use crate::utils::{format_signature_short, format_usd, timestamp_to_datetime};
use tabled::{
    settings::{object::Columns, object::Rows, Alignment, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct RealizedRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Signature")]
    signature: String,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&RealizedEvent> for RealizedRow {
    fn from(event: &RealizedEvent) -> Self {
        Self {
            date: timestamp_to_datetime(event.disposed_at)
                .format("%Y-%m-%d")
                .to_string(),
            asset: event.asset.clone(),
            quantity: format!("{:.6}", event.disposed_quantity),
            proceeds: format_usd(event.proceeds_usd),
            cost_basis: format_usd(event.cost_basis_usd),
            gain_loss: format_usd(event.gain_loss_usd),
            term: if event.is_long_term { "long" } else { "short" }.to_string(),
            signature: format_signature_short(&event.signature),
        }
    }
}

pub fn realized_table(events: &[RealizedEvent]) -> String {
    let rows: Vec<RealizedRow> = events.iter().map(RealizedRow::from).collect();
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .modify(Rows::first(), Alignment::center())
        .modify(Columns::new(2..6), Alignment::right());
    table.to_string()
}

pub fn summary_table(output: &LedgerOutput, tax: &TaxSummary) -> String {
    let rows = vec![
        SummaryRow {
            metric: "Realized events".to_string(),
            value: output.realized_events.len().to_string(),
        },
        SummaryRow {
            metric: "Open lots".to_string(),
            value: output.open_lots.len().to_string(),
        },
        SummaryRow {
            metric: "Total gain".to_string(),
            value: format_usd(output.total_gain),
        },
        SummaryRow {
            metric: "Total loss".to_string(),
            value: format_usd(output.total_loss),
        },
        SummaryRow {
            metric: "Net short-term".to_string(),
            value: format_usd(tax.net_short_term()),
        },
        SummaryRow {
            metric: "Net long-term".to_string(),
            value: format_usd(tax.net_long_term()),
        },
        SummaryRow {
            metric: "Estimated tax (illustrative)".to_string(),
            value: format_usd(tax.estimated_tax_usd),
        },
    ];
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    #[test]
    fn test_tables_render_values() {
        let event = RealizedEvent {
            asset: "SOL".to_string(),
            signature: "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW".to_string(),
            disposed_at: 1_700_000_000,
            disposed_quantity: 12.0,
            proceeds_usd: 48.0,
            cost_basis_usd: 14.0,
            gain_loss_usd: 34.0,
            holding_period_seconds: 100,
            is_long_term: false,
            consumed_lots: Vec::new(),
            shortfall_quantity: 0.0,
        };
        let table = realized_table(std::slice::from_ref(&event));
        assert!(table.contains("Gain/Loss"));
        assert!(table.contains("2023-11-14"));
        assert!(table.contains("short"));

        let output = LedgerOutput {
            realized_events: vec![event],
            open_lots: Vec::new(),
            total_gain: 34.0,
            total_loss: 0.0,
        };
        let tax = TaxSummary::from_events(&output.realized_events, &LedgerConfig::default());
        let summary = summary_table(&output, &tax);
        assert!(summary.contains("Realized events"));
        assert!(summary.contains("Estimated tax"));
    }
}
