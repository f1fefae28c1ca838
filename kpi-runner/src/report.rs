use std::fmt::Write;

use kpi_common::{Kpi, KpiOutcome, KpiReport, KpiTable, Mismatch};

const RULE_WIDTH: usize = 30;

fn title(kpi: Kpi) -> String {
    kpi.name().replace('_', " ").to_uppercase()
}

/// Left-aligns every column to its widest cell.
fn render_rows(out: &mut String, header: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut push_line = |cells: &[String]| {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    };

    push_line(&header.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    for row in rows {
        push_line(&row);
    }
}

fn render_table(out: &mut String, table: &KpiTable) {
    if table.is_empty() {
        out.push_str("No data available\n");
        return;
    }

    match table {
        KpiTable::RepeatCustomers(rows) => render_rows(
            out,
            &["customer_name", "order_count"],
            rows.iter()
                .map(|r| vec![r.customer_name.clone(), r.order_count.to_string()])
                .collect(),
        ),
        KpiTable::MonthlyTrends(rows) => render_rows(
            out,
            &["month", "total_orders", "total_revenue"],
            rows.iter()
                .map(|r| {
                    vec![
                        r.month.clone(),
                        r.total_orders.to_string(),
                        format!("{:.2}", r.total_revenue),
                    ]
                })
                .collect(),
        ),
        KpiTable::RegionalRevenue(rows) => render_rows(
            out,
            &["region", "total_revenue"],
            rows.iter()
                .map(|r| vec![r.region.clone(), format!("{:.2}", r.total_revenue)])
                .collect(),
        ),
        KpiTable::TopSpenders(rows) => render_rows(
            out,
            &["customer_name", "total_spent"],
            rows.iter()
                .map(|r| vec![r.customer_name.clone(), format!("{:.2}", r.total_spent)])
                .collect(),
        ),
    }
}

/// Human readable rendering of one strategy's report.
pub fn render_report(report: &KpiReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} strategy ===", report.strategy);

    for kpi in Kpi::ALL {
        let _ = writeln!(out, "\n{}", title(kpi));
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

        match report.outcomes.get(&kpi) {
            Some(KpiOutcome::Computed(table)) => render_table(&mut out, table),
            Some(KpiOutcome::Failed { diagnostic }) => {
                let _ = writeln!(out, "Failed: {diagnostic}");
            }
            None => out.push_str("Not computed\n"),
        }
    }

    let failures = report.failures();
    if !failures.is_empty() {
        let names: Vec<&str> = failures.iter().map(|(kpi, _)| kpi.name()).collect();
        let _ = writeln!(out, "\nFailed KPIs: {}", names.join(", "));
    }

    out
}

pub fn render_comparison(left: &str, right: &str, mismatches: &[Mismatch]) -> String {
    if mismatches.is_empty() {
        return format!("{left} and {right} strategies agree on every KPI\n");
    }

    let mut out = format!(
        "{left} and {right} strategies disagree ({} mismatches):\n",
        mismatches.len()
    );
    for mismatch in mismatches {
        let _ = writeln!(out, "  {mismatch}");
    }
    out
}
