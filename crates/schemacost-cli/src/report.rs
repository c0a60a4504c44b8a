//! Plain-text rendering of core results.
//!
//! All display rounding lives here. Time and carbon are shown with 2 decimals,
//! price with 6, sizes in GiB with 3. The values handed in are always the
//! unrounded core values.

use schemacost_core::compare::{Comparison, RejectedCandidate};
use schemacost_core::cost::{CostEstimate, CostTotals};
use schemacost_core::plan::PlanEstimate;
use schemacost_core::sharding::ProbeResult;
use schemacost_core::size::{bytes_to_gib, DatabaseSizeReport};
use std::fmt::Write;

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Thousands separators for large counts.
pub fn group_digits(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn render_analysis(name: &str, sizes: &DatabaseSizeReport, probes: &[ProbeResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {name} ANALYSIS ===");
    let _ = writeln!(out, "DOCUMENT SIZES:");
    for c in &sizes.collections {
        let _ = writeln!(out, "  {}: {} bytes", c.collection, c.document_bytes);
    }
    let _ = writeln!(out, "COLLECTION SIZES (GiB):");
    for c in &sizes.collections {
        let _ = writeln!(out, "  {}: {:.3} GiB", c.collection, c.total_gib());
    }
    let _ = writeln!(out, "  TOTAL DB: {:.3} GiB", sizes.total_gib);
    if !probes.is_empty() {
        let _ = writeln!(out, "SHARDING:");
        for p in probes {
            let _ = writeln!(
                out,
                "  {} - {}: docs_per_server={}, distinct_keys_per_server={}",
                p.collection,
                p.key,
                group_digits(p.distribution.docs_per_server as u128),
                group_digits(p.distribution.distinct_keys_per_server as u128)
            );
        }
    }
    out
}

pub fn render_estimate(est: &CostEstimate) -> String {
    let mut out = String::new();
    let sharding = match &est.shard_key {
        Some(key) => format!("sharded on {key}"),
        None => "unsharded".to_string(),
    };
    let _ = writeln!(
        out,
        "{} {} ({})",
        est.operation,
        est.collections.join(" + "),
        sharding
    );
    let _ = writeln!(out, "  Docs scanned: {}", group_digits(est.docs_scanned));
    let _ = writeln!(out, "  Time: {:.2} s", round_to(est.time_seconds, 2));
    let _ = writeln!(out, "  Carbon: {:.2} g CO2", round_to(est.carbon_grams, 2));
    let _ = writeln!(out, "  Price: ${:.6}", round_to(est.price_usd, 6));
    if let Some(output) = &est.output {
        let _ = writeln!(
            out,
            "  Output: {} docs, {:.4} GiB",
            group_digits(output.output_docs),
            bytes_to_gib(output.output_size_bytes)
        );
    }
    out
}

fn render_totals(out: &mut String, label: &str, totals: &CostTotals) {
    let _ = writeln!(out, "{label}:");
    let _ = writeln!(out, "  Docs scanned: {}", group_digits(totals.docs_scanned));
    let _ = writeln!(out, "  Time: {:.2} s", round_to(totals.time_seconds, 2));
    let _ = writeln!(out, "  Carbon: {:.2} g CO2", round_to(totals.carbon_grams, 2));
    let _ = writeln!(out, "  Price: ${:.6}", round_to(totals.price_usd, 6));
}

pub fn render_plan(plan: &PlanEstimate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PLAN {}", plan.name);
    for (i, step) in plan.steps.iter().enumerate() {
        let _ = write!(out, "{}. {}", i + 1, render_estimate(step));
    }
    render_totals(&mut out, "TOTAL", &plan.totals);
    if let Some(output) = &plan.output {
        let _ = writeln!(
            out,
            "  Output: ~{} docs, ~{:.4} GiB",
            group_digits(output.docs),
            bytes_to_gib(output.size_bytes)
        );
    }
    out
}

pub fn render_comparison(cmp: &Comparison, rejected: &[RejectedCandidate]) -> String {
    let mut out = String::new();
    for c in &cmp.candidates {
        let _ = writeln!(out, "Model: {}", c.name);
        for op in &c.operations {
            let _ = writeln!(
                out,
                "  {} cost: ${:.6}",
                op.operation,
                round_to(op.price_usd, 6)
            );
        }
        let _ = writeln!(
            out,
            "  TOTAL ESTIMATED COST for {}: ${:.6}",
            c.name,
            round_to(c.totals.price_usd, 6)
        );
        let _ = writeln!(out, "  Storage: {:.3} GiB", c.storage_gib);
    }

    for r in rejected {
        let _ = writeln!(out, "Skipped {}: {}", r.name, r.error);
    }

    let _ = writeln!(out, "{}", "=".repeat(70));
    match &cmp.best_by_cost {
        Some(best) => {
            let total = cmp
                .candidate(best)
                .map(|c| c.totals.price_usd)
                .unwrap_or_default();
            let _ = writeln!(out, "BEST MODEL (query cost): {best} (${:.6})", round_to(total, 6));
        }
        None => {
            let _ = writeln!(out, "BEST MODEL (query cost): none");
        }
    }
    let _ = writeln!(out, "STORAGE RANKING: {}", cmp.storage_ranking.join(" < "));
    out
}
