use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use itertools::Itertools;
use mapforge::config::MetricGroup;
use mapforge::objective::fingering::FingeringKind;
use mapforge::objective::{GroupMetric, Metric};
use mapforge::optimizer::OptimizationResult;
use mapforge::problem::CodeTableEntry;
use strum::IntoEnumIterator;

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| "-".into())
}

fn fingering_cell(group: &GroupMetric) -> String {
    let Some(values) = &group.fingering else {
        return "-".into();
    };
    FingeringKind::iter()
        .filter_map(|kind| {
            values
                .get(kind as usize)
                .copied()
                .flatten()
                .map(|v| format!("{} {:.2}%", kind, v * 100.0))
        })
        .join("\n")
}

fn levels_cell(group: &GroupMetric) -> String {
    match &group.levels {
        Some(levels) => levels
            .iter()
            .map(|l| format!("{}: {:.2}%", l.length, l.frequency * 100.0))
            .join("\n"),
        None => "-".into(),
    }
}

fn tiers_cell(group: &GroupMetric) -> String {
    let Some(tiers) = &group.tiers else {
        return "-".into();
    };
    tiers
        .iter()
        .map(|t| {
            let top = t.top.map_or_else(|| "all".to_string(), |n| n.to_string());
            let dup = t.duplication.map_or_else(|| "-".to_string(), |d| d.to_string());
            format!("top {}: {} dup", top, dup)
        })
        .join("\n")
}

pub fn print_metric(metric: &Metric, score: f64) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Group").add_attribute(Attribute::Bold),
        Cell::new("Dup").fg(Color::Red),
        Cell::new("KeyDist"),
        Cell::new("PairEq"),
        Cell::new("Fingering"),
        Cell::new("Levels"),
        Cell::new("Tiers"),
    ]);

    for group in MetricGroup::iter() {
        let Some(m) = metric.group(group) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(group.to_string()).add_attribute(Attribute::Bold),
            Cell::new(percent(m.duplication)).fg(Color::Red),
            Cell::new(m.key_distribution.map_or_else(|| "-".into(), |v| format!("{:.4}", v))),
            Cell::new(m.pair_equivalence.map_or_else(|| "-".into(), |v| format!("{:.4}", v))),
            Cell::new(fingering_cell(m)),
            Cell::new(levels_cell(m)),
            Cell::new(tiers_cell(m)),
        ]);
    }
    for i in 1..=3 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("\n{}", table);
    println!("Score: {:.6}", score);
}

pub fn print_code_table(rows: &[CodeTableEntry], top: usize) {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.add_row(vec![
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("Full"),
        Cell::new("Short"),
        Cell::new("Freq"),
    ]);
    for row in rows.iter().take(top) {
        let full = Cell::new(&row.full);
        table.add_row(vec![
            Cell::new(&row.name),
            if row.full_rank > 0 { full.fg(Color::Red) } else { full },
            Cell::new(&row.short),
            Cell::new(row.frequency).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("\n{}", table);
    if rows.len() > top {
        println!("... {} more", rows.len() - top);
    }
}

pub fn print_summary(result: &OptimizationResult) {
    println!("\n=== 🏆 FINAL RESULT ===");
    if let Some(id) = &result.run_id {
        println!("Run: {}", id);
    }
    println!(
        "Score: {:.6} after {} steps in {:.2}s",
        result.score, result.steps, result.elapsed_secs
    );
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    for (name, keys) in &result.rendered {
        table.add_row(vec![Cell::new(name), Cell::new(keys)]);
    }
    println!("{}", table);
}
