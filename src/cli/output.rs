//! Output formatting for CLI

use crate::{
    pipeline::{EvaluationReport, MetricsSummary, TrainingReport},
    q_learning::QRow,
    game::Action,
};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(40));
}

/// Format a number with thousands separators
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i.is_multiple_of(3) {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

/// Format a fraction in `[0, 1]` as a percentage
pub fn format_pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{}:", key), value);
}

pub fn print_evaluation(report: &EvaluationReport) {
    println!(
        "  {:14} {:>7} {:>7} {:>7} {:>8} {:>8}",
        "opponent", "win", "draw", "loss", "length", "reward"
    );
    for result in &report.results {
        println!(
            "  {:14} {:>7} {:>7} {:>7} {:>8.2} {:>8.3}",
            result.opponent.label(),
            format_pct(result.win_rate),
            format_pct(result.draw_rate),
            format_pct(result.loss_rate),
            result.avg_length,
            result.avg_reward,
        );
    }
    print_kv("Mean win rate", &format_pct(report.mean_win_rate()));
}

pub fn print_training_report(report: &TrainingReport) {
    print_section("Training Results");
    print_kv("Episodes", &format_number(report.episodes_run));
    print_kv(
        "Wins",
        &format!("{} ({})", report.wins, format_pct(report.win_rate)),
    );
    print_kv(
        "Draws",
        &format!("{} ({})", report.draws, format_pct(report.draw_rate)),
    );
    print_kv(
        "Losses",
        &format!("{} ({})", report.losses, format_pct(report.loss_rate)),
    );
    print_kv("Avg reward", &format!("{:.3}", report.avg_reward));
    print_kv("Avg length", &format!("{:.2}", report.avg_length));
    print_kv(
        "Coverage",
        &format!(
            "{:.2}% ({} / {})",
            report.coverage_pct,
            format_number(report.visited_states),
            format_number(report.reachable_states)
        ),
    );
    print_kv("Table rows", &format_number(report.table_size));
    if report.pruned_rows > 0 {
        print_kv("Pruned rows", &format_number(report.pruned_rows));
    }
    print_kv("Version", &report.version.to_string());
    print_kv("Stopped", &report.stop_reason.to_string());

    if let Some(evaluation) = report.last_evaluation() {
        print_subsection(&format!("Evaluation after episode {}", evaluation.episode));
        print_evaluation(evaluation);
    }
}

/// Print per-opponent training outcomes and update statistics
pub fn print_metrics(metrics: &MetricsSummary) {
    print_subsection("Outcomes by opponent");
    for (opponent, counts) in &metrics.by_opponent {
        let total = counts.total().max(1) as f64;
        println!(
            "  {:14} {:>7} W {:>7} D {:>7} L  ({} win)",
            opponent,
            counts.wins,
            counts.draws,
            counts.losses,
            format_pct(counts.wins as f64 / total)
        );
    }
    print_kv("Avg bonus", &format!("{:.4}", metrics.avg_bonus));
    print_kv("Mean |TD error|", &format!("{:.4}", metrics.mean_abs_td_error));
}

/// Print one Q-row with the greedy action marked
pub fn print_q_row(row: &QRow) {
    let best = row.argmax();
    for action in Action::ALL {
        let marker = if action == best { "*" } else { " " };
        println!(
            "  {marker} {:8} {:>10.4}",
            action.label(),
            row.values()[action.index()]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.5), "50.0%");
        assert_eq!(format_pct(1.0), "100.0%");
    }
}
