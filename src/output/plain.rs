//! Plain text report.

use crate::coordinator::{Preparation, RunReport};
use crate::theme::Themed;

fn render_timeout(timeout_secs: Option<f64>) -> String {
    match timeout_secs {
        Some(secs) => format!("{}s", secs),
        None => "none".to_string(),
    }
}

fn render_value(value: Option<i32>) -> String {
    value.map_or_else(|| "n/a".warning(), |v| v.to_string())
}

/// Render the pre-fork preparation summary.
pub fn render_preparation(prep: &Preparation) -> String {
    let lines = [
        String::new(),
        "=== Preparation Timings ===".section_header(),
        format!(
            "{} {:.3}ms",
            "Argument parsing time:".label(),
            prep.argument_handling_ms
        ),
        format!(
            "{} {:.3}ms",
            "Array generation time:".label(),
            prep.array_generation_ms
        ),
        format!("{} {:.3}ms", "Total preparation time:".label(), prep.total_ms()),
        format!(
            "Array size: {}, Processes: {}, Timeout: {}",
            prep.array_size,
            prep.pnum,
            render_timeout(prep.timeout_secs)
        ),
        "===========================".section_header(),
        String::new(),
    ];
    lines.join("\n") + "\n"
}

/// Render the final timings and results.
pub fn render_report(report: &RunReport) -> String {
    let t = &report.timings;
    let mut lines = vec![
        String::new(),
        "=== Detailed Timings ===".section_header(),
        format!("1. Preparation stages: {:.3}ms", t.preparation_ms()),
        format!("   - Argument parsing: {:.3}ms", t.argument_handling_ms),
        format!("   - Array generation: {:.3}ms", t.array_generation_ms),
        format!("2. Parallel processing: {:.3}ms", t.parallel_ms),
        format!("3. Results processing: {:.3}ms", t.collection_ms),
        format!("4. Total program time: {:.3}ms", t.total_ms),
        "========================".section_header(),
        String::new(),
        "=== Results ===".section_header(),
        format!("{} {}", "Min:".label(), render_value(report.min)),
        format!("{} {}", "Max:".label(), render_value(report.max)),
        format!(
            "{} {}/{}",
            "Completed processes:".label(),
            report.workers_completed,
            report.workers_total
        ),
    ];

    let status = if report.timed_out {
        format!(
            "{} (processes were killed after {} seconds)",
            "TIMEOUT".warning(),
            report.timeout_secs.unwrap_or_default()
        )
    } else if report.workers_completed == report.workers_total {
        format!("{} (all processes finished normally)", "COMPLETED".success())
    } else {
        format!(
            "{} ({} processes produced no result)",
            "COMPLETED".success(),
            report.workers_total - report.workers_completed
        )
    };
    lines.push(format!("{} {}", "Status:".label(), status));

    if let Some(efficiency) = t.efficiency_percent() {
        lines.push(format!("Parallel efficiency: {:.1}%", efficiency));
    }

    lines.join("\n") + "\n"
}
