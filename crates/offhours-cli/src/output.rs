//! Human-readable and JSON rendering of command results.

use std::fmt::Write as _;

use offhours_control::{StartOutcome, StartReport, StopOutcome, StopReport};
use serde::Serialize;

/// Print a value as pretty JSON or via its `Display` impl.
pub fn print<T: Serialize + std::fmt::Display>(value: &T, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{value}");
    }
    Ok(())
}

pub fn print_stop(outcome: &StopOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print!("{}", render_stop(outcome));
    }
    Ok(())
}

pub fn print_start(outcome: &StartOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print!("{}", render_start(outcome));
    }
    Ok(())
}

fn render_stop(outcome: &StopOutcome) -> String {
    match outcome {
        StopOutcome::AlreadyStopped { record } => format!(
            "Cluster already stopped at {}, nothing to do\n",
            record.stopped_at.to_rfc3339()
        ),
        StopOutcome::Stopped(report) => render_stop_report(report),
        StopOutcome::Interrupted { .. } => {
            "Stop interrupted by shutdown before any workload was scaled, nothing recorded\n"
                .to_string()
        }
    }
}

fn render_stop_report(report: &StopReport) -> String {
    let mut out = String::new();
    let headline = if report.interrupted {
        "Stop interrupted by shutdown"
    } else if report.is_degraded() {
        "Cluster stopped with warnings"
    } else {
        "Cluster stopped"
    };
    let _ = writeln!(out, "{headline}");
    match &report.backup_id {
        Some(id) => {
            let _ = writeln!(out, "  backup:  {id}");
        }
        None => {
            let _ = writeln!(out, "  backup:  failed (stopped without a backup)");
        }
    }
    let _ = writeln!(
        out,
        "  scaled:  {} ok, {} failed",
        report.scaled,
        report.failures.len()
    );
    for failure in &report.failures {
        let _ = writeln!(out, "    {failure}");
    }
    out
}

fn render_start(outcome: &StartOutcome) -> String {
    match outcome {
        StartOutcome::AlreadyRunning => "Cluster is running, nothing to restore\n".to_string(),
        StartOutcome::Started(report) => render_start_report("Cluster started", report),
        StartOutcome::Interrupted(report) => {
            render_start_report("Start interrupted by shutdown, stop state kept", report)
        }
    }
}

fn render_start_report(headline: &str, report: &StartReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(
        out,
        "  restored: {} ok, {} failed",
        report.restored,
        report.failures.len()
    );
    for failure in &report.failures {
        let _ = writeln!(out, "    {failure}");
    }
    out
}
