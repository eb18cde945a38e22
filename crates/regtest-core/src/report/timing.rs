use super::ReportGenerator;
use crate::{
    error::ReportError,
    status::RunResults,
};
use itertools::Itertools;
use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    path::PathBuf,
};

const WIDE: usize = 100;

/// Per-case step times and per-step statistics, written to a file.
#[derive(Debug, Clone)]
pub struct TimingReport {
    path: PathBuf,
}

impl TimingReport {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn render(results: &RunResults) -> String {
        let rule = "=".repeat(WIDE);
        let mut out = String::new();
        let _ = writeln!(out, "{}\nTiming Summary Report\n{}\n", rule, rule);

        let all_steps: Vec<&str> = results
            .values()
            .flat_map(|result| result.timing.keys().map(String::as_str))
            .sorted()
            .dedup()
            .collect();
        let dashes = format!("  {} {} {}", "-".repeat(40), "-".repeat(12), "-".repeat(12));

        for (test_id, result) in results {
            let _ = writeln!(out, "\nTest: {}", test_id);
            let _ = write!(out, "Status: {}", result.status.code());
            if !result.reason.is_empty() {
                let _ = write!(out, " ({})", result.reason);
            }
            let _ = writeln!(out, "\n{}", "-".repeat(WIDE));

            if result.timing.is_empty() {
                let _ = writeln!(out, "  No timing data available");
            } else {
                let total: f64 = result.timing.values().sum();
                let _ = writeln!(out, "  {:<40} {:>12} {:>12}", "Step", "Time (s)", "Percentage");
                let _ = writeln!(out, "{}", dashes);
                for step in &all_steps {
                    if let Some(seconds) = result.timing.get(*step) {
                        let percentage = if total > 0.0 {
                            seconds / total * 100.0
                        } else {
                            0.0
                        };
                        let _ = writeln!(out, "  {:<40} {:>12.3} {:>11.1}%", step, seconds, percentage);
                    }
                }
                let _ = writeln!(out, "{}", dashes);
                let _ = writeln!(out, "  {:<40} {:>12.3} {:>11.1}%", "TOTAL", total, 100.0);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "\n{}\nSummary Statistics\n{}\n", rule, rule);
        let mut steps: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for result in results.values() {
            for (step, seconds) in &result.timing {
                let entry = steps.entry(step.as_str()).or_default();
                entry.0 += seconds;
                entry.1 += 1;
            }
        }
        if !steps.is_empty() {
            let dashes = format!(
                "  {} {} {} {}",
                "-".repeat(40),
                "-".repeat(15),
                "-".repeat(15),
                "-".repeat(10)
            );
            let _ = writeln!(
                out,
                "  {:<40} {:>15} {:>15} {:>10}",
                "Step", "Avg Time (s)", "Total Time (s)", "Count"
            );
            let _ = writeln!(out, "{}", dashes);
            for (step, (total, count)) in &steps {
                let _ = writeln!(
                    out,
                    "  {:<40} {:>15.3} {:>15.3} {:>10}",
                    step,
                    total / *count as f64,
                    total,
                    count
                );
            }
            let grand_total: f64 = steps.values().map(|(total, _)| total).sum();
            let _ = writeln!(out, "{}", dashes);
            let _ = writeln!(out, "  {:<40} {:>15} {:>15.3} {:>10}", "GRAND TOTAL", "", grand_total, "");
        }
        let _ = writeln!(out, "\n{}", rule);
        out
    }
}

impl ReportGenerator for TimingReport {
    fn generate(
        &self,
        results: &RunResults,
    ) -> Result<(), ReportError> {
        tracing::info!("Generating timing summary to: {}", self.path.display());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, Self::render(results))?;
        tracing::info!("Timing summary written to: {}", self.path.display());
        Ok(())
    }
}
