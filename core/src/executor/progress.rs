use std::collections::BTreeMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::types::{Direction, VertexId};

/// Terminal progress bars for a run: one overall bar plus a spinner per
/// in-flight unit. A disabled monitor accepts every call and draws nothing.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    units: BTreeMap<VertexId, ProgressBar>,
    direction: Direction,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_units: usize, direction: Direction, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                units: BTreeMap::new(),
                direction,
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_units as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stacks ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message(format!("{} starting...", direction.title()));

        Self {
            multi,
            overall,
            units: BTreeMap::new(),
            direction,
            enabled: true,
        }
    }

    pub fn start_unit(&mut self, vertex: &VertexId) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(format!("{} {}", self.direction.operation(), vertex));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.units.insert(vertex.clone(), bar);
    }

    pub fn complete_unit(&mut self, vertex: &VertexId, success: bool, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.units.remove(vertex) {
            let icon = if success { "✅" } else { "❌" };
            bar.finish_with_message(format!("{icon} {vertex} ({duration_ms}ms)"));
        }

        self.overall.inc(1);
    }

    /// `stage` is 1-based.
    pub fn update_stage(&self, stage: usize, total_stages: usize) {
        if self.enabled {
            self.overall
                .set_message(format!("Stage {stage}/{total_stages}"));
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = match (success, self.direction) {
            (true, Direction::Apply) => "✅ All stacks deployed",
            (true, Direction::Teardown) => "✅ All stacks destroyed",
            (false, _) => "❌ Some stacks failed",
        };
        self.overall.finish_with_message(msg);
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in std::mem::take(&mut self.units) {
            bar.finish_and_clear();
        }
    }
}
