//! indicatif progress bar implementing ProgressSink.

use crate::domain::{JobCounters, JobReport, JobState, ProgressSnapshot};
use crate::ports::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.magenta} [{elapsed_precise}] {bar:40.cyan/magenta} {pos}/{len} {msg}";

pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    /// Bar sized to the id window `skip_offset+1 ..= total_count`.
    pub fn new(total_count: i32, skip_offset: i32) -> Self {
        let bar = ProgressBar::new(window_len(total_count, skip_offset));
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

fn window_len(total_count: i32, skip_offset: i32) -> u64 {
    u64::try_from(total_count.saturating_sub(skip_offset.max(0))).unwrap_or(0)
}

/// One-line tally shown next to the bar.
pub fn counters_line(c: &JobCounters) -> String {
    format!(
        "sent {} | deleted {} | non-media {} | duplicate {}",
        c.forwarded, c.deleted_skipped, c.non_media_skipped, c.duplicate_skipped
    )
}

/// Final multi-line summary for the terminal.
pub fn summary(report: &JobReport) -> String {
    let headline = match report.state {
        JobState::Completed => "Forwarding completed",
        JobState::Cancelled => "Forwarding cancelled",
        JobState::LimitReached => "Forward limit reached",
        JobState::Failed => "Forwarding failed",
        JobState::Running => "Forwarding still running",
    };
    let c = &report.counters;
    let mut out = format!(
        "{headline}\n  fetched:    {}/{}\n  forwarded:  {}\n  deleted:    {}\n  non-media:  {}\n  duplicates: {}\n  last id:    {}\n  elapsed:    {}s",
        c.fetched,
        report.total_count,
        c.forwarded,
        c.deleted_skipped,
        c.non_media_skipped,
        c.duplicate_skipped,
        report.cursor,
        report.elapsed_secs
    );
    if let Some(err) = &report.error {
        out.push_str(&format!("\n  error:      {err}"));
    }
    out
}

#[async_trait::async_trait]
impl ProgressSink for IndicatifProgress {
    async fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_position(snapshot.counters.fetched);
        self.bar.set_message(counters_line(&snapshot.counters));
    }

    async fn on_finish(&self, report: &JobReport) {
        self.bar.set_position(report.counters.fetched);
        self.bar
            .finish_with_message(format!("{} | {}", report.state, counters_line(&report.counters)));
    }
}
