//! Progress bar for download runs, fed by batch events.

use std::time::Duration;

use bilidown_core::BatchEvent;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Spawns the progress UI.
///
/// The task drains `events` until every sender is dropped. When `visible` is
/// false the bar is hidden but events are still consumed.
pub(crate) fn spawn_progress_ui(
    visible: bool,
    total_streams: u64,
    mut events: UnboundedReceiver<BatchEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = if visible {
            ProgressBar::new(total_streams)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} streams {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        while let Some(event) = events.recv().await {
            if matches!(event, BatchEvent::StreamCompleted { .. }) {
                bar.inc(1);
            }
            match event_line(&event) {
                EventLine::Status(message) => bar.set_message(message),
                EventLine::Notice(message) => bar.println(message),
            }
        }

        bar.finish_and_clear();
    })
}

#[derive(Debug, PartialEq, Eq)]
enum EventLine {
    /// Replaces the bar's trailing message.
    Status(String),
    /// Printed above the bar.
    Notice(String),
}

fn event_line(event: &BatchEvent) -> EventLine {
    match event {
        BatchEvent::ItemStarted { index, item } => {
            EventLine::Status(format!("#{} {}", index + 1, item.title))
        }
        BatchEvent::StreamCompleted { outcome, .. } => EventLine::Notice(format!(
            "{:.2} seconds download finish: {} ({})",
            outcome.elapsed_seconds(),
            outcome.item.title,
            outcome.kind
        )),
        BatchEvent::ItemFailed {
            index,
            title,
            error,
        } => EventLine::Notice(format!("failed #{} {title}: {error}", index + 1)),
        BatchEvent::Merged { output } => EventLine::Status(format!(
            "merged {}",
            output
                .file_name()
                .map_or_else(|| output.display().to_string(), |n| n.to_string_lossy().into_owned())
        )),
        BatchEvent::MergeFailed { video, error } => {
            EventLine::Notice(format!("merge failed for {}: {error}", video.display()))
        }
    }
}
