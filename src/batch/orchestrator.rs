//! Bounded worker pool driving locate, persist and merge across a batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use super::error::{BatchError, ItemError};
use super::workspace::TempWorkspace;
use super::{BatchEvent, BatchJob, BatchReport, DownloadMode, ItemFailure};
use crate::config::{DownloaderConfig, FailurePolicy};
use crate::download::{
    DownloadError, DownloadOutcome, HttpClient, PolitenessGovernor, ResilientFetcher, RetryPolicy,
    StreamPersister, artifact_path, media_file_name,
};
use crate::headers::HeaderProvider;
use crate::media::{MediaItem, StreamKind};
use crate::merge::{MergeError, Merger, Muxer};
use crate::resolver::StreamLocator;

type EventSender = Option<mpsc::UnboundedSender<BatchEvent>>;

/// Per-item work shared by every worker task.
#[derive(Debug)]
struct Pipeline {
    locator: StreamLocator,
    persister: StreamPersister,
    headers: Arc<dyn HeaderProvider>,
    governor: PolitenessGovernor,
    audio_extension: String,
    video_extension: String,
    sanitize_titles: bool,
}

impl Pipeline {
    fn file_name(&self, item: &MediaItem, kind: StreamKind) -> String {
        let extension = match kind {
            StreamKind::Audio => &self.audio_extension,
            StreamKind::Video => &self.video_extension,
        };
        media_file_name(item, extension, self.sanitize_titles)
    }

    fn artifact_path(
        &self,
        dir: &Path,
        item: &MediaItem,
        kind: StreamKind,
    ) -> Result<PathBuf, DownloadError> {
        artifact_path(dir, &self.file_name(item, kind))
    }

    /// Locates and persists every stream `mode` needs for one item.
    #[instrument(skip(self, item, dir, events), fields(bvid = %item.base_id, cid = %item.stream_id))]
    async fn process_item(
        &self,
        index: usize,
        item: &MediaItem,
        dir: &Path,
        mode: DownloadMode,
        events: &EventSender,
    ) -> Result<Vec<DownloadOutcome>, ItemError> {
        // An unusable title fails the item before any request is made.
        let mut destinations = Vec::with_capacity(mode.kinds().len());
        for &kind in mode.kinds() {
            destinations.push((kind, self.artifact_path(dir, item, kind)?));
        }

        let mut outcomes = Vec::with_capacity(destinations.len());
        for (position, (kind, dest)) in destinations.into_iter().enumerate() {
            self.governor.delay_before_request().await;
            let url = self.locator.locate_stream(item, kind).await?;

            if position == 0 {
                self.governor.delay_before_media().await;
            }

            let outcome = self
                .persister
                .persist(item, kind, &url, &dest, self.headers.media_headers(item))
                .await?;
            emit(
                events,
                BatchEvent::StreamCompleted {
                    index,
                    outcome: outcome.clone(),
                },
            );
            outcomes.push(outcome);
        }

        self.governor.delay_after_item().await;
        Ok(outcomes)
    }

    /// Removes whatever a failed combined-mode item left in the workspace.
    async fn discard_partial(&self, item: &MediaItem, dir: &Path) {
        for &kind in DownloadMode::Combined.kinds() {
            let Ok(path) = self.artifact_path(dir, item, kind) else {
                continue;
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "removed partial artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial artifact"),
            }
        }
    }
}

/// What the download phase produced, in job order.
#[derive(Debug, Default)]
struct Downloads {
    outcomes: Vec<DownloadOutcome>,
    failures: Vec<ItemFailure>,
}

/// Drives a [`BatchJob`] to completion.
///
/// # Concurrency Model
///
/// - Each item runs in its own Tokio task
/// - A semaphore permit is acquired before an item is dispatched, so at most
///   `concurrency` items are in flight
/// - Results come back over a channel and are re-sorted into job order
///
/// # Failure Policy
///
/// With [`FailurePolicy::AbortBatch`] the first failed item stops further
/// dispatch (items already in flight finish) and the run returns
/// [`BatchError::Item`]. With [`FailurePolicy::ContinueOnError`] every item is
/// attempted and any failure yields [`BatchError::Partial`].
///
/// In combined mode the temporary workspace is removed on every exit path.
#[derive(Debug)]
pub struct BatchOrchestrator {
    pipeline: Arc<Pipeline>,
    merger: Merger,
    concurrency: usize,
    failure_policy: FailurePolicy,
    temp_parent: Option<PathBuf>,
    events: EventSender,
}

impl BatchOrchestrator {
    /// Builds the pipeline described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if an HTTP client cannot be built.
    #[instrument(level = "debug", skip_all)]
    pub fn new(
        config: &DownloaderConfig,
        headers: Arc<dyn HeaderProvider>,
        muxer: Arc<dyn Muxer>,
    ) -> Result<Self, DownloadError> {
        let fetcher = ResilientFetcher::new(
            HttpClient::for_api(config)?,
            RetryPolicy::from_config(config),
        );
        let pipeline = Pipeline {
            locator: StreamLocator::new(fetcher, Arc::clone(&headers), config.api_root()),
            persister: StreamPersister::new(HttpClient::for_media(config)?),
            headers,
            governor: PolitenessGovernor::from_config(config),
            audio_extension: config.audio_extension.clone(),
            video_extension: config.video_extension.clone(),
            sanitize_titles: config.sanitize_titles,
        };

        let concurrency = config.concurrency.max(1);
        debug!(
            concurrency,
            max_attempts = config.max_attempts,
            failure_policy = ?config.failure_policy,
            politeness_disabled = pipeline.governor.is_disabled(),
            "creating batch orchestrator"
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            merger: Merger::from_config(config, muxer),
            concurrency,
            failure_policy: config.failure_policy,
            temp_parent: config.temp_parent.clone(),
            events: None,
        })
    }

    /// Sends [`BatchEvent`]s to `sender` while running.
    #[must_use]
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Returns the worker-pool size.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `job`.
    ///
    /// # Errors
    ///
    /// - [`BatchError::FileSystem`] if the target directory cannot be created
    /// - [`BatchError::Merge`] if the multiplexer is unavailable (checked
    ///   before any download) or, under `AbortBatch`, a pair fails to merge
    ///   or fewer merged files appear than items were downloaded
    /// - [`BatchError::Workspace`] if the workspace cannot be created or removed
    /// - [`BatchError::Item`] / [`BatchError::Partial`] per the failure policy
    #[instrument(skip(self, job), fields(items = job.items.len(), mode = %job.mode, target = %job.target_dir.display()))]
    pub async fn run(&self, job: &BatchJob) -> Result<BatchReport, BatchError> {
        let started = Instant::now();
        info!("starting batch");

        tokio::fs::create_dir_all(&job.target_dir)
            .await
            .map_err(|e| BatchError::file_system(&job.target_dir, e))?;

        if !job.mode.is_combined() {
            let downloads = self
                .download_all(&job.items, &job.target_dir, job.mode)
                .await?;
            return self.finish(job, downloads, Vec::new(), Vec::new(), started);
        }

        self.merger.ensure_available()?;
        let workspace = TempWorkspace::create(self.temp_parent.as_deref())?;

        match self.download_and_merge(job, workspace.path()).await {
            Ok((downloads, merged, merge_failures)) => {
                workspace.close()?;
                self.finish(job, downloads, merged, merge_failures, started)
            }
            Err(error) => {
                if let Err(close_error) = workspace.close() {
                    warn!(error = %close_error, "failed to remove temporary workspace");
                }
                Err(error)
            }
        }
    }

    async fn download_and_merge(
        &self,
        job: &BatchJob,
        workspace: &Path,
    ) -> Result<(Downloads, Vec<PathBuf>, Vec<MergeError>), BatchError> {
        let downloads = self.download_all(&job.items, workspace, job.mode).await?;
        if self.failure_policy == FailurePolicy::AbortBatch && !downloads.failures.is_empty() {
            debug!("skipping merge after item failure");
            return Ok((downloads, Vec::new(), Vec::new()));
        }

        let mut merged = Vec::new();
        let mut merge_failures = Vec::new();
        for merge_job in self.merger.discover(workspace, &job.target_dir).await? {
            match self.merger.merge_job(&merge_job).await {
                Ok(output) => {
                    emit(
                        &self.events,
                        BatchEvent::Merged {
                            output: output.clone(),
                        },
                    );
                    merged.push(output);
                }
                Err(error) => {
                    warn!(video = %merge_job.video.display(), error = %error, "merge failed");
                    emit(
                        &self.events,
                        BatchEvent::MergeFailed {
                            video: merge_job.video.clone(),
                            error: error.to_string(),
                        },
                    );
                    if self.failure_policy == FailurePolicy::AbortBatch {
                        return Err(BatchError::Merge(error));
                    }
                    merge_failures.push(error);
                }
            }
        }

        // Colliding titles share one workspace pair, so fewer outputs appear than items succeeded.
        let expected = downloads
            .outcomes
            .iter()
            .filter(|outcome| outcome.kind == StreamKind::Video)
            .count();
        if merged.len() + merge_failures.len() < expected {
            let error = MergeError::Shortfall {
                expected,
                merged: merged.len(),
            };
            warn!(error = %error, "merged output missing");
            if self.failure_policy == FailurePolicy::AbortBatch {
                return Err(BatchError::Merge(error));
            }
            merge_failures.push(error);
        }
        Ok((downloads, merged, merge_failures))
    }

    /// Dispatches every item to the worker pool and collects results in job order.
    async fn download_all(
        &self,
        items: &[MediaItem],
        dir: &Path,
        mode: DownloadMode,
    ) -> Result<Downloads, BatchError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let aborted = Arc::new(AtomicBool::new(false));
        let abort_on_failure = self.failure_policy == FailurePolicy::AbortBatch;
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| BatchError::SemaphoreClosed)?;

            if aborted.load(Ordering::SeqCst) {
                info!(
                    remaining = items.len() - index,
                    "not dispatching remaining items after failure"
                );
                break;
            }

            let pipeline = Arc::clone(&self.pipeline);
            let aborted = Arc::clone(&aborted);
            let events = self.events.clone();
            let result_tx = result_tx.clone();
            let item = item.clone();
            let dir = dir.to_path_buf();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                emit(
                    &events,
                    BatchEvent::ItemStarted {
                        index,
                        item: item.clone(),
                    },
                );

                let result = pipeline
                    .process_item(index, &item, &dir, mode, &events)
                    .await;

                if let Err(error) = &result {
                    warn!(index, title = %item.title, error = %error, "item failed");
                    emit(
                        &events,
                        BatchEvent::ItemFailed {
                            index,
                            title: item.title.clone(),
                            error: error.to_string(),
                        },
                    );
                    if mode.is_combined() {
                        pipeline.discard_partial(&item, &dir).await;
                    }
                    // Set before the permit is released so the dispatcher sees it.
                    if abort_on_failure {
                        aborted.store(true, Ordering::SeqCst);
                    }
                }

                let _ = result_tx.send((index, item, result));
            }));
        }
        drop(result_tx);

        debug!(task_count = handles.len(), "waiting for items to complete");
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "item task panicked");
            }
        }

        let mut results = Vec::with_capacity(items.len());
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut downloads = Downloads::default();
        for (index, item, result) in results {
            match result {
                Ok(outcomes) => downloads.outcomes.extend(outcomes),
                Err(error) => downloads.failures.push(ItemFailure { index, item, error }),
            }
        }
        info!(
            streams = downloads.outcomes.len(),
            failed = downloads.failures.len(),
            "download phase complete"
        );
        Ok(downloads)
    }

    fn finish(
        &self,
        job: &BatchJob,
        downloads: Downloads,
        merged: Vec<PathBuf>,
        merge_failures: Vec<MergeError>,
        started: Instant,
    ) -> Result<BatchReport, BatchError> {
        let report = BatchReport {
            items: job.items.len(),
            outcomes: downloads.outcomes,
            merged,
            failures: downloads.failures,
            merge_failures,
            elapsed: started.elapsed(),
        };
        info!(
            streams = report.outcomes.len(),
            merged = report.merged.len(),
            failed = report.failures.len(),
            elapsed_secs = report.elapsed_seconds(),
            "batch complete"
        );

        if report.is_success() {
            return Ok(report);
        }
        match self.failure_policy {
            FailurePolicy::AbortBatch => match report.failures.into_iter().next() {
                Some(failure) => Err(BatchError::Item {
                    index: failure.index,
                    title: failure.item.title,
                    source: failure.error,
                }),
                // Merge failures under this policy return early.
                None => Ok(BatchReport {
                    failures: Vec::new(),
                    ..report
                }),
            },
            FailurePolicy::ContinueOnError => Err(BatchError::Partial {
                report: Box::new(report),
            }),
        }
    }
}

fn emit(events: &EventSender, event: BatchEvent) {
    if let Some(sender) = events {
        // A dropped receiver only means nobody is watching.
        let _ = sender.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::headers::StaticHeaderProvider;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    #[derive(Debug, Default)]
    struct RecordingMuxer {
        outputs: Mutex<Vec<PathBuf>>,
        unavailable: bool,
    }

    #[async_trait]
    impl Muxer for RecordingMuxer {
        fn ensure_available(&self) -> Result<(), MergeError> {
            if self.unavailable {
                return Err(MergeError::spawn("fake-ffmpeg", "not installed"));
            }
            Ok(())
        }

        async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
            let mut bytes = std::fs::read(video).map_err(|e| MergeError::io(video, e))?;
            bytes.extend(std::fs::read(audio).map_err(|e| MergeError::io(audio, e))?);
            std::fs::write(output, bytes).map_err(|e| MergeError::io(output, e))?;
            self.outputs.lock().unwrap().push(output.to_path_buf());
            Ok(())
        }
    }

    fn config(server: &MockServer, temp_parent: &Path) -> DownloaderConfig {
        DownloaderConfig {
            api_base_url: server.uri(),
            temp_parent: Some(temp_parent.to_path_buf()),
            max_attempts: 1,
            ..DownloaderConfig::default()
        }
        .without_delays()
    }

    fn orchestrator(config: &DownloaderConfig, muxer: Arc<RecordingMuxer>) -> BatchOrchestrator {
        BatchOrchestrator::new(config, Arc::new(StaticHeaderProvider::default()), muxer).unwrap()
    }

    async fn mount_streams(server: &MockServer, cid: &str) {
        Mock::given(method("GET"))
            .and(path("/x/player/playurl"))
            .and(query_param("cid", cid))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"dash": {
                    "audio": [{"baseUrl": format!("{}/media/{cid}/audio", server.uri())}],
                    "video": [{"baseUrl": format!("{}/media/{cid}/video", server.uri())}]
                }}
            })))
            .mount(server)
            .await;
        for kind in ["audio", "video"] {
            Mock::given(method("GET"))
                .and(path(format!("/media/{cid}/{kind}")))
                .respond_with(ResponseTemplate::new(206).set_body_bytes(format!("{kind}-{cid}")))
                .mount(server)
                .await;
        }
    }

    fn items(count: usize) -> Vec<MediaItem> {
        (1..=count)
            .map(|n| MediaItem::new("BV1xx411c7mD", n.to_string(), format!("Part {n}")))
            .collect()
    }

    #[tokio::test]
    async fn test_run_video_only_writes_into_target() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_streams(&server, "1").await;
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out");

        let report = orchestrator(&config(&server, temp.path()), Arc::default())
            .run(&BatchJob::new(items(1), &target, DownloadMode::VideoOnly))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].kind, StreamKind::Video);
        assert_eq!(
            std::fs::read(target.join("Part 1.mp4")).unwrap(),
            b"video-1"
        );
        assert!(report.merged.is_empty());
    }

    #[tokio::test]
    async fn test_run_combined_merges_and_removes_workspace() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_streams(&server, "1").await;
        mount_streams(&server, "2").await;
        let temp = TempDir::new().unwrap();
        let workspace_parent = temp.path().join("tmp");
        let target = temp.path().join("out");
        let muxer = Arc::new(RecordingMuxer::default());

        let report = orchestrator(&config(&server, &workspace_parent), Arc::clone(&muxer))
            .run(&BatchJob::new(items(2), &target, DownloadMode::Combined))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(
            report.merged,
            vec![target.join("Part 1.mp4"), target.join("Part 2.mp4")]
        );
        assert_eq!(
            std::fs::read(target.join("Part 2.mp4")).unwrap(),
            b"video-2audio-2"
        );
        assert_eq!(std::fs::read_dir(&workspace_parent).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_combined_preflight_fails_before_any_request() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();
        let muxer = Arc::new(RecordingMuxer {
            unavailable: true,
            ..RecordingMuxer::default()
        });

        let result = orchestrator(&config(&server, temp.path()), muxer)
            .run(&BatchJob::new(
                items(1),
                temp.path().join("out"),
                DownloadMode::Combined,
            ))
            .await;
        assert!(matches!(
            result,
            Err(BatchError::Merge(MergeError::Spawn { .. }))
        ));
    }

    #[tokio::test]
    async fn test_run_path_like_title_fails_item_before_any_request() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();
        let workspace_parent = temp.path().join("tmp");
        let target = temp.path().join("out");
        let items = vec![MediaItem::new("BV1xx411c7mD", "1", "AC/DC live")];

        let result = orchestrator(&config(&server, &workspace_parent), Arc::default())
            .run(&BatchJob::new(items, &target, DownloadMode::Combined))
            .await;

        match result {
            Err(BatchError::Item { index, source, .. }) => {
                assert_eq!(index, 0);
                assert!(matches!(source, ItemError::Download(DownloadError::Io { .. })));
            }
            other => panic!("Expected Item, got: {other:?}"),
        }
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(&workspace_parent).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_absolute_title_never_leaves_target() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_streams(&server, "1").await;
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out");
        let outside = temp.path().join("elsewhere");
        std::fs::create_dir(&outside).unwrap();
        let title = outside.join("x").to_string_lossy().into_owned();
        let mut config = config(&server, temp.path());
        config.failure_policy = FailurePolicy::ContinueOnError;

        let result = orchestrator(&config, Arc::default())
            .run(&BatchJob::new(
                vec![MediaItem::new("BV1xx411c7mD", "1", title)],
                &target,
                DownloadMode::AudioOnly,
            ))
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.report().unwrap().failures.len(), 1);
        assert_eq!(std::fs::read_dir(&outside).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_colliding_titles_report_merge_shortfall() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_streams(&server, "1").await;
        mount_streams(&server, "2").await;
        let temp = TempDir::new().unwrap();
        let workspace_parent = temp.path().join("tmp");
        let target = temp.path().join("out");
        let items = vec![
            MediaItem::new("BV1xx411c7mD", "1", "Intro"),
            MediaItem::new("BV1xx411c7mD", "2", "Intro"),
        ];

        let result = orchestrator(&config(&server, &workspace_parent), Arc::default())
            .run(&BatchJob::new(items, &target, DownloadMode::Combined))
            .await;

        assert!(matches!(
            result,
            Err(BatchError::Merge(MergeError::Shortfall {
                expected: 2,
                merged: 1
            }))
        ));
        assert_eq!(std::fs::read_dir(&workspace_parent).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_abort_stops_dispatch_after_first_failure() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_streams(&server, "1").await;
        Mock::given(method("GET"))
            .and(path("/x/player/playurl"))
            .and(query_param("cid", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": -404, "message": "gone"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/x/player/playurl"))
            .and(query_param("cid", "3"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out");

        let result = orchestrator(&config(&server, temp.path()), Arc::default())
            .run(&BatchJob::new(items(3), &target, DownloadMode::AudioOnly))
            .await;

        match result {
            Err(BatchError::Item { index, title, source }) => {
                assert_eq!(index, 1);
                assert_eq!(title, "Part 2");
                assert!(matches!(source, ItemError::Locate(_)));
            }
            other => panic!("Expected Item, got: {other:?}"),
        }
        assert!(target.join("Part 1.mp3").exists());
        assert!(!target.join("Part 3.mp3").exists());
    }

    #[tokio::test]
    async fn test_run_continue_on_error_reports_partial() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_streams(&server, "1").await;
        mount_streams(&server, "3").await;
        Mock::given(method("GET"))
            .and(path("/x/player/playurl"))
            .and(query_param("cid", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out");
        let mut config = config(&server, temp.path());
        config.failure_policy = FailurePolicy::ContinueOnError;

        let result = orchestrator(&config, Arc::default())
            .run(&BatchJob::new(items(3), &target, DownloadMode::Combined))
            .await;

        let error = result.unwrap_err();
        let report = error.report().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(
            report.merged,
            vec![target.join("Part 1.mp4"), target.join("Part 3.mp4")]
        );
        assert!(!target.join("Part 2.mp4").exists());
    }

    #[tokio::test]
    async fn test_run_emits_events() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_streams(&server, "1").await;
        let temp = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        orchestrator(&config(&server, temp.path()), Arc::default())
            .with_events(tx)
            .run(&BatchJob::new(
                items(1),
                temp.path().join("out"),
                DownloadMode::Combined,
            ))
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events[0], BatchEvent::ItemStarted { index: 0, .. }));
        let streams = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::StreamCompleted { .. }))
            .count();
        assert_eq!(streams, 2);
        assert!(matches!(events.last(), Some(BatchEvent::Merged { .. })));
    }

    #[tokio::test]
    async fn test_run_parallel_keeps_job_order_in_report() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        for cid in ["1", "2", "3", "4"] {
            mount_streams(&server, cid).await;
        }
        let temp = TempDir::new().unwrap();
        let mut config = config(&server, temp.path());
        config.concurrency = 4;

        let report = orchestrator(&config, Arc::default())
            .run(&BatchJob::new(
                items(4),
                temp.path().join("out"),
                DownloadMode::AudioOnly,
            ))
            .await
            .unwrap();

        let cids: Vec<&str> = report
            .outcomes
            .iter()
            .map(|o| o.item.stream_id.as_str())
            .collect();
        assert_eq!(cids, ["1", "2", "3", "4"]);
    }
}
