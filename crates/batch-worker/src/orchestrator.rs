//! Batch orchestration.
//!
//! Drives a full batch: per resolution (with an inter-resolution cooldown),
//! per episode (strictly sequential, cancellation polled at episode
//! boundaries), aggregating uploaded reference ids into one durable pending
//! post per resolution.

use crate::acquire::Acquirer;
use crate::episode::EpisodeUnit;
use crate::media::MediaToolkit;
use crate::notify::Notifier;
use crate::resolve::FileResolver;
use crate::upload::Uploader;
use anyhow::Result;
use async_trait::async_trait;
use shared::{BatchRequest, PostJob, PostQueue, SeriesInfo, TaskRegistry, WorkPaths};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Series metadata lookup seam.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn lookup(&self, query: &str) -> SeriesInfo;
}

#[async_trait]
impl MetadataProvider for jikan_meta::JikanClient {
    async fn lookup(&self, query: &str) -> SeriesInfo {
        self.search(query).await
    }
}

/// Runs batches end to end. One sequential flow per requester; distinct
/// requesters may run concurrently, sharing only the registry and the queue.
pub struct BatchOrchestrator {
    registry: TaskRegistry,
    queue: Arc<Mutex<PostQueue>>,
    metadata: Arc<dyn MetadataProvider>,
    acquirer: Arc<dyn Acquirer>,
    media: Arc<dyn MediaToolkit>,
    uploader: Arc<dyn Uploader>,
    notifier: Arc<dyn Notifier>,
    paths: WorkPaths,
    cooldown: Duration,
}

impl BatchOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: TaskRegistry,
        queue: Arc<Mutex<PostQueue>>,
        metadata: Arc<dyn MetadataProvider>,
        acquirer: Arc<dyn Acquirer>,
        media: Arc<dyn MediaToolkit>,
        uploader: Arc<dyn Uploader>,
        notifier: Arc<dyn Notifier>,
        paths: WorkPaths,
        cooldown: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            metadata,
            acquirer,
            media,
            uploader,
            notifier,
            paths,
            cooldown,
        }
    }

    /// Process one batch request for one requester.
    ///
    /// The only rejection is the upfront busy check; everything after it is
    /// soft and the batch always runs to its natural end.
    pub async fn run(&self, request: &BatchRequest, requester: i64) -> Result<()> {
        if !self.registry.try_acquire(requester) {
            self.notifier
                .notify("A batch is already running for this requester")
                .await;
            return Ok(());
        }

        info!(
            requester,
            series = %request.series,
            episodes = request.episodes.len(),
            resolutions = ?request.resolutions,
            dual_audio = request.dual_audio,
            "Batch started"
        );
        self.notifier
            .notify(&format!(
                "Batch started: {} ({} episodes, dual audio: {})",
                request.series,
                request.episodes.len(),
                request.dual_audio
            ))
            .await;

        let info = self.metadata.lookup(&request.series).await;
        let resolver = FileResolver::new(self.paths.downloads_dir());

        for (i, resolution) in request.resolutions.iter().enumerate() {
            // Avoid bursting the source site across quality tiers
            if i > 0 {
                self.notifier
                    .notify(&format!(
                        "Cooldown: waiting {}s before {}p",
                        self.cooldown.as_secs(),
                        resolution
                    ))
                    .await;
                tokio::time::sleep(self.cooldown).await;
            }

            self.notifier.notify(&format!("Batch: {}p", resolution)).await;

            let unit = EpisodeUnit {
                series: &request.series,
                title: &info.title,
                resolution,
                dual_requested: request.dual_audio,
                acquirer: self.acquirer.as_ref(),
                resolver: &resolver,
                media: self.media.as_ref(),
                uploader: self.uploader.as_ref(),
                notifier: self.notifier.as_ref(),
            };

            let mut file_ids = Vec::new();
            for &episode in &request.episodes {
                // Polled cancellation: breaks this resolution's loop only
                if self.registry.is_cancelled(requester) {
                    warn!(
                        requester,
                        resolution, "Batch cancelled, skipping remaining episodes"
                    );
                    break;
                }

                let outcome = unit.run(episode).await;
                if let Some(id) = outcome.file_id {
                    file_ids.push(id);
                }
            }

            if file_ids.is_empty() {
                // No record and no completion notice for a fruitless pass
                warn!(resolution, "No uploads for this resolution, skipping record");
                continue;
            }

            let count = file_ids.len();
            let persisted = PostJob::new(&info, resolution, file_ids, request.dual_audio)
                .and_then(|job| self.queue.lock().unwrap().insert(&job));
            match persisted {
                Ok(post_id) => {
                    debug!(post_id, resolution, "Pending post queued");
                    self.notifier
                        .notify(&format!("Batch done: {}p, saved {} files", resolution, count))
                        .await;
                }
                Err(e) => {
                    error!(resolution, error = %e, "Failed to queue pending post");
                    self.notifier
                        .notify(&format!("Failed to record batch for {}p: {:#}", resolution, e))
                        .await;
                }
            }
        }

        self.registry.release(requester);

        let series_dir = self.paths.series_dir(&request.series);
        if let Err(e) = std::fs::remove_dir_all(&series_dir) {
            debug!(dir = %series_dir.display(), error = %e, "Working directory cleanup failed");
        }

        self.notifier.notify("Job complete").await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::AudioTrack;
    use crate::testing::{NullMetadata, RecordingNotifier, StubAcquirer, StubMedia, StubUploader};
    use shared::Database;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        paths: WorkPaths,
        registry: TaskRegistry,
        queue: Arc<Mutex<PostQueue>>,
        notifier: Arc<RecordingNotifier>,
        uploader: Arc<StubUploader>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let paths = WorkPaths::new(dir.path());
            paths.create_dirs().unwrap();
            Self {
                _dir: dir,
                paths,
                registry: TaskRegistry::new(),
                queue: Arc::new(Mutex::new(PostQueue::new(
                    Database::open_in_memory().unwrap(),
                ))),
                notifier: Arc::new(RecordingNotifier::new()),
                uploader: Arc::new(StubUploader::new()),
            }
        }

        fn acquirer(&self) -> StubAcquirer {
            StubAcquirer::new(self.paths.downloads_dir())
        }

        fn orchestrator(&self, acquirer: StubAcquirer, media: StubMedia) -> BatchOrchestrator {
            BatchOrchestrator::new(
                self.registry.clone(),
                Arc::clone(&self.queue),
                Arc::new(NullMetadata),
                Arc::new(acquirer),
                Arc::new(media),
                Arc::clone(&self.uploader) as Arc<dyn Uploader>,
                Arc::clone(&self.notifier) as Arc<dyn Notifier>,
                self.paths.clone(),
                Duration::from_secs(60),
            )
        }

        fn request(episodes: Vec<u32>, resolutions: Vec<&str>, dual: bool) -> BatchRequest {
            BatchRequest {
                series: "Show".to_string(),
                episodes,
                resolutions: resolutions.into_iter().map(String::from).collect(),
                dual_audio: dual,
            }
        }
    }

    #[tokio::test]
    async fn test_dual_batch_with_missing_second_dub() {
        let hx = Harness::new();
        let acquirer = hx
            .acquirer()
            .deposit(1, AudioTrack::Primary, "Show Episode 1.mp4")
            .deposit(1, AudioTrack::Alternate, "Show Episode 1 dub.mp4")
            .deposit(2, AudioTrack::Primary, "Show Episode 2.mp4");
        let media = StubMedia::new(true)
            .duration_of("Show Episode 1_sub.mp4", 600.0)
            .duration_of("Show Episode 1 dub.mp4", 601.0);

        let orchestrator = hx.orchestrator(acquirer, media);
        let request = Harness::request(vec![1, 2], vec!["720"], true);
        orchestrator.run(&request, 7).await.unwrap();

        let captions = hx.uploader.captions.lock().unwrap();
        assert_eq!(captions.len(), 2);
        assert!(captions[0].contains("[Dual Audio]"));
        assert!(!captions[1].contains("[Dual Audio]"));
        drop(captions);

        let pending = hx.queue.lock().unwrap().pending().unwrap();
        assert_eq!(pending.len(), 1);
        let job = &pending[0];
        assert_eq!(job.resolution, "720");
        assert_eq!(job.file_ids.len(), 2);
        assert_eq!(job.range_start, job.file_ids[0]);
        assert_eq!(job.range_end, job.file_ids[1]);
        assert!(job.dual_audio);

        assert!(hx.notifier.any_contains("Batch done: 720p, saved 2 files"));
        // Natural completion releases the single-flight slot
        assert!(hx.registry.try_acquire(7));
    }

    #[tokio::test]
    async fn test_no_uploads_means_no_record() {
        let hx = Harness::new();
        let orchestrator = hx.orchestrator(hx.acquirer(), StubMedia::new(true));
        let request = Harness::request(vec![1], vec!["720"], false);
        orchestrator.run(&request, 7).await.unwrap();

        assert!(hx.queue.lock().unwrap().is_empty().unwrap());
        assert!(!hx.notifier.any_contains("Batch done"));
        assert!(hx.notifier.any_contains("Failed to download Ep 1 (720p)"));
    }

    #[tokio::test]
    async fn test_busy_requester_is_rejected_without_side_effects() {
        let hx = Harness::new();
        assert!(hx.registry.try_acquire(7));

        let acquirer = hx
            .acquirer()
            .deposit(1, AudioTrack::Primary, "Show Episode 1.mp4");
        let orchestrator = hx.orchestrator(acquirer, StubMedia::new(true));
        let request = Harness::request(vec![1], vec!["720"], false);
        orchestrator.run(&request, 7).await.unwrap();

        assert!(hx.notifier.any_contains("already running"));
        assert!(hx.queue.lock().unwrap().is_empty().unwrap());
        assert!(hx.uploader.captions.lock().unwrap().is_empty());
        // The original holder's entry is untouched
        assert!(!hx.registry.is_cancelled(7));
    }

    #[tokio::test]
    async fn test_distinct_requesters_do_not_contend() {
        let hx = Harness::new();
        assert!(hx.registry.try_acquire(1));

        let acquirer = hx
            .acquirer()
            .deposit(1, AudioTrack::Primary, "Show Episode 1.mp4");
        let orchestrator = hx.orchestrator(acquirer, StubMedia::new(true));
        let request = Harness::request(vec![1], vec!["720"], false);
        orchestrator.run(&request, 2).await.unwrap();

        assert_eq!(hx.queue.lock().unwrap().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_episodes() {
        let hx = Harness::new();
        let mut acquirer = hx
            .acquirer()
            .deposit(1, AudioTrack::Primary, "Show Episode 1.mp4")
            .deposit(2, AudioTrack::Primary, "Show Episode 2.mp4")
            .deposit(3, AudioTrack::Primary, "Show Episode 3.mp4");
        // Entry vanishes while episode 1 is in flight; the poll before
        // episode 2 observes it
        acquirer.cancel_on_fetch = Some((hx.registry.clone(), 7, 1));

        let orchestrator = hx.orchestrator(acquirer, StubMedia::new(true));
        let request = Harness::request(vec![1, 2, 3], vec!["720"], false);
        orchestrator.run(&request, 7).await.unwrap();

        // Episode 1 completed before the boundary check; 2 and 3 were skipped
        assert_eq!(hx.uploader.captions.lock().unwrap().len(), 1);

        let pending = hx.queue.lock().unwrap().pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].file_ids.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_between_resolutions() {
        let hx = Harness::new();
        let acquirer = hx
            .acquirer()
            .deposit(1, AudioTrack::Primary, "Show Episode 1.mp4");
        let orchestrator = hx.orchestrator(acquirer, StubMedia::new(true));
        let request = Harness::request(vec![1], vec!["360", "720"], false);

        let started = tokio::time::Instant::now();
        orchestrator.run(&request, 7).await.unwrap();
        let elapsed = started.elapsed();

        // Exactly one cooldown separates the two resolution passes
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(120));
        assert!(hx.notifier.any_contains("Cooldown: waiting 60s before 720p"));
    }
}
