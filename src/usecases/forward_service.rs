//! Entry point for starting and cancelling forward jobs.
//!
//! Validates options, admits the owner in the registry and spawns the job on its own
//! tokio task. The registry slot is held by a lease moved into that task.

use crate::domain::{DomainError, JobOptions, JobReport};
use crate::ports::ProgressSink;
use crate::usecases::forward_job::{ForwardJob, JobDeps, JobRequest};
use crate::usecases::job_registry::JobRegistry;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct ForwardService {
    deps: JobDeps,
    registry: JobRegistry,
    /// Owners allowed to start jobs. Empty means everyone.
    admins: HashSet<i64>,
}

/// A spawned job.
pub struct JobHandle {
    task: JoinHandle<JobReport>,
}

impl JobHandle {
    /// Wait for the final report.
    pub async fn join(self) -> Result<JobReport, DomainError> {
        self.task
            .await
            .map_err(|e| DomainError::JobAborted(e.to_string()))
    }
}

impl ForwardService {
    pub fn new(deps: JobDeps, registry: JobRegistry, admins: impl IntoIterator<Item = i64>) -> Self {
        Self {
            deps,
            registry,
            admins: admins.into_iter().collect(),
        }
    }

    /// Admit and spawn a job. Rejects synchronously with `AlreadyRunning` when the owner
    /// already has one, `InvalidOptions` for contradictory options, `Auth` for non-admins.
    pub fn start_job(
        &self,
        owner: i64,
        source_chat: i64,
        target_chat: i64,
        total_count: i32,
        options: JobOptions,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, DomainError> {
        if !self.admins.is_empty() && !self.admins.contains(&owner) {
            warn!(owner, "start rejected: not an admin");
            return Err(DomainError::Auth(format!("user {owner} may not run jobs")));
        }
        validate(total_count, &options)?;

        let lease = self.registry.admit(owner)?;
        let request = JobRequest {
            owner,
            source_chat,
            target_chat,
            total_count,
            options,
        };
        let job = ForwardJob::new(request, &self.deps, Arc::clone(&progress), lease.cancel_token());

        let task = tokio::spawn(async move {
            let report = job.run().await;
            drop(lease);
            progress.on_finish(&report).await;
            report
        });
        info!(owner, source_chat, target_chat, total_count, "forward job admitted");

        Ok(JobHandle {
            task,
        })
    }

    /// Request cancellation of the owner's job. Returns whether one was running.
    pub fn cancel_job(&self, owner: i64) -> bool {
        self.registry.request_cancel(owner)
    }

    pub fn is_running(&self, owner: i64) -> bool {
        self.registry.is_running(owner)
    }

    pub fn active_jobs(&self) -> usize {
        self.registry.active_count()
    }
}

fn validate(total_count: i32, options: &JobOptions) -> Result<(), DomainError> {
    if total_count <= 0 {
        return Err(DomainError::InvalidOptions(format!(
            "total count must be positive, got {total_count}"
        )));
    }
    if options.skip_offset < 0 {
        return Err(DomainError::InvalidOptions(format!(
            "skip offset must not be negative, got {}",
            options.skip_offset
        )));
    }
    if options.movie_only && options.series_only {
        return Err(DomainError::InvalidOptions(
            "movie-only and series-only are mutually exclusive".into(),
        ));
    }
    if options.forward_cap == Some(0) {
        return Err(DomainError::InvalidOptions("forward cap must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::classify::TitleParser;
    use crate::domain::{JobState, MediaKind};
    use crate::usecases::fakes::{FakeGateway, FakeMetadata, RecordingSink, media};
    use std::time::Duration;

    fn service(tg: FakeGateway, admins: Vec<i64>) -> ForwardService {
        let deps = JobDeps {
            tg: Arc::new(tg),
            classifier: Arc::new(TitleParser::new()),
            metadata: Arc::new(FakeMetadata::default()),
        };
        ForwardService::new(deps, JobRegistry::new(), admins)
    }

    fn videos(n: i32) -> FakeGateway {
        FakeGateway::new().with_messages((1..=n).map(|id| media(id, MediaKind::Video, None, Some("a.mkv"))))
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected_while_running() {
        let svc = service(videos(10), vec![]);
        let slow = JobOptions {
            delay_secs: 5,
            ..JobOptions::default()
        };
        let sink = Arc::new(RecordingSink::default());

        let handle = svc
            .start_job(1, -100, -300, 10, slow.clone(), sink.clone())
            .unwrap();
        let second = svc.start_job(1, -100, -300, 10, slow, sink.clone());
        assert_eq!(second.err(), Some(DomainError::AlreadyRunning { owner: 1 }));
        assert!(svc.is_running(1));

        let report = handle.join().await.unwrap();
        assert_eq!(report.state, JobState::Completed);
        assert!(!svc.is_running(1));
        assert_eq!(sink.reports.lock().unwrap().len(), 1);

        let again = svc.start_job(1, -100, -300, 10, JobOptions::default(), sink);
        assert!(again.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn owners_run_independently() {
        let svc = service(videos(4), vec![]);
        let sink = Arc::new(RecordingSink::default());
        let a = svc
            .start_job(1, -100, -300, 4, JobOptions::default(), sink.clone())
            .unwrap();
        let b = svc
            .start_job(2, -100, -301, 4, JobOptions::default(), sink.clone())
            .unwrap();
        assert_eq!(svc.active_jobs(), 2);

        assert_eq!(a.join().await.unwrap().counters.forwarded, 4);
        assert_eq!(b.join().await.unwrap().counters.forwarded, 4);
        assert_eq!(svc.active_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_job_stops_running_job() {
        let svc = service(videos(100), vec![]);
        let slow = JobOptions {
            delay_secs: 60,
            ..JobOptions::default()
        };
        let sink = Arc::new(RecordingSink::default());
        let handle = svc.start_job(1, -100, -300, 100, slow, sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert!(svc.cancel_job(1));
        assert!(svc.cancel_job(1));

        let report = handle.join().await.unwrap();
        assert_eq!(report.state, JobState::Cancelled);
        assert!(report.counters.forwarded < 100);
        assert!(report.counters.is_balanced());
        assert!(!svc.cancel_job(1));
        assert_eq!(sink.reports.lock().unwrap()[0].state, JobState::Cancelled);
    }

    #[tokio::test]
    async fn contradictory_options_are_rejected_before_admission() {
        let svc = service(videos(1), vec![]);
        let sink = Arc::new(RecordingSink::default());
        let both = JobOptions {
            movie_only: true,
            series_only: true,
            ..JobOptions::default()
        };
        let zero_cap = JobOptions {
            forward_cap: Some(0),
            ..JobOptions::default()
        };

        for (total, options) in [(1, both), (1, zero_cap), (0, JobOptions::default())] {
            let err = svc.start_job(1, -100, -300, total, options, sink.clone()).err();
            assert!(matches!(err, Some(DomainError::InvalidOptions(_))));
        }
        assert!(!svc.is_running(1));
    }

    #[tokio::test]
    async fn non_admin_is_rejected() {
        let svc = service(videos(1), vec![7]);
        let sink = Arc::new(RecordingSink::default());
        let err = svc
            .start_job(1, -100, -300, 1, JobOptions::default(), sink.clone())
            .err();
        assert!(matches!(err, Some(DomainError::Auth(_))));

        let ok = svc.start_job(7, -100, -300, 1, JobOptions::default(), sink);
        assert!(ok.unwrap().join().await.is_ok());
    }
}
