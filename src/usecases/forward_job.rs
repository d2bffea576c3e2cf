//! The bulk forward state machine.
//!
//! One job = one sequential task. Each loop iteration first checks the cancel flag and the
//! forward cap, then pulls the next message, screens it, checks for duplicates and sends.
//! Every `PROGRESS_INTERVAL` processed messages a snapshot goes to the progress sink.
//!
//! Invariants held at every snapshot and at the end:
//! - `fetched == forwarded + deleted_skipped + non_media_skipped + duplicate_skipped`
//! - `cursor - skip_offset == fetched`, with `cursor` the last fully processed id

use crate::domain::{
    DomainError, JobCounters, JobOptions, JobReport, JobState, MessageView, ProgressSnapshot,
};
use crate::ports::{ClassifierPort, MetadataPort, ProgressSink, TgGateway};
use crate::usecases::caption::CaptionFormatter;
use crate::usecases::duplicate_index::DuplicateIndex;
use crate::usecases::message_source::MessageSource;
use crate::usecases::policy::{self, Candidate, Delivery, Screening, SkipBucket, SkipReason};
use crate::usecases::rate_limited_sender::{RateLimitedSender, SendOp};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Processed messages between two progress snapshots.
pub const PROGRESS_INTERVAL: u64 = 20;

/// Collaborators shared by every job.
#[derive(Clone)]
pub struct JobDeps {
    pub tg: Arc<dyn TgGateway>,
    pub classifier: Arc<dyn ClassifierPort>,
    pub metadata: Arc<dyn MetadataPort>,
}

/// What to forward, from where, to where.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub owner: i64,
    pub source_chat: i64,
    pub target_chat: i64,
    /// Last message id of the window (the caller-supplied upper bound).
    pub total_count: i32,
    pub options: JobOptions,
}

pub struct ForwardJob {
    request: JobRequest,
    source: MessageSource,
    sender: RateLimitedSender,
    duplicates: DuplicateIndex,
    captions: CaptionFormatter,
    classifier: Arc<dyn ClassifierPort>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
    counters: JobCounters,
    cursor: i32,
    state: JobState,
}

impl ForwardJob {
    pub fn new(
        request: JobRequest,
        deps: &JobDeps,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Self {
        let skip = request.options.skip_offset.max(0);
        Self {
            source: MessageSource::new(
                Arc::clone(&deps.tg),
                request.source_chat,
                request.total_count,
                skip,
            ),
            sender: RateLimitedSender::new(Arc::clone(&deps.tg)),
            duplicates: DuplicateIndex::new(Arc::clone(&deps.tg)),
            captions: CaptionFormatter::new(
                Arc::clone(&deps.classifier),
                Arc::clone(&deps.metadata),
            ),
            classifier: Arc::clone(&deps.classifier),
            progress,
            cancel,
            counters: JobCounters::default(),
            cursor: skip,
            state: JobState::Running,
            request,
        }
    }

    /// Drive the job to a terminal state. Never panics on platform errors: a fatal error
    /// becomes `Failed` with the partial counters preserved.
    pub async fn run(mut self) -> JobReport {
        let started = Instant::now();
        info!(
            owner = self.request.owner,
            source = self.request.source_chat,
            target = self.request.target_chat,
            total = self.request.total_count,
            skip = self.cursor,
            "forward job started"
        );

        let error = match self.drive().await {
            Ok(state) => {
                self.transition(state);
                None
            }
            Err(e) => {
                self.transition(JobState::Failed);
                error!(owner = self.request.owner, cursor = self.cursor, error = %e, "forward job failed");
                Some(e.to_string())
            }
        };

        let report = JobReport {
            owner: self.request.owner,
            state: self.state,
            counters: self.counters,
            total_count: self.request.total_count,
            cursor: self.cursor,
            error,
            elapsed_secs: started.elapsed().as_secs() as i64,
        };
        info!(
            owner = report.owner,
            state = %report.state,
            fetched = report.counters.fetched,
            forwarded = report.counters.forwarded,
            deleted = report.counters.deleted_skipped,
            non_media = report.counters.non_media_skipped,
            duplicates = report.counters.duplicate_skipped,
            "forward job finished"
        );
        report
    }

    async fn drive(&mut self) -> Result<JobState, DomainError> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(JobState::Cancelled);
            }
            if self.cap_reached() {
                return Ok(JobState::LimitReached);
            }

            let Some(view) = self.source.next().await? else {
                return Ok(JobState::Completed);
            };
            // A message that fails to send lands in no bucket, so it is not counted.
            self.process(&view).await?;
            self.cursor = view.id;
            self.counters.fetched += 1;

            if self.counters.fetched % PROGRESS_INTERVAL == 0 {
                self.progress.on_progress(&self.snapshot()).await;
            }
        }
    }

    async fn process(&mut self, view: &MessageView) -> Result<(), DomainError> {
        let candidate = match policy::screen(view, &self.request.options, self.classifier.as_ref()) {
            Screening::Skip(reason) => {
                self.skip(view.id, reason);
                return Ok(());
            }
            Screening::Forward(candidate) => candidate,
        };

        if self.is_duplicate(view).await {
            self.skip(view.id, SkipReason::Duplicate);
            return Ok(());
        }

        self.forward(view, candidate).await?;
        self.counters.forwarded += 1;
        if !self.cap_reached() {
            self.pace().await;
        }
        Ok(())
    }

    fn cap_reached(&self) -> bool {
        self.request
            .options
            .forward_cap
            .is_some_and(|cap| self.counters.forwarded >= cap)
    }

    async fn is_duplicate(&self, view: &MessageView) -> bool {
        let secondary = self.request.options.duplicate_secondary;
        match (secondary, view.media_kind, view.title()) {
            (Some(_), Some(kind), Some(title)) => {
                self.duplicates.exists(secondary, kind, title).await
            }
            _ => false,
        }
    }

    async fn forward(&self, view: &MessageView, candidate: Candidate) -> Result<(), DomainError> {
        let caption = match view.media_kind {
            Some(_) => {
                self.captions
                    .format(view, &self.request.options, candidate.classification.as_ref())
                    .await
            }
            None => None,
        };

        let op = match (candidate.delivery, view.file_reference.as_deref()) {
            (Delivery::CachedMedia, Some(file_reference)) => SendOp::CachedMedia {
                file_reference,
                caption: caption.as_deref(),
            },
            _ => SendOp::Copy {
                source_chat: self.request.source_chat,
                message_id: view.id,
                caption: caption.as_deref(),
            },
        };

        let outcome = self
            .sender
            .send(self.request.target_chat, op)
            .await
            .map_err(|e| DomainError::JobAborted(format!("message {}: {}", view.id, e)))?;
        debug!(
            owner = self.request.owner,
            msg_id = view.id,
            waited_secs = outcome.waited_secs,
            "message forwarded"
        );
        Ok(())
    }

    /// Minimum spacing between successful sends. Cut short by cancellation; the flag
    /// itself is still only acted on at the top of the next iteration.
    async fn pace(&self) {
        if self.request.options.delay_secs == 0 {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(self.request.options.delay_secs)) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    fn skip(&mut self, msg_id: i32, reason: SkipReason) {
        debug!(owner = self.request.owner, msg_id, ?reason, "message skipped");
        match reason.bucket() {
            SkipBucket::Deleted => self.counters.deleted_skipped += 1,
            SkipBucket::NonMedia => self.counters.non_media_skipped += 1,
            SkipBucket::Duplicate => self.counters.duplicate_skipped += 1,
        }
    }

    fn transition(&mut self, next: JobState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = next;
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            counters: self.counters,
            total_count: self.request.total_count,
            cursor: self.cursor,
        }
    }
}
