//! Generation job tracking.
//!
//! Job state is never mutated in place from callbacks. Status updates arrive
//! as [`JobEvent`]s on a channel and are folded into the job by [`reduce`].

use crate::provider::GenerationOutput;
use crate::request::RequestKind;
use driftcanvas_core::scene::ObjectId;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Identity of a tracked job.
pub type JobId = Uuid;

/// Lifecycle of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Created, not yet accepted by the provider.
    Pending,
    /// Waiting in the provider's queue.
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further events change the job.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Status update for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The provider accepted the request into its queue.
    Submitted { request_id: String },
    /// Queue position update.
    Queued { position: Option<u32> },
    /// The provider started working; `logs` are appended to the job.
    InProgress { logs: Vec<String> },
    Completed(GenerationOutput),
    Failed { message: String },
}

/// A tracked generation job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    /// Image the results belong to.
    pub source_id: ObjectId,
    pub kind: RequestKind,
    pub status: JobStatus,
    pub request_id: Option<String>,
    pub queue_position: Option<u32>,
    pub logs: Vec<String>,
    /// Failure reason; kept until the job is dismissed.
    pub error: Option<String>,
    pub created_at: Instant,
    pub finished_at: Option<Instant>,
}

impl Job {
    pub fn new(source_id: ObjectId, kind: RequestKind, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            kind,
            status: JobStatus::Pending,
            request_id: None,
            queue_position: None,
            logs: Vec::new(),
            error: None,
            created_at: now,
            finished_at: None,
        }
    }
}

/// Fold `event` into `job`. Terminal jobs are returned unchanged.
pub fn reduce(job: &Job, event: &JobEvent, now: Instant) -> Job {
    let mut next = job.clone();
    if job.status.is_terminal() {
        log::debug!("job {}: ignoring event after {:?}", job.id, job.status);
        return next;
    }
    match event {
        JobEvent::Submitted { request_id } => {
            next.status = JobStatus::Queued;
            next.request_id = Some(request_id.clone());
        }
        JobEvent::Queued { position } => {
            next.status = JobStatus::Queued;
            next.queue_position = *position;
        }
        JobEvent::InProgress { logs } => {
            next.status = JobStatus::InProgress;
            next.queue_position = None;
            next.logs.extend(logs.iter().cloned());
        }
        JobEvent::Completed(_) => {
            next.status = JobStatus::Completed;
            next.queue_position = None;
            next.finished_at = Some(now);
        }
        JobEvent::Failed { message } => {
            next.status = JobStatus::Failed;
            next.queue_position = None;
            next.error = Some(message.clone());
            next.finished_at = Some(now);
        }
    }
    next
}

/// Tracks in-flight and finished jobs.
pub struct JobTracker {
    jobs: Vec<Job>,
    sender: Sender<(JobId, JobEvent)>,
    receiver: Receiver<(JobId, JobEvent)>,
    dismiss_delay: Duration,
}

impl JobTracker {
    /// Create a tracker that dismisses completed jobs after `dismiss_delay`.
    pub fn new(dismiss_delay: Duration) -> Self {
        let (sender, receiver) = channel();
        Self {
            jobs: Vec::new(),
            sender,
            receiver,
            dismiss_delay,
        }
    }

    /// Channel for job events. Clone freely; events are applied on [`poll`](Self::poll).
    pub fn sender(&self) -> Sender<(JobId, JobEvent)> {
        self.sender.clone()
    }

    /// Start tracking a new job.
    pub fn start(&mut self, source_id: ObjectId, kind: RequestKind, now: Instant) -> JobId {
        let job = Job::new(source_id, kind, now);
        let id = job.id;
        log::debug!("job {id}: started for image {source_id}");
        self.jobs.push(job);
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Number of jobs not yet completed or failed.
    pub fn active(&self) -> usize {
        self.jobs.iter().filter(|job| !job.status.is_terminal()).count()
    }

    /// Take every pending event (non-blocking) without applying it.
    ///
    /// Events for unknown or finished jobs are dropped.
    pub fn drain(&mut self) -> Vec<(JobId, JobEvent)> {
        let mut pending = Vec::new();
        while let Ok((id, event)) = self.receiver.try_recv() {
            match self.get(id) {
                None => log::warn!("dropping event for unknown job {id}"),
                Some(job) if job.status.is_terminal() => {
                    log::debug!("job {id}: dropping event after {:?}", job.status)
                }
                Some(_) => pending.push((id, event)),
            }
        }
        pending
    }

    /// Fold `event` into job `id`. Returns whether the job changed.
    pub fn apply(&mut self, id: JobId, event: &JobEvent, now: Instant) -> bool {
        let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }
        *job = reduce(job, event, now);
        match job.status {
            JobStatus::Completed => log::info!("job {id}: completed"),
            JobStatus::Failed => log::warn!("job {id}: failed: {}", job.error.as_deref().unwrap_or("")),
            _ => {}
        }
        true
    }

    /// Mark job `id` failed with `message`.
    pub fn fail(&mut self, id: JobId, message: impl Into<String>, now: Instant) -> bool {
        self.apply(
            id,
            &JobEvent::Failed {
                message: message.into(),
            },
            now,
        )
    }

    /// Apply every pending event (non-blocking).
    ///
    /// Returns the events that changed a tracked job, in arrival order.
    pub fn poll(&mut self, now: Instant) -> Vec<(JobId, JobEvent)> {
        let mut applied = Vec::new();
        for (id, event) in self.drain() {
            if self.apply(id, &event, now) {
                applied.push((id, event));
            }
        }
        applied
    }

    /// Remove completed jobs whose dismiss delay has passed. Failed jobs stay
    /// until dismissed.
    pub fn prune(&mut self, now: Instant) -> usize {
        let delay = self.dismiss_delay;
        let before = self.jobs.len();
        self.jobs.retain(|job| match (job.status, job.finished_at) {
            (JobStatus::Completed, Some(at)) => now.saturating_duration_since(at) < delay,
            _ => true,
        });
        before - self.jobs.len()
    }

    /// Remove a job regardless of its state.
    pub fn dismiss(&mut self, id: JobId) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|job| job.id != id);
        before != self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(Uuid::new_v4(), RequestKind::Edit, Instant::now())
    }

    #[test]
    fn test_reduce_queue_lifecycle() {
        let now = Instant::now();
        let mut state = job();
        let events = [
            JobEvent::Submitted {
                request_id: "req-1".to_string(),
            },
            JobEvent::Queued { position: Some(3) },
            JobEvent::InProgress {
                logs: vec!["loading model".to_string()],
            },
            JobEvent::InProgress {
                logs: vec!["step 1/4".to_string()],
            },
        ];
        for event in &events {
            state = reduce(&state, event, now);
        }
        assert_eq!(state.status, JobStatus::InProgress);
        assert_eq!(state.request_id.as_deref(), Some("req-1"));
        assert_eq!(state.queue_position, None);
        assert_eq!(state.logs, vec!["loading model", "step 1/4"]);

        let done = reduce(&state, &JobEvent::Completed(GenerationOutput::default()), now);
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.finished_at, Some(now));
    }

    #[test]
    fn test_terminal_jobs_ignore_events() {
        let now = Instant::now();
        let failed = reduce(
            &job(),
            &JobEvent::Failed {
                message: "timeout".to_string(),
            },
            now,
        );
        let after = reduce(&failed, &JobEvent::Completed(GenerationOutput::default()), now);
        assert_eq!(after, failed);
        assert_eq!(after.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_tracker_applies_channel_events() {
        let now = Instant::now();
        let mut tracker = JobTracker::new(Duration::from_secs(3));
        let a = tracker.start(Uuid::new_v4(), RequestKind::Edit, now);
        let b = tracker.start(Uuid::new_v4(), RequestKind::Edit, now);
        let sender = tracker.sender();

        sender.send((a, JobEvent::Queued { position: Some(1) })).unwrap();
        sender
            .send((
                b,
                JobEvent::Failed {
                    message: "HTTP 500".to_string(),
                },
            ))
            .unwrap();
        sender.send((Uuid::new_v4(), JobEvent::Queued { position: None })).unwrap();

        let applied = tracker.poll(now);
        assert_eq!(applied.len(), 2);
        assert_eq!(tracker.get(a).unwrap().status, JobStatus::Queued);
        assert_eq!(tracker.get(b).unwrap().status, JobStatus::Failed);
        assert_eq!(tracker.active(), 1);
    }

    #[test]
    fn test_completed_jobs_auto_dismiss() {
        let start = Instant::now();
        let mut tracker = JobTracker::new(Duration::from_secs(3));
        let done = tracker.start(Uuid::new_v4(), RequestKind::Edit, start);
        let failed = tracker.start(Uuid::new_v4(), RequestKind::Edit, start);
        let sender = tracker.sender();
        sender.send((done, JobEvent::Completed(GenerationOutput::default()))).unwrap();
        sender
            .send((
                failed,
                JobEvent::Failed {
                    message: "boom".to_string(),
                },
            ))
            .unwrap();
        tracker.poll(start);

        assert_eq!(tracker.prune(start + Duration::from_secs(1)), 0);
        assert_eq!(tracker.prune(start + Duration::from_secs(3)), 1);
        assert!(tracker.get(done).is_none());
        assert!(tracker.get(failed).is_some());

        assert!(tracker.dismiss(failed));
        assert!(!tracker.dismiss(failed));
        assert!(tracker.jobs().is_empty());
    }

    #[test]
    fn test_fail_records_error_and_blocks_completion() {
        let now = Instant::now();
        let mut tracker = JobTracker::new(Duration::from_secs(3));
        let id = tracker.start(Uuid::new_v4(), RequestKind::Edit, now);
        tracker.sender().send((id, JobEvent::Completed(GenerationOutput::default()))).unwrap();

        let pending = tracker.drain();
        assert_eq!(pending.len(), 1);
        assert_eq!(tracker.get(id).unwrap().status, JobStatus::Pending);

        assert!(tracker.fail(id, "bad result", now));
        assert!(!tracker.apply(id, &pending[0].1, now));
        let job = tracker.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("bad result"));
        assert!(!tracker.fail(Uuid::new_v4(), "unknown", now));
    }
}
