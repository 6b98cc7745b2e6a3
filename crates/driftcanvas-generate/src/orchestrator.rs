//! Drives generation jobs from request to placed results.

use crate::jobs::{JobEvent, JobId, JobTracker};
use crate::provider::{GenerationOutput, GenerationProvider, Submission};
use crate::request::{GenerationRequest, RequestKind, build_request};
use driftcanvas_core::canvas::Canvas;
use driftcanvas_core::error::{CanvasError, CanvasResult};
use driftcanvas_core::scene::{CanvasImage, ObjectId, decode_image};
use kurbo::Point;
use std::time::{Duration, Instant};

/// Owns a provider and the jobs submitted to it.
pub struct Generator<P> {
    provider: P,
    tracker: JobTracker,
}

impl<P: GenerationProvider> Generator<P> {
    /// Create a generator; completed jobs are dismissed after the configured delay.
    pub fn new(provider: P, dismiss_delay: Duration) -> Self {
        Self {
            provider,
            tracker: JobTracker::new(dismiss_delay),
        }
    }

    /// Create a generator using the canvas configuration.
    pub fn for_canvas(provider: P, canvas: &Canvas) -> Self {
        Self::new(provider, Duration::from_millis(canvas.config.job_dismiss_delay_ms))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut JobTracker {
        &mut self.tracker
    }

    /// Validate and build a request, and start tracking its job.
    ///
    /// Validation failures are reported to the canvas and no job is created.
    pub fn prepare(
        &mut self,
        canvas: &mut Canvas,
        kind: RequestKind,
        now: Instant,
    ) -> CanvasResult<(JobId, GenerationRequest)> {
        let request = match build_request(canvas, kind) {
            Ok(request) => request,
            Err(err) => {
                canvas.report(err.clone());
                return Err(err);
            }
        };
        let job = self.tracker.start(request.source_id, kind, now);
        Ok((job, request))
    }

    /// Submit `request` for `job`, reporting the outcome as job events.
    ///
    /// Queued providers continue to report through
    /// [`JobTracker::sender`].
    pub async fn run(&self, job: JobId, request: &GenerationRequest) {
        log::info!(
            "job {job}: submitting {:?} to {}",
            request.parameters.kind,
            self.provider.name()
        );
        let event = match self.provider.submit(request).await {
            Ok(Submission::Immediate(output)) => JobEvent::Completed(output),
            Ok(Submission::Queued { request_id }) => JobEvent::Submitted { request_id },
            Err(err) => JobEvent::Failed {
                message: err.to_string(),
            },
        };
        if self.tracker.sender().send((job, event)).is_err() {
            log::warn!("job {job}: event channel closed");
        }
    }

    /// Apply pending job events to the canvas and dismiss expired jobs.
    ///
    /// A completion only marks its job completed once the results are on the
    /// canvas; if they cannot be placed the job fails instead. Returns the
    /// ids of images added or replaced.
    pub fn apply_events(&mut self, canvas: &mut Canvas, now: Instant) -> Vec<ObjectId> {
        let mut placed = Vec::new();
        for (id, event) in self.tracker.drain() {
            match &event {
                JobEvent::Completed(output) => {
                    let Some((source_id, kind)) = self.tracker.get(id).map(|job| (job.source_id, job.kind)) else {
                        continue;
                    };
                    match place_results(canvas, source_id, kind, output) {
                        Ok(ids) => {
                            placed.extend(ids);
                            self.tracker.apply(id, &event, now);
                        }
                        Err(err) => {
                            self.tracker.fail(id, err.to_string(), now);
                            canvas.report(err);
                        }
                    }
                }
                JobEvent::Failed { message } => {
                    self.tracker.apply(id, &event, now);
                    canvas.report(CanvasError::Provider(message.clone()));
                }
                _ => {
                    self.tracker.apply(id, &event, now);
                }
            }
        }
        self.tracker.prune(now);
        placed
    }

    /// Prepare, submit and apply in one step. Queued jobs are left tracking.
    pub async fn generate(&mut self, canvas: &mut Canvas, kind: RequestKind, now: Instant) -> CanvasResult<JobId> {
        let (job, request) = self.prepare(canvas, kind, now)?;
        self.run(job, &request).await;
        self.apply_events(canvas, now);
        Ok(job)
    }
}

/// Put generated images on the canvas for the job's source image.
///
/// Edit results go to the right of the source, stacked top to bottom and
/// shown at the source's pixel density. A background-removal result replaces
/// the source in place. Every result is decoded before anything is
/// committed: an empty or undecodable result set is an error and leaves the
/// scene untouched. Results for a source that no longer exists are dropped.
pub fn place_results(
    canvas: &mut Canvas,
    source_id: ObjectId,
    kind: RequestKind,
    output: &GenerationOutput,
) -> CanvasResult<Vec<ObjectId>> {
    let Some(source) = canvas.document.committed().image(source_id).cloned() else {
        log::warn!(
            "discarding {} result(s): source image {source_id} no longer exists",
            output.images.len()
        );
        return Ok(Vec::new());
    };
    if output.images.is_empty() {
        return Err(CanvasError::Provider("no images returned".to_string()));
    }

    let decoded = output
        .images
        .iter()
        .enumerate()
        .map(|(index, bytes)| decode_image(bytes, &format!("generated-{}.png", index + 1), None))
        .collect::<CanvasResult<Vec<_>>>()?;

    match kind {
        RequestKind::RemoveBackground => {
            let Some(first) = decoded.into_iter().next() else {
                return Ok(Vec::new());
            };
            let replaced = source.with_content(first);
            let next = canvas.document.committed().replace_image(replaced);
            canvas.commit_scene(next);
            Ok(vec![source_id])
        }
        RequestKind::Edit => {
            let gap = canvas.config.result_gap;
            let density = source.width / f64::from(source.natural_width.max(1));
            let x = source.bounds().x1 + gap;
            let mut y = source.position.y;
            let mut placed = Vec::with_capacity(decoded.len());
            for image in decoded {
                let image = CanvasImage::new(Point::new(x, y), image).scaled(density);
                y += image.height + gap;
                placed.push(image);
            }
            let ids: Vec<ObjectId> = placed.iter().map(CanvasImage::id).collect();
            let next = canvas.document.committed().with_images(placed);
            canvas.commit_scene(next);
            log::info!("placed {} result(s) next to {source_id}", ids.len());
            Ok(ids)
        }
    }
}
