//! Annotation worker: attaches semantic meanings to new Prompts
//!
//! Generation enqueues one job per Prompt. A fixed pool of workers drains
//! the bounded queue. Lookup and inference run under the job timeout and
//! the pool's cancellation token; once a meaning is stored it is tracked
//! and linked to completion. Outcomes are broadcast; failures are kept
//! for retry.

mod job;
mod queue;
mod worker;

pub use job::{AnnotationJob, AnnotationOutcome, AnnotationStatus, PendingAnnotation};
pub use queue::{AnnotationPermit, AnnotationQueue};
pub use worker::Annotator;
