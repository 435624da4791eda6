//! Reference graph: links between prompts, responses and semantic meanings

mod links;
mod pending;

pub use links::{MeaningLinkState, ReconcileReport, ReferenceGraph};
pub use pending::{LinkStage, PendingLink, PendingLinks};
