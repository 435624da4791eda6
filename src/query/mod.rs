//! Ranked retrieval of responses by code fragment

mod retrieval;
mod select;

pub use retrieval::{PromptDetail, RankedResponse, RankedRetrieval};
pub use select::{select_best, select_random, top_tier, Ranked};
