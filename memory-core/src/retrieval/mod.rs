//! The ranking engine: parallel full-text + vector search, optional
//! hypothetical-answer expansion, entity lookup, graph expansion,
//! scope/tier/time filtering, score composition, deduplication, and
//! token-budgeted packing.

mod packing;
mod pipeline;
mod scoring;

pub use packing::{pack_hot, render_full_bullet_list, PackedBlock, ProgressiveIndexCache};
pub use pipeline::{RecallRequest, RecallResult, RetrievalPipeline};
