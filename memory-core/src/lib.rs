//! Storage-agnostic domain logic for a hybrid fact/procedure memory store:
//! the data model, the `FactStore`/`GraphStore`/`ProcedureStore` mutation
//! surface, the retrieval pipeline, the lifecycle scheduler, and the
//! boundary adapter a host embeds against. Concrete storage backends (such
//! as `memory-storage-redb`) implement the traits in [`storage`]; this
//! crate never depends on a concrete database.

pub mod adapter;
pub mod category_registry;
pub mod constants;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod fact_store;
pub mod graph;
pub mod lifecycle_scheduler;
pub mod procedure_store;
pub mod providers;
pub mod recovery;
pub mod retrieval;
pub mod storage;
pub mod types;

pub use engine::Engine;
pub use error::{Error, Result};
