//! Storage-engine contracts: the abstract interfaces a concrete backend
//! (such as `memory-storage-redb`) must implement. `memory-core` depends only
//! on these traits, never on a concrete database.

mod kv_index;
mod vault;
mod vector_index;
mod wal;

pub use kv_index::{FtsCandidate, GetOptions, KeyValueIndex, LookupOptions};
pub use vault::CredentialVault;
pub use vector_index::{VectorCandidate, VectorIndex, VectorRow};
pub use wal::WriteAheadLog;
