//! Table names and schema metadata.

use redb::TableDefinition;

/// Current facts and their full history, keyed by fact id string.
pub(crate) const FACTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("facts");

/// Typed edges between facts, keyed by `"{source}:{target}:{link_type}"`.
pub(crate) const LINKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("links");

/// Learned procedures, keyed by procedure id string.
pub(crate) const PROCEDURES_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("procedures");

/// Schema/engine metadata, keyed by a fixed set of string keys.
pub(crate) const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Embedding vectors, keyed by fact id string.
pub(crate) const VECTORS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vectors");

/// Encrypted credentials, keyed by `"{service}:{credential_type}"`.
pub(crate) const VAULT_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vault");

/// Metadata key storing the schema version as a little-endian `u32`.
pub(crate) const METADATA_SCHEMA_VERSION: &str = "schema_version";

/// The schema version this crate's `migrate` understands.
pub(crate) const SCHEMA_VERSION: u32 = 1;
