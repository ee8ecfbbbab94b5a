//! Storage adapter traits for the MCP enterprise server (spec §4.B).
//!
//! Each adapter is a narrow async trait with an in-process reference
//! implementation so the rest of the stack can run fully offline in
//! tests and local development. Real backends (Postgres/SQLite via
//! `sqlx`, Redis via `fred`) are added behind the `postgres`/`redis`
//! features without changing the trait surface.

mod code;
mod embedding;
mod error;
mod kv;
pub mod model;
mod relational;
mod vector;

pub use code::{
    CodeAnalyzer, CodeEntity, CodeGraphStore, CodeRelation, EntityKind, InMemoryCodeGraphStore, NoopCodeAnalyzer,
    RelationKind, SharedCodeAnalyzer, SharedCodeGraphStore,
};
pub use embedding::{EmbeddingModel, NoopEmbeddingModel, SharedEmbeddingModel};
pub use error::{Result, StorageError};
pub use kv::{InMemoryKvStore, KvStore, SharedKvStore};
pub use relational::{InMemoryRelationalStore, RelationalStore, SharedRelationalStore};
pub use vector::{InMemoryVectorIndex, VectorIndex, VectorMatch, VectorRecord, SharedVectorIndex};
