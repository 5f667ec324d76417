pub mod chunk;
pub mod embedding;
pub mod event;

pub use chunk::{is_dense_set, FilingChunk};
pub use embedding::{EmbeddingModel, EmbeddingVector};
pub use event::{DedupeKey, EventSource, EventStatus, IngestionEvent, NewEvent};
