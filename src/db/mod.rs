pub mod connection;
pub mod queries;
pub mod schema;

pub use connection::{
    check_connections, connect_pg, connect_surreal, DatabaseConnection, DbConfig, SurrealConfig,
};
pub use queries::ChunkRepository;
pub use schema::{initialize_chunk_schema, initialize_queue_schema};
