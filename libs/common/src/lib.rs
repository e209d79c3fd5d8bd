//! Common library for the portfolio services
//!
//! This crate provides the infrastructure shared by the services: the
//! PostgreSQL connection pool, the document store built on top of it, the
//! object storage adapter used for uploaded assets, and their error types.

pub mod database;
pub mod document;
pub mod error;
pub mod storage;

/// Example usage of the database and document modules
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool};
/// use common::document::{DocumentStore, PgDocumentStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     let store = PgDocumentStore::new(pool);
///     store.migrate().await?;
///     println!("Document store health check: {}", store.health_check().await?);
///     store.close().await;
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
