//! Media ingestion pipeline: watch, probe, transcode, enrich, catalog.

pub mod error;
pub mod filename;
pub mod indexer;
pub mod probe;
pub mod resolver;
pub mod store;
pub mod thumbnails;
pub mod tmdb;
pub mod transcode;
pub mod vault;

pub use error::{MediaError, Result};
pub use indexer::{
    FileProcessor, IndexProgress, IndexStage, Indexer, IndexerOptions, IndexerSnapshot,
};
pub use probe::{ProbeReport, Prober};
pub use store::{Catalog, MemoryCatalog};
pub use vault::MediaVault;
