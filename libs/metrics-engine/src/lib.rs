pub mod admission;
pub mod config;
pub mod error;
pub mod latch;
pub mod service;
pub mod writer;

pub use admission::AdmissionController;
pub use config::{ConfigParser, IngestConfig, MetricsConfig, StorageConfig, TomlParser};
pub use error::EngineError;
pub use latch::CountDownLatch;
pub use service::IngestService;
pub use writer::BatchWriter;
