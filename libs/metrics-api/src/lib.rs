pub mod error;
pub mod point;
pub mod service;
pub mod storage;

pub use error::{ErrorKind, StorageError};
pub use point::{DataKind, DataPoint, RawDataPoint, WriteRequest, RAW_TTL_SECONDS};
pub use service::MetricsService;
pub use storage::MetricsStorage;
