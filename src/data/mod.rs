//! Data module - CSV loading, key normalization and joining

pub mod code;
pub mod loader;
pub mod processor;
pub mod record;
pub mod schema;

pub use code::SchoolCode;
pub use loader::{DataLoader, LoaderError, RawRow, RawTable};
pub use processor::{DataProcessor, JoinError, JoinReport, JoinedData, SourceReport};
pub use record::SchoolRecord;
pub use schema::{Field, SourceKind};
