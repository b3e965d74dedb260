pub mod error;
pub mod ingest;
pub mod projection;

pub use error::TelemetryError;
pub use ingest::{IngestService, ValidReading};
pub use projection::{render_in_timezone, TimeView};
