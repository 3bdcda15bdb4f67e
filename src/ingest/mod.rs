// src/ingest/mod.rs - Dataset loader: source URL, CSV decoding, timestamp parsing

pub mod csv_loader;
pub mod source_url;
pub mod timestamp;

pub use csv_loader::{load_csv, load_csv_from_reader, write_csv};
pub use source_url::generate_url;
pub use timestamp::parse_timestamp;
