pub mod cleaning;
pub mod clustering;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod utils;
pub mod warehouse;
