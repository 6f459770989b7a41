pub mod detectors;
pub mod features;
pub mod ingest;
pub mod spectrum;
