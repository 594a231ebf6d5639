//! Durable watermark storage on the local filesystem.

mod json_file;

pub use json_file::JsonFileWatermarkStore;
