//! Data sources other than a measurement file on disk.

pub mod sample;

pub use sample::{SampleConfig, generate_sample, write_sample_csv};
