// src/decoder/mod.rs

pub mod cursor;
pub mod dsp;
pub mod resample;
pub mod streaming;

pub use cursor::StreamCursor;
pub use resample::ResampleQuality;
pub use streaming::StreamingSource;
