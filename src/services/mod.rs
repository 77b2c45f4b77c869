//! Service layer shared by the pipeline stages

pub mod format;

pub use format::OutputFormatHandler;
