pub mod batch;
pub mod config;
pub mod loader;
pub mod pipeline;
pub mod result_log;
