//! Configuration models for the executor, rate limiting and per-call options.

pub mod executor;

pub use executor::{load_env_files, ExecutorConfig, RunOptions, ENV_FILES};
