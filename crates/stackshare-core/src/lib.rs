pub mod codec;
pub mod config;
pub mod error;
pub mod generator;
pub mod repository;
pub mod stack;
pub mod storage;
pub mod sync;

// Re-export common error type
pub use error::StackError;
