pub mod config;
pub mod error;
pub mod matching;
pub mod telemetry;

pub use error::AppError;
