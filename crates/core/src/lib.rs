pub mod config;
pub mod error;
pub mod evaluation;
pub mod params;
pub mod retry;

pub use config::Config;
pub use error::*;
pub use evaluation::*;
pub use params::*;
pub use retry::{RetryPolicy, RetryableError};
