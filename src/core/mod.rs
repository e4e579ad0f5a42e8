pub mod config;
pub mod error;
pub mod types;

pub use config::{LlmSettings, PilotConfig};
pub use error::{PilotError, Result};
