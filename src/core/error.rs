use thiserror::Error;

/// Faults of the outer surfaces (emulator link, LLM transport, config files).
///
/// Domain outcomes such as an unresolved field, an unreachable goal or a
/// response without an action are data, not errors; see `memory::resolver`,
/// `navigation::pathfinding` and `command::resolver`.
#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Emulator error: {0}")]
    Emulator(String),

    #[error("Bridge protocol error: {0}")]
    Bridge(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Warp registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PilotError>;
