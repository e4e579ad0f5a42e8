//! Pilot configuration with documented defaults
//!
//! Every tunable lives here. The file form is TOML; any field left out keeps
//! its default, so an empty file is a valid config.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::executor::InputTiming;
use crate::command::resolver::ActionLimits;
use crate::core::error::{PilotError, Result};
use crate::memory::layout::MemoryLayout;
use crate::world::tileset::TilesetMapping;

/// Configuration for one pilot session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    // === WORLD MODEL ===
    /// Half-width of the square window built around the player (tiles)
    ///
    /// 5 gives an 11x11 window, about what fits on the console screen.
    pub vision_radius: i32,

    /// Block-id passability per tileset
    ///
    /// Empty by default: no tile beyond the four adjacent ones is classified
    /// until a mapping has been established for the active tileset.
    pub tilesets: Vec<TilesetMapping>,

    /// Fallback warp registry file, if any
    pub warps_path: Option<PathBuf>,

    // === INPUT TIMING ===
    /// Frames each button is held down
    ///
    /// Must cover one full walk step; shorter holds only turn the player.
    pub hold_frames: u32,

    /// Frames advanced after each release before the next input
    pub settle_frames: u32,

    // === ACTION LIMITS ===
    /// Longest button sequence accepted in one turn
    pub max_keys: usize,

    /// Largest wait accepted in one turn (frames)
    pub max_wait_frames: u32,

    /// Wait length when the call gives none (frames)
    pub default_wait_frames: u32,

    // === TURN LOOP ===
    /// Seconds to wait for the decision maker before the turn yields NO_ACTION
    pub decision_timeout_secs: u64,

    /// Turn summaries kept in the history
    pub history_capacity: usize,

    /// Most recent summaries included in each prompt
    pub history_shown: usize,

    /// Socket timeout for the emulator bridge (seconds)
    pub bridge_timeout_secs: u64,

    pub llm: LlmSettings,

    /// RAM addresses and candidate lists
    pub memory: MemoryLayout,
}

/// LLM endpoint settings; `LLM_API_URL` and `LLM_MODEL` override these
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-haiku-20240307".into(),
            max_tokens: 1024,
        }
    }
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            vision_radius: 5,
            tilesets: Vec::new(),
            warps_path: None,

            hold_frames: 8,
            settle_frames: 10,

            max_keys: 32,
            max_wait_frames: 600,
            default_wait_frames: 60,

            decision_timeout_secs: 120,
            history_capacity: 50,
            history_shown: 15,
            bridge_timeout_secs: 10,

            llm: LlmSettings::default(),
            memory: MemoryLayout::default(),
        }
    }
}

impl PilotConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file, then validate
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PilotError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(path = %path.display(), "Loaded pilot config");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PilotConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.vision_radius < 1 {
            return Err(PilotError::Config(format!(
                "vision_radius ({}) must be at least 1",
                self.vision_radius
            )));
        }

        if self.hold_frames == 0 {
            return Err(PilotError::Config("hold_frames must be positive".into()));
        }

        if self.default_wait_frames == 0 || self.default_wait_frames > self.max_wait_frames {
            return Err(PilotError::Config(format!(
                "default_wait_frames ({}) must be in 1..={}",
                self.default_wait_frames, self.max_wait_frames
            )));
        }

        if self.max_keys == 0 {
            return Err(PilotError::Config("max_keys must be positive".into()));
        }

        if self.history_shown > self.history_capacity {
            return Err(PilotError::Config(format!(
                "history_shown ({}) should be <= history_capacity ({})",
                self.history_shown, self.history_capacity
            )));
        }

        if self.memory.player_x.is_empty() || self.memory.player_y.is_empty() {
            return Err(PilotError::Config(
                "memory.player_x and memory.player_y need at least one candidate".into(),
            ));
        }

        Ok(())
    }

    pub fn timing(&self) -> InputTiming {
        InputTiming {
            hold_frames: self.hold_frames,
            settle_frames: self.settle_frames,
        }
    }

    pub fn limits(&self) -> ActionLimits {
        ActionLimits {
            max_keys: self.max_keys,
            max_wait_frames: self.max_wait_frames,
            default_wait_frames: self.default_wait_frames,
        }
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.decision_timeout_secs)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }
}
