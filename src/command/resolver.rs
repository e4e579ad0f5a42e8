//! Action resolution - turns one decision-maker response into one action
//!
//! Accepted shapes, in order:
//! 1. a structured function call (name + argument object)
//! 2. free text with a fenced block labelled `json` or `tool_call` holding
//!    `{"function": <name>, "arguments": {...}}`
//!
//! Prose without such a block never produces an action.

use serde::Deserialize;
use serde_json::Value;

use crate::command::action::Action;
use crate::command::fence::scan_blocks;
use crate::core::types::Position;
use crate::emulator::Button;
use crate::world::local_map::{Bounds, LocalMap};

/// Function names the resolver executes
pub const WHITELIST: [&str; 3] = ["press_keys", "compute_path", "wait"];

/// A function call as delivered by the decision maker
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// One turn's raw response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionResponse {
    pub function_call: Option<FunctionCall>,
    pub text: Option<String>,
}

impl DecisionResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            function_call: None,
            text: Some(text.into()),
        }
    }

    pub fn from_call(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments,
            }),
            text: None,
        }
    }

    /// Compact rendering for diagnostics
    pub fn raw(&self) -> String {
        let mut parts = Vec::new();
        if let Some(call) = &self.function_call {
            parts.push(format!("call {}({})", call.name, call.arguments));
        }
        if let Some(text) = &self.text {
            parts.push(text.clone());
        }
        parts.join(" | ")
    }
}

/// Fenced-block payload
#[derive(Debug, Deserialize)]
struct FencedCall {
    function: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidAction {
    /// Decoded name is not in the whitelist; the raw name is kept
    UnknownFunction(String),
    BadArguments {
        function: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoActionReason {
    ParseFailure(String),
    InvalidAction(InvalidAction),
    Timeout,
    /// Transport or API failure before any response text arrived
    DecisionUnavailable(String),
}

impl std::fmt::Display for NoActionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoActionReason::ParseFailure(msg) => write!(f, "parse failure: {msg}"),
            NoActionReason::InvalidAction(InvalidAction::UnknownFunction(name)) => {
                write!(f, "invalid action: unknown function '{name}'")
            }
            NoActionReason::InvalidAction(InvalidAction::BadArguments { function, message }) => {
                write!(f, "invalid action: {function}: {message}")
            }
            NoActionReason::Timeout => write!(f, "decision timed out"),
            NoActionReason::DecisionUnavailable(msg) => write!(f, "decision unavailable: {msg}"),
        }
    }
}

/// Diagnostic record for a turn without an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoAction {
    pub reason: NoActionReason,
    pub raw: String,
}

/// Where the accepted call came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOrigin {
    Structured,
    /// Index among all fenced blocks in the text
    Fenced { block: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    Execute { action: Action, origin: CallOrigin },
    NoAction(NoAction),
}

impl TurnAction {
    pub fn action(&self) -> Option<&Action> {
        match self {
            TurnAction::Execute { action, .. } => Some(action),
            TurnAction::NoAction(_) => None,
        }
    }
}

/// Argument bounds applied during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionLimits {
    pub max_keys: usize,
    pub max_wait_frames: u32,
    pub default_wait_frames: u32,
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            max_keys: 32,
            max_wait_frames: 600,
            default_wait_frames: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PressKeysArgs {
    keys: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComputePathArgs {
    #[serde(alias = "x")]
    target_x: i64,
    #[serde(alias = "y")]
    target_y: i64,
}

#[derive(Debug, Deserialize)]
struct WaitArgs {
    #[serde(default)]
    frames: Option<i64>,
}

fn parse_args<T: for<'de> Deserialize<'de>>(
    val: Value,
    function: &'static str,
) -> Result<T, InvalidAction> {
    // Some models send `null` for an empty argument list
    let val = if val.is_null() {
        Value::Object(Default::default())
    } else {
        val
    };
    serde_json::from_value::<T>(val).map_err(|e| InvalidAction::BadArguments {
        function,
        message: e.to_string(),
    })
}

fn bad(function: &'static str, message: impl Into<String>) -> InvalidAction {
    InvalidAction::BadArguments {
        function,
        message: message.into(),
    }
}

/// Canonical name for a whitelisted function or alias
fn canonical_name(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "press_keys" | "key_press" => Some("press_keys"),
        "compute_path" | "calculate_path" => Some("compute_path"),
        "wait" => Some("wait"),
        _ => None,
    }
}

pub struct ActionResolver {
    limits: ActionLimits,
}

impl ActionResolver {
    pub fn new(limits: ActionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ActionLimits {
        self.limits
    }

    /// Resolve a response against this turn's map (`None` when the position
    /// is unresolved)
    pub fn resolve(&self, response: &DecisionResponse, map: Option<&LocalMap>) -> TurnAction {
        let no_action = |reason: NoActionReason| {
            TurnAction::NoAction(NoAction {
                reason,
                raw: response.raw(),
            })
        };

        if let Some(call) = response
            .function_call
            .as_ref()
            .filter(|c| !c.name.trim().is_empty())
        {
            return match self.validate(&call.name, call.arguments.clone(), map) {
                Ok(action) => TurnAction::Execute {
                    action,
                    origin: CallOrigin::Structured,
                },
                Err(invalid) => no_action(NoActionReason::InvalidAction(invalid)),
            };
        }

        let Some(text) = response.text.as_deref() else {
            return no_action(NoActionReason::ParseFailure("empty response".into()));
        };

        let mut first_unknown: Option<String> = None;
        let mut saw_recognized = false;
        for (index, block) in scan_blocks(text).iter().enumerate() {
            if !block.is_recognized() {
                continue;
            }
            saw_recognized = true;
            let Ok(call) = serde_json::from_str::<FencedCall>(block.body) else {
                tracing::debug!(block = index, "Fenced block did not decode as a call");
                continue;
            };
            if canonical_name(&call.function).is_none() {
                first_unknown.get_or_insert(call.function);
                continue;
            }
            return match self.validate(&call.function, call.arguments, map) {
                Ok(action) => TurnAction::Execute {
                    action,
                    origin: CallOrigin::Fenced { block: index },
                },
                Err(invalid) => no_action(NoActionReason::InvalidAction(invalid)),
            };
        }

        let reason = match (first_unknown, saw_recognized) {
            (Some(name), _) => NoActionReason::InvalidAction(InvalidAction::UnknownFunction(name)),
            (None, true) => NoActionReason::ParseFailure("no fenced block decoded as a call".into()),
            (None, false) => NoActionReason::ParseFailure("no function call found".into()),
        };
        no_action(reason)
    }

    /// Map a named call onto a validated action
    fn validate(
        &self,
        name: &str,
        arguments: Value,
        map: Option<&LocalMap>,
    ) -> Result<Action, InvalidAction> {
        let Some(function) = canonical_name(name) else {
            return Err(InvalidAction::UnknownFunction(name.to_string()));
        };

        match function {
            "press_keys" => {
                let args = parse_args::<PressKeysArgs>(arguments, function)?;
                if args.keys.is_empty() {
                    return Err(bad(function, "keys must not be empty"));
                }
                if args.keys.len() > self.limits.max_keys {
                    return Err(bad(
                        function,
                        format!("at most {} keys per turn", self.limits.max_keys),
                    ));
                }
                let keys = args
                    .keys
                    .iter()
                    .map(|k| {
                        Button::parse(k).ok_or_else(|| bad(function, format!("unknown button '{k}'")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(reasoning) = args.reasoning.as_deref() {
                    tracing::info!(reasoning, "Decision reasoning");
                }
                Ok(Action::PressKeys(keys))
            }
            "compute_path" => {
                let args = parse_args::<ComputePathArgs>(arguments, function)?;
                let target = self.check_target(args.target_x, args.target_y, map)?;
                Ok(Action::ComputePath { target })
            }
            _ => {
                let args = parse_args::<WaitArgs>(arguments, function)?;
                let frames = args
                    .frames
                    .unwrap_or(i64::from(self.limits.default_wait_frames));
                if frames <= 0 {
                    return Err(bad(function, "frames must be positive"));
                }
                if frames > i64::from(self.limits.max_wait_frames) {
                    return Err(bad(
                        function,
                        format!("frames must be at most {}", self.limits.max_wait_frames),
                    ));
                }
                Ok(Action::Wait {
                    frames: frames as u32,
                })
            }
        }
    }

    /// Target must lie within the map bounds, or within the window when
    /// the bounds are unresolved
    fn check_target(&self, x: i64, y: i64, map: Option<&LocalMap>) -> Result<Position, InvalidAction> {
        let function = "compute_path";
        let Some(map) = map else {
            return Err(bad(function, "player position unresolved"));
        };
        let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
            return Err(bad(function, format!("target ({x}, {y}) out of range")));
        };
        let target = Position::new(x, y);
        match &map.bounds {
            Bounds::Known { width, height } => {
                if map.bounds.contains(target) != Some(true) {
                    return Err(bad(
                        function,
                        format!("target {target} outside map bounds {width}x{height}"),
                    ));
                }
            }
            Bounds::Unresolved { .. } => {
                if !map.in_window(target) {
                    return Err(bad(
                        function,
                        format!("target {target} outside the visible area; map bounds unresolved"),
                    ));
                }
            }
        }
        Ok(target)
    }
}

impl Default for ActionResolver {
    fn default() -> Self {
        Self::new(ActionLimits::default())
    }
}
