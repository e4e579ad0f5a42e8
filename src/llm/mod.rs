//! Decision-maker side of the loop: prompt rendering and response sources

pub mod client;
pub mod context;
pub mod scripted;

pub use client::{ApiFormat, DecisionMaker, LlmClient};
pub use context::TurnContext;
pub use scripted::ScriptedDecisionMaker;
