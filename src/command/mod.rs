//! Command pipeline
//!
//! DecisionResponse -> ActionResolver -> Action -> ActionExecutor -> ExecutionResult

pub mod action;
pub mod executor;
pub mod fence;
pub mod resolver;

pub use action::Action;
pub use executor::{ActionExecutor, ExecutionResult, InputTiming, Outcome};
pub use resolver::{
    ActionLimits, ActionResolver, CallOrigin, DecisionResponse, FunctionCall, InvalidAction,
    NoAction, NoActionReason, TurnAction,
};
