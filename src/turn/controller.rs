//! One perceive / decide / act cycle per call

use std::time::Duration;

use crate::command::executor::{ActionExecutor, ExecutionResult};
use crate::command::resolver::{ActionResolver, NoAction, NoActionReason, TurnAction};
use crate::core::config::PilotConfig;
use crate::core::error::Result;
use crate::core::types::{MapId, Position, SessionId};
use crate::emulator::Emulator;
use crate::llm::client::DecisionMaker;
use crate::llm::context::TurnContext;
use crate::memory::snapshot::MemorySnapshot;
use crate::turn::history::ActionHistory;
use crate::turn::progress::{Discovery, ExplorationTracker, Milestone};
use crate::world::builder::WorldBuilder;
use crate::world::tileset::TilesetRegistry;
use crate::world::warps::WarpRegistry;

/// What one turn did
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn: u64,
    pub map_id: Option<MapId>,
    pub position: Option<Position>,
    pub decision: TurnAction,
    /// `None` when the turn produced no action
    pub execution: Option<ExecutionResult>,
    pub discovery: Discovery,
    /// Progress gained since the previous turn's read
    pub milestones: Vec<Milestone>,
}

impl TurnReport {
    /// One-line summary kept in the history
    pub fn summary(&self) -> String {
        let line = match (&self.decision, &self.execution) {
            (TurnAction::Execute { action, .. }, Some(result)) => {
                format!("Turn {}: {} -> {}", self.turn, action, result.outcome)
            }
            (TurnAction::Execute { action, .. }, None) => {
                format!("Turn {}: {} -> not executed", self.turn, action)
            }
            (TurnAction::NoAction(no_action), _) => {
                format!("Turn {}: NO_ACTION ({})", self.turn, no_action.reason)
            }
        };
        if self.milestones.is_empty() {
            return line;
        }
        let gained: Vec<String> = self.milestones.iter().map(|m| m.to_string()).collect();
        format!("{line} [{}]", gained.join("; "))
    }
}

/// Drives the pipeline. Holds no game logic of its own.
pub struct TurnController {
    session: SessionId,
    turn: u64,
    builder: WorldBuilder,
    resolver: ActionResolver,
    executor: ActionExecutor,
    history: ActionHistory,
    history_shown: usize,
    tracker: ExplorationTracker,
    decision_timeout: Duration,
    last_feedback: Option<String>,
}

impl TurnController {
    pub fn new(config: &PilotConfig, registry: WarpRegistry) -> Self {
        let builder = WorldBuilder::new(
            config.memory.clone(),
            config.vision_radius,
            TilesetRegistry::from_mappings(&config.tilesets),
            registry,
        );
        Self {
            session: SessionId::new(),
            turn: 0,
            builder,
            resolver: ActionResolver::new(config.limits()),
            executor: ActionExecutor::new(config.memory.clone(), config.timing()),
            history: ActionHistory::new(config.history_capacity),
            history_shown: config.history_shown,
            tracker: ExplorationTracker::new(),
            decision_timeout: config.decision_timeout(),
            last_feedback: None,
        }
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn turns_taken(&self) -> u64 {
        self.turn
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn tracker(&self) -> &ExplorationTracker {
        &self.tracker
    }

    /// Run one turn.
    ///
    /// Only a failed RAM capture is an error; every decision or execution
    /// problem ends up in the report instead.
    pub async fn run_turn<E, D>(&mut self, emu: &mut E, decider: &D) -> Result<TurnReport>
    where
        E: Emulator + ?Sized,
        D: DecisionMaker + ?Sized,
    {
        self.turn += 1;
        let turn = self.turn;
        tracing::info!(session = %self.session, turn, "Turn started");

        let layout = self.builder.layout();
        let snapshot = MemorySnapshot::capture(emu, layout.capture_start, layout.capture_len)?;
        let world = self.builder.build(&snapshot);

        let mut discovery = Discovery::default();
        if let (Some(map_id), Some(pos)) = (world.map_id(), world.player()) {
            discovery = self.tracker.observe(map_id, pos);
        }
        let milestones = self.tracker.observe_status(world.game());

        let location = world.map_id().and_then(|id| self.builder.registry().name(id));
        let prompt = TurnContext::new(turn, &world)
            .location(location)
            .feedback(self.last_feedback.take())
            .history(self.history.recent(self.history_shown))
            .exploration(self.tracker.stats())
            .milestones(self.tracker.milestones())
            .render();
        tracing::debug!(prompt_len = prompt.len(), "Prompt rendered");

        let decision = match tokio::time::timeout(self.decision_timeout, decider.decide(prompt)).await
        {
            Ok(Ok(response)) => self.resolver.resolve(&response, world.local_map()),
            Ok(Err(e)) => TurnAction::NoAction(NoAction {
                reason: NoActionReason::DecisionUnavailable(e.to_string()),
                raw: String::new(),
            }),
            Err(_) => TurnAction::NoAction(NoAction {
                reason: NoActionReason::Timeout,
                raw: String::new(),
            }),
        };

        let execution = match &decision {
            TurnAction::Execute { action, origin } => {
                tracing::info!(action = %action, ?origin, "Executing");
                Some(self.executor.execute(emu, action, world.local_map()))
            }
            TurnAction::NoAction(no_action) => {
                tracing::warn!(reason = %no_action.reason, raw = %no_action.raw, "NO_ACTION");
                None
            }
        };

        let report = TurnReport {
            turn,
            map_id: world.map_id(),
            position: world.player(),
            decision,
            execution,
            discovery,
            milestones,
        };
        let summary = report.summary();
        self.history.push(summary.clone());
        self.last_feedback = Some(summary);
        Ok(report)
    }
}
