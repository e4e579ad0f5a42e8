//! Action execution - applies one validated action to the emulator
//!
//! Inputs go out one button at a time: press, hold, release, settle. The game
//! re-evaluates passability from wherever the previous step left the player,
//! so every directional step is preceded by a fresh read of that direction's
//! collision byte.

use crate::command::action::Action;
use crate::core::error::Result;
use crate::core::types::{Direction, Position};
use crate::emulator::{Button, Emulator};
use crate::memory::layout::{CollisionAddrs, MemoryLayout};
use crate::memory::resolver::{any_byte, is_coordinate, resolve};
use crate::memory::snapshot::SparseSnapshot;
use crate::navigation::pathfinding::{find_path, Unreachable};
use crate::world::local_map::LocalMap;

/// Frame timing for one button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTiming {
    /// Frames the button stays down
    pub hold_frames: u32,
    /// Frames advanced after release before the next input
    pub settle_frames: u32,
}

impl Default for InputTiming {
    fn default() -> Self {
        Self {
            hold_frames: 8,
            settle_frames: 10,
        }
    }
}

/// Collision re-check made right before one button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCheck {
    pub button: Button,
    /// Measured passability in the button's direction; `None` for
    /// non-directional buttons or an unreadable collision byte
    pub walkable: Option<bool>,
    /// Whether the position changed across this press; `None` for
    /// non-directional buttons or when either position was unreadable
    pub landed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Player position changed as expected
    Moved,
    /// A movement-expecting action left the position unchanged
    MovementNoEffect { detail: String },
    /// Buttons pressed, none of them directional
    NoMovementExpected,
    Waited { frames: u32 },
    AlreadyAtTarget,
    /// Planner found no route; nothing was pressed
    Unreachable(Unreachable),
    /// Path stopped early after at least one step
    PathInterrupted { completed: usize, remaining: usize, reason: String },
    /// Position could not be re-read after moving
    PositionUnverified,
    EmulatorFault(String),
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        matches!(
            self,
            Outcome::Moved
                | Outcome::NoMovementExpected
                | Outcome::Waited { .. }
                | Outcome::AlreadyAtTarget
        )
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Moved => write!(f, "moved"),
            Outcome::MovementNoEffect { detail } => write!(f, "MOVEMENT_NO_EFFECT ({detail})"),
            Outcome::NoMovementExpected => write!(f, "buttons pressed"),
            Outcome::Waited { frames } => write!(f, "waited {frames} frames"),
            Outcome::AlreadyAtTarget => write!(f, "already at target"),
            Outcome::Unreachable(u) => write!(f, "UNREACHABLE ({u})"),
            Outcome::PathInterrupted {
                completed,
                remaining,
                reason,
            } => write!(
                f,
                "path interrupted after {completed} steps, {remaining} left ({reason})"
            ),
            Outcome::PositionUnverified => write!(f, "position could not be re-read"),
            Outcome::EmulatorFault(e) => write!(f, "emulator fault: {e}"),
        }
    }
}

/// Result of executing one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub succeeded: bool,
    /// `None` when the turn started with an unresolved position
    pub position_before: Option<Position>,
    /// `None` when the position could not be re-read
    pub position_after: Option<Position>,
    pub outcome: Outcome,
    pub checks: Vec<StepCheck>,
}

/// Interruption of a planned walk
struct Interruption {
    completed: usize,
    reason: String,
}

pub struct ActionExecutor {
    layout: MemoryLayout,
    timing: InputTiming,
}

impl ActionExecutor {
    pub fn new(layout: MemoryLayout, timing: InputTiming) -> Self {
        Self { layout, timing }
    }

    /// Execute `action`. `map` is this turn's local map, used to plan paths;
    /// it is `None` when the position did not resolve.
    pub fn execute<E: Emulator + ?Sized>(
        &self,
        emu: &mut E,
        action: &Action,
        map: Option<&LocalMap>,
    ) -> ExecutionResult {
        let before = map.map(|m| m.player);
        let mut checks = Vec::new();

        let outcome = match self.run(emu, action, map, &mut checks) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, action = %action, "Emulator fault during execution");
                return ExecutionResult {
                    succeeded: false,
                    position_before: before,
                    position_after: None,
                    outcome: Outcome::EmulatorFault(e.to_string()),
                    checks,
                };
            }
        };

        let after = match self.read_position(emu) {
            Ok(pos) => pos,
            Err(e) => {
                tracing::warn!(error = %e, "Could not re-read position");
                None
            }
        };

        let outcome = self.verify(action, outcome, before, after, &checks);
        tracing::info!(action = %action, outcome = %outcome, ?before, "Action executed");

        ExecutionResult {
            succeeded: outcome.succeeded(),
            position_before: before,
            position_after: after,
            outcome,
            checks,
        }
    }

    fn run<E: Emulator + ?Sized>(
        &self,
        emu: &mut E,
        action: &Action,
        map: Option<&LocalMap>,
        checks: &mut Vec<StepCheck>,
    ) -> Result<Outcome> {
        match action {
            Action::PressKeys(keys) => {
                let mut last = if action.expects_movement() {
                    self.read_position(emu)?
                } else {
                    None
                };
                for &button in keys {
                    let Some(dir) = button.direction() else {
                        checks.push(StepCheck {
                            button,
                            walkable: None,
                            landed: None,
                        });
                        self.tap(emu, button)?;
                        continue;
                    };
                    let walkable = self.read_collision(emu, dir)?;
                    if walkable == Some(false) {
                        tracing::debug!(button = %button, "Pressing toward a blocked tile");
                    }
                    self.tap(emu, button)?;

                    // A later step can undo an earlier one, so each tap is
                    // judged on its own
                    let now = self.read_position(emu)?;
                    let landed = match (last, now) {
                        (Some(prev), Some(now)) => Some(prev != now),
                        _ => None,
                    };
                    checks.push(StepCheck {
                        button,
                        walkable,
                        landed,
                    });
                    last = now;
                }
                Ok(if action.expects_movement() {
                    Outcome::Moved
                } else {
                    Outcome::NoMovementExpected
                })
            }
            Action::ComputePath { target } => {
                let Some(map) = map else {
                    tracing::warn!(target = %target, "Cannot plan without a resolved position");
                    return Ok(Outcome::Unreachable(Unreachable::NoMap { goal: *target }));
                };
                let path = match find_path(map, map.player, *target) {
                    Ok(path) => path,
                    Err(unreachable) => {
                        tracing::info!(target = %target, reason = %unreachable, "No path");
                        return Ok(Outcome::Unreachable(unreachable));
                    }
                };
                if path.is_empty() {
                    return Ok(Outcome::AlreadyAtTarget);
                }
                tracing::debug!(target = %target, moves = %path.condensed(), "Walking planned path");

                match self.walk(emu, map.player, &path.moves, checks)? {
                    None => Ok(Outcome::Moved),
                    Some(stop) => Ok(Outcome::PathInterrupted {
                        completed: stop.completed,
                        remaining: path.len() - stop.completed,
                        reason: stop.reason,
                    }),
                }
            }
            Action::Wait { frames } => {
                emu.advance(*frames)?;
                Ok(Outcome::Waited { frames: *frames })
            }
        }
    }

    /// Take planned steps, stopping at the first step the game will not take
    fn walk<E: Emulator + ?Sized>(
        &self,
        emu: &mut E,
        start: Position,
        moves: &[Direction],
        checks: &mut Vec<StepCheck>,
    ) -> Result<Option<Interruption>> {
        let mut expected = start;
        for (i, &dir) in moves.iter().enumerate() {
            let walkable = self.read_collision(emu, dir)?;
            checks.push(StepCheck {
                button: Button::from(dir),
                walkable,
                landed: None,
            });
            match walkable {
                Some(true) => {}
                Some(false) => {
                    return Ok(Some(Interruption {
                        completed: i,
                        reason: format!("{dir} from {expected} is blocked"),
                    }))
                }
                None => {
                    return Ok(Some(Interruption {
                        completed: i,
                        reason: format!("collision toward {dir} unreadable"),
                    }))
                }
            }

            self.tap(emu, Button::from(dir))?;
            expected = expected.step(dir);

            let now = self.read_position(emu)?;
            if let Some(check) = checks.last_mut() {
                check.landed = now.map(|p| p == expected);
            }
            if now != Some(expected) {
                let seen = now.map_or_else(|| "unresolved".to_string(), |p| p.to_string());
                return Ok(Some(Interruption {
                    completed: i,
                    reason: format!("step {dir} did not land on {expected} (at {seen})"),
                }));
            }
        }
        Ok(None)
    }

    /// Press, hold, release, settle
    fn tap<E: Emulator + ?Sized>(&self, emu: &mut E, button: Button) -> Result<()> {
        emu.press(button)?;
        emu.advance(self.timing.hold_frames)?;
        emu.release(button)?;
        emu.advance(self.timing.settle_frames)
    }

    fn read_position<E: Emulator + ?Sized>(&self, emu: &mut E) -> Result<Option<Position>> {
        let addrs: Vec<u16> = self
            .layout
            .player_x
            .iter()
            .chain(self.layout.player_y.iter())
            .copied()
            .collect();
        let mem = SparseSnapshot::capture(emu, &addrs)?;
        let x = resolve("player_x", &self.layout.player_x, is_coordinate, &mem).value();
        let y = resolve("player_y", &self.layout.player_y, is_coordinate, &mem).value();
        Ok(match (x, y) {
            (Some(x), Some(y)) => Some(Position::new(i32::from(x), i32::from(y))),
            _ => None,
        })
    }

    fn read_collision<E: Emulator + ?Sized>(&self, emu: &mut E, dir: Direction) -> Result<Option<bool>> {
        let collision = self.layout.collision;
        let addr = collision.address(dir);
        let mem = SparseSnapshot::capture(emu, &[addr])?;
        let r = resolve(CollisionAddrs::field_name(dir), &[addr], any_byte, &mem);
        Ok(r.value().map(|v| v == collision.walkable_value))
    }

    /// Apply the post-condition: a movement-expecting action must change the
    /// position at least once. A round trip such as `[down, up]` ends where it
    /// started but still moved.
    fn verify(
        &self,
        action: &Action,
        outcome: Outcome,
        before: Option<Position>,
        after: Option<Position>,
        checks: &[StepCheck],
    ) -> Outcome {
        let attempted = matches!(
            outcome,
            Outcome::Moved | Outcome::PathInterrupted { .. }
        );
        if !action.expects_movement() || !attempted {
            return outcome;
        }
        let (Some(before), Some(after)) = (before, after) else {
            return Outcome::PositionUnverified;
        };
        if after != before || checks.iter().any(|c| c.landed == Some(true)) {
            return outcome;
        }

        let detail = match outcome {
            Outcome::PathInterrupted { reason, .. } => reason,
            _ => {
                let blocked: Vec<&str> = checks
                    .iter()
                    .filter(|c| c.walkable == Some(false))
                    .map(|c| c.button.as_str())
                    .collect();
                if blocked.is_empty() {
                    "position unchanged".to_string()
                } else {
                    format!("blocked toward {}", blocked.join(", "))
                }
            }
        };
        tracing::warn!(action = %action, at = %before, detail, "Movement had no effect");
        Outcome::MovementNoEffect { detail }
    }
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(MemoryLayout::default(), InputTiming::default())
    }
}
