//! Integration tests for the full turn loop against the grid simulator

use std::path::Path;

use serde_json::json;
use tile_pilot::command::{DecisionResponse, NoActionReason, Outcome, TurnAction};
use tile_pilot::core::config::PilotConfig;
use tile_pilot::core::types::{MapId, Position};
use tile_pilot::emulator::sim::GridSim;
use tile_pilot::llm::ScriptedDecisionMaker;
use tile_pilot::turn::TurnController;
use tile_pilot::world::WarpRegistry;

const ROOM: &str = "
    #######
    #..W..#
    #.....#
    #..@..#
    #######";

fn load_registry() -> Option<WarpRegistry> {
    let path = Path::new("data/warps.toml");
    if !path.exists() {
        return None;
    }
    WarpRegistry::load(path).ok()
}

#[tokio::test]
async fn test_scripted_session() {
    let registry = match load_registry() {
        Some(r) => r,
        None => {
            eprintln!("Skipping test: data/warps.toml not found");
            return;
        }
    };

    let mut sim = GridSim::from_plan(ROOM, MapId::new(0, 1)).unwrap();
    let mut controller = TurnController::new(&PilotConfig::default(), registry);
    let dm = ScriptedDecisionMaker::new(vec![
        // 1: one step up
        DecisionResponse::from_call("press_keys", json!({"keys": ["up"], "reasoning": "door is north"})),
        // 2: fenced fallback onto the adjacent exit tile
        DecisionResponse::from_text(
            "The exit is right above me.\n```json\n{\"function\": \"compute_path\", \"arguments\": {\"x\": 3, \"y\": 1}}\n```",
        ),
        // 3: prose only
        DecisionResponse::from_text("Maybe I should look around first."),
        // 4: not a known function
        DecisionResponse::from_text("```tool_call\n{\"function\": \"fly\", \"arguments\": {}}\n```"),
        // 5: target outside the measured area
        DecisionResponse::from_call("compute_path", json!({"x": 5, "y": 3})),
    ]);

    let first = controller.run_turn(&mut sim, &dm).await.unwrap();
    assert_eq!(first.execution.as_ref().unwrap().outcome, Outcome::Moved);
    assert_eq!(sim.player(), Position::new(3, 2));

    let second = controller.run_turn(&mut sim, &dm).await.unwrap();
    assert_eq!(second.position, Some(Position::new(3, 2)));
    assert_eq!(second.execution.as_ref().unwrap().outcome, Outcome::Moved);
    assert_eq!(sim.player(), Position::new(3, 1));

    let third = controller.run_turn(&mut sim, &dm).await.unwrap();
    assert!(matches!(
        &third.decision,
        TurnAction::NoAction(n) if matches!(n.reason, NoActionReason::ParseFailure(_))
    ));

    let fourth = controller.run_turn(&mut sim, &dm).await.unwrap();
    assert!(fourth.summary().contains("unknown function 'fly'"));

    let inputs_before = sim.inputs.len();
    let fifth = controller.run_turn(&mut sim, &dm).await.unwrap();
    let execution = fifth.execution.unwrap();
    assert!(matches!(execution.outcome, Outcome::Unreachable(_)));
    assert!(!execution.succeeded);
    assert_eq!(sim.inputs.len(), inputs_before);

    let prompts = dm.prompts();
    assert_eq!(prompts.len(), 5);
    assert!(prompts[0].contains("Location: Simulator Room (map 0:1)"));
    assert!(prompts[0].contains("- up: walkable (measured)"));
    assert!(prompts[4].contains("NO_ACTION"));

    let stats = controller.tracker().stats();
    assert_eq!(stats.tiles_visited, 3);
    assert_eq!(stats.steps, 2);
    assert_eq!(controller.history().len(), 5);
}

#[tokio::test]
async fn test_wall_bump_is_reported_next_turn() {
    let mut sim = GridSim::from_plan(ROOM, MapId::new(0, 1)).unwrap();
    let mut controller = TurnController::new(&PilotConfig::default(), WarpRegistry::empty());
    let dm = ScriptedDecisionMaker::new(vec![
        DecisionResponse::from_call("press_keys", json!({"keys": ["down"]})),
        DecisionResponse::from_call("wait", json!({"frames": 5})),
    ]);

    let bump = controller.run_turn(&mut sim, &dm).await.unwrap();
    assert!(matches!(
        bump.execution.unwrap().outcome,
        Outcome::MovementNoEffect { .. }
    ));

    controller.run_turn(&mut sim, &dm).await.unwrap();
    let prompts = dm.prompts();
    assert!(prompts[1].contains("MOVEMENT_NO_EFFECT"));
}

#[test]
fn test_sample_config_loads() {
    let path = Path::new("data/pilot.toml");
    if !path.exists() {
        eprintln!("Skipping test: data/pilot.toml not found");
        return;
    }
    let config = PilotConfig::load(path).unwrap();
    assert_eq!(config.vision_radius, 5);
    assert_eq!(config.history_shown, 15);
    assert!(config.tilesets.is_empty());
}
