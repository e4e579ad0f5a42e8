//! Per-turn prompt rendering
//!
//! Turns a [`WorldState`] plus session bookkeeping into the text the decision
//! maker reads. Unknown and unresolved data is always named as such; nothing
//! is rendered as walkable unless the world model says so.

use crate::core::types::{Direction, Facing, Position};
use crate::turn::progress::{ExplorationStats, Milestone};
use crate::world::game_status::GameStatus;
use crate::world::local_map::{
    Bounds, Confidence, ExitSource, LocalMap, TerrainSignal, TileClass, WorldState,
};

const LEGEND: &str = "Legend: ^ v < > player (facing), @ player (facing unknown), W exit, N NPC, \
. walkable (measured), , walkable (derived), X blocked (measured), x blocked (derived), \
? unknown, # outside the map";

/// Milestones listed in the prompt, newest last
const MILESTONES_SHOWN: usize = 5;

/// Everything shown to the decision maker for one turn
#[derive(Debug, Clone)]
pub struct TurnContext<'a> {
    turn: u64,
    world: &'a WorldState,
    location: Option<&'a str>,
    feedback: Option<String>,
    history: Vec<String>,
    exploration: Option<ExplorationStats>,
    milestones: &'a [Milestone],
}

impl<'a> TurnContext<'a> {
    pub fn new(turn: u64, world: &'a WorldState) -> Self {
        Self {
            turn,
            world,
            location: None,
            feedback: None,
            history: Vec::new(),
            exploration: None,
            milestones: &[],
        }
    }

    /// Human-readable map name, when the registry knows one
    pub fn location(mut self, name: Option<&'a str>) -> Self {
        self.location = name;
        self
    }

    /// Outcome of the previous turn's action
    pub fn feedback(mut self, feedback: Option<String>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn history(mut self, lines: Vec<String>) -> Self {
        self.history = lines;
        self
    }

    pub fn exploration(mut self, stats: ExplorationStats) -> Self {
        self.exploration = Some(stats);
        self
    }

    pub fn milestones(mut self, milestones: &'a [Milestone]) -> Self {
        self.milestones = milestones;
        self
    }

    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("# Turn {}\n", self.turn));

        let map_id = self.world.map_id();
        match (self.location, map_id) {
            (Some(name), Some(id)) => s.push_str(&format!("Location: {name} (map {id})\n")),
            (None, Some(id)) => s.push_str(&format!("Location: map {id}\n")),
            _ => s.push_str("Location: UNRESOLVED\n"),
        }

        match self.world {
            WorldState::Mapped(map) => self.render_map(&mut s, map),
            WorldState::PositionUnresolved {
                facing, unresolved, ..
            } => {
                s.push_str("Position: UNRESOLVED\n");
                s.push_str(&format!("Facing: {}\n", facing_text(*facing)));
                s.push_str(
                    "\nNo spatial information is available this turn. \
                     compute_path cannot be used; press_keys and wait still work.\n",
                );
                render_unresolved(&mut s, unresolved);
            }
        }

        render_game_status(&mut s, self.world.game());

        if let Some(feedback) = &self.feedback {
            s.push_str(&format!("\n## Last Action\n{feedback}\n"));
        }

        if !self.history.is_empty() {
            s.push_str("\n## Recent Turns\n");
            for line in &self.history {
                s.push_str(&format!("- {line}\n"));
            }
        }

        if let Some(stats) = &self.exploration {
            s.push_str(&format!(
                "\n## Exploration\nTiles visited: {} | Maps visited: {} | Steps taken: {}\n",
                stats.tiles_visited, stats.maps_visited, stats.steps
            ));
        }

        if !self.milestones.is_empty() {
            s.push_str("\n## Milestones\n");
            let skip = self.milestones.len().saturating_sub(MILESTONES_SHOWN);
            for m in &self.milestones[skip..] {
                s.push_str(&format!("- {m}\n"));
            }
        }

        s
    }

    fn render_map(&self, s: &mut String, map: &LocalMap) {
        s.push_str(&format!("Position: {}\n", map.player));
        s.push_str(&format!("Facing: {}\n", facing_text(map.facing)));
        match &map.bounds {
            Bounds::Known { width, height } => {
                s.push_str(&format!("Map size: {width}x{height}\n"))
            }
            Bounds::Unresolved { reason } => {
                s.push_str(&format!("Map size: UNRESOLVED ({reason})\n"))
            }
        }
        render_unresolved(s, &map.unresolved);

        s.push_str("\n## Surroundings\n");
        render_grid(s, map);
        s.push_str(&format!("{LEGEND}\n"));
        s.push_str(&format!("{}\n", terrain_note(&map.terrain)));

        s.push_str("\n## Can Move\n");
        for (dir, class) in map.movement_legality() {
            s.push_str(&format!("- {dir}: {}\n", class_text(class)));
        }

        s.push_str("\n## Exits\n");
        if map.exits.is_empty() {
            s.push_str("None known.\n");
        } else {
            let mut exits = map.exits.clone();
            exits.sort_by_key(|e| e.pos.manhattan(&map.player));
            for exit in exits {
                let source = match exit.source {
                    ExitSource::Detected { .. } => "detected",
                    ExitSource::Registry => "registry",
                };
                s.push_str(&format!(
                    "- {}: {} steps, {} [{source}]\n",
                    exit.pos,
                    exit.pos.manhattan(&map.player),
                    relative_direction(map.player, exit.pos)
                ));
            }
        }

        if !map.npcs.is_empty() {
            s.push_str("\n## NPCs\n");
            for npc in &map.npcs {
                s.push_str(&format!(
                    "- {}: {}\n",
                    npc,
                    relative_direction(map.player, *npc)
                ));
            }
        }

        s.push_str(&format!(
            "\n## Status\nDialogue open: {} | In battle: {}\n",
            flag_text(map.status.dialogue_open),
            flag_text(map.status.in_battle)
        ));
    }
}

fn render_unresolved(s: &mut String, unresolved: &[&str]) {
    if !unresolved.is_empty() {
        s.push_str(&format!("Unresolved this turn: {}\n", unresolved.join(", ")));
    }
}

fn render_game_status(s: &mut String, game: &GameStatus) {
    s.push_str("\n## Game Status\n");

    let party = match &game.party {
        Some(species) if species.is_empty() => "empty".to_string(),
        Some(species) => {
            let ids: Vec<String> = species.iter().map(|id| format!("#{id}")).collect();
            format!("{} ({})", species.len(), ids.join(", "))
        }
        None => "unresolved".to_string(),
    };
    s.push_str(&format!("Party: {party}\n"));

    let badges = game.badges.map_or_else(
        || "unresolved".to_string(),
        |b| {
            format!(
                "{}/16 (Johto {}, Kanto {})",
                b.total(),
                b.johto.count_ones(),
                b.kanto.count_ones()
            )
        },
    );
    s.push_str(&format!("Badges: {badges}\n"));

    let money = game
        .money
        .map_or_else(|| "unresolved".to_string(), |m| format!("${m}"));
    let dex = game.dex.map_or_else(
        || "unresolved".to_string(),
        |d| format!("{} owned, {} seen", d.owned, d.seen),
    );
    s.push_str(&format!("Money: {money} | Pokédex: {dex}\n"));

    let items = match &game.items {
        Some(items) if items.is_empty() => "none".to_string(),
        Some(items) => items
            .iter()
            .map(|i| format!("#{} x{}", i.id, i.quantity))
            .collect::<Vec<_>>()
            .join(", "),
        None => "unresolved".to_string(),
    };
    s.push_str(&format!("Items: {items}\n"));

    let playtime = game
        .playtime
        .map_or_else(|| "unresolved".to_string(), |t| t.to_string());
    s.push_str(&format!(
        "Play time: {playtime} | Menu open: {}\n",
        flag_text(game.in_menu)
    ));
}

fn render_grid(s: &mut String, map: &LocalMap) {
    let r = map.radius;
    let p = map.player;

    s.push_str("| Y\\X |");
    for x in (p.x - r)..=(p.x + r) {
        s.push_str(&format!(" {x} |"));
    }
    s.push_str("\n|-----|");
    for _ in (p.x - r)..=(p.x + r) {
        s.push_str("---|");
    }
    s.push('\n');

    for row in map.rows() {
        let y = row.first().map(|c| c.y).unwrap_or(p.y);
        s.push_str(&format!("| {y} |"));
        for cell in row {
            s.push_str(&format!(" {} |", glyph(map, cell)));
        }
        s.push('\n');
    }
}

/// Player, then exit, then NPC, then the cell's classification
fn glyph(map: &LocalMap, pos: Position) -> char {
    if pos == map.player {
        return match map.facing.and_then(|f| f.direction()) {
            Some(Direction::Up) => '^',
            Some(Direction::Down) => 'v',
            Some(Direction::Left) => '<',
            Some(Direction::Right) => '>',
            None => '@',
        };
    }
    if map.is_exit(pos) {
        return 'W';
    }
    if map.npcs.contains(&pos) {
        return 'N';
    }
    match map.classify(pos) {
        TileClass::OutOfBounds => '#',
        TileClass::Walkable(Confidence::Measured) => '.',
        TileClass::Walkable(Confidence::Derived) => ',',
        TileClass::Blocked(Confidence::Measured) => 'X',
        TileClass::Blocked(Confidence::Derived) => 'x',
        TileClass::Unknown => '?',
    }
}

fn facing_text(facing: Option<Facing>) -> String {
    match facing {
        Some(f) => f.to_string(),
        None => "UNRESOLVED".into(),
    }
}

fn class_text(class: TileClass) -> &'static str {
    match class {
        TileClass::Walkable(Confidence::Measured) => "walkable (measured)",
        TileClass::Walkable(Confidence::Derived) => "walkable (derived)",
        TileClass::Blocked(Confidence::Measured) => "blocked (measured)",
        TileClass::Blocked(Confidence::Derived) => "blocked (derived)",
        TileClass::Unknown => "unknown",
        TileClass::OutOfBounds => "outside the map",
    }
}

fn flag_text(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unresolved",
    }
}

fn terrain_note(terrain: &TerrainSignal) -> String {
    match terrain {
        TerrainSignal::Applied { tileset } => {
            format!("Tiles beyond the adjacent four are derived from tileset {tileset}.")
        }
        TerrainSignal::NoMapping { tileset } => format!(
            "No passability mapping for tileset {tileset}; only adjacent tiles are classified."
        ),
        TerrainSignal::Contradicted { tileset, at } => format!(
            "Tileset {tileset} mapping disagreed with a measured tile at {at}; not used this turn."
        ),
        TerrainSignal::Unavailable => {
            "Terrain signal unavailable; only adjacent tiles are classified.".into()
        }
    }
}

/// "2 north, 3 east" style offset from `from` to `to`
fn relative_direction(from: Position, to: Position) -> String {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let mut parts = Vec::new();
    if dy != 0 {
        let dir = if dy < 0 { Direction::Up } else { Direction::Down };
        parts.push(format!("{} {}", dy.abs(), dir.compass()));
    }
    if dx != 0 {
        let dir = if dx < 0 { Direction::Left } else { Direction::Right };
        parts.push(format!("{} {}", dx.abs(), dir.compass()));
    }
    if parts.is_empty() {
        "here".into()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MapId;
    use crate::world::game_status::{Badges, DexCounts, ItemSlot, PlayTime};
    use crate::world::local_map::{Exit, StatusFlags};
    use ahash::AHashMap;

    fn small_map() -> LocalMap {
        let mut tiles = AHashMap::new();
        tiles.insert(Position::new(2, 1), TileClass::Blocked(Confidence::Measured));
        tiles.insert(Position::new(2, 3), TileClass::Walkable(Confidence::Measured));
        tiles.insert(Position::new(1, 2), TileClass::Walkable(Confidence::Derived));
        tiles.insert(Position::new(3, 2), TileClass::OutOfBounds);
        LocalMap {
            map_id: Some(MapId::new(1, 4)),
            player: Position::new(2, 2),
            facing: Some(Facing::Known(Direction::Up)),
            radius: 1,
            bounds: Bounds::Known {
                width: 3,
                height: 4,
            },
            tiles,
            exits: vec![Exit {
                pos: Position::new(1, 1),
                source: ExitSource::Detected { candidate: 0 },
            }],
            npcs: vec![Position::new(1, 3)],
            terrain: TerrainSignal::NoMapping { tileset: 6 },
            status: StatusFlags {
                dialogue_open: Some(false),
                in_battle: None,
            },
            game: GameStatus::default(),
            unresolved: vec!["in_battle"],
        }
    }

    #[test]
    fn test_grid_glyphs() {
        let world = WorldState::Mapped(small_map());
        let text = TurnContext::new(3, &world).render();

        assert!(text.contains("| Y\\X | 1 | 2 | 3 |"));
        assert!(text.contains("| 1 | W | X | ? |"));
        assert!(text.contains("| 2 | , | ^ | # |"));
        assert!(text.contains("| 3 | N | . | ? |"));
    }

    #[test]
    fn test_movement_and_exits() {
        let world = WorldState::Mapped(small_map());
        let text = TurnContext::new(3, &world)
            .location(Some("Oak Lab"))
            .render();

        assert!(text.contains("Location: Oak Lab (map 1:4)"));
        assert!(text.contains("- up: blocked (measured)"));
        assert!(text.contains("- down: walkable (measured)"));
        assert!(text.contains("- left: walkable (derived)"));
        assert!(text.contains("- right: outside the map"));
        assert!(text.contains("- (1, 1): 2 steps, 1 north, 1 west [detected]"));
        assert!(text.contains("- (1, 3): 1 south, 1 west"));
    }

    #[test]
    fn test_unresolved_fields_are_named() {
        let world = WorldState::Mapped(small_map());
        let text = TurnContext::new(1, &world).render();
        assert!(text.contains("Unresolved this turn: in_battle"));
        assert!(text.contains("Dialogue open: no | In battle: unresolved"));
        assert!(text.contains("No passability mapping for tileset 6"));
    }

    #[test]
    fn test_unknown_facing_renders_raw_byte() {
        let mut map = small_map();
        map.facing = Some(Facing::Unknown { raw: 0x42 });
        let world = WorldState::Mapped(map);
        let text = TurnContext::new(1, &world).render();
        assert!(text.contains("Facing: UNKNOWN(0x42)"));
        assert!(text.contains("| 2 | , | @ | # |"));
    }

    #[test]
    fn test_position_unresolved() {
        let world = WorldState::PositionUnresolved {
            map_id: None,
            facing: None,
            game: GameStatus::default(),
            unresolved: vec!["player_x", "map_group"],
        };
        let text = TurnContext::new(7, &world).render();
        assert!(text.contains("Location: UNRESOLVED"));
        assert!(text.contains("Position: UNRESOLVED"));
        assert!(text.contains("Unresolved this turn: player_x, map_group"));
        assert!(!text.contains("## Surroundings"));
    }

    #[test]
    fn test_feedback_history_and_stats() {
        let world = WorldState::Mapped(small_map());
        let text = TurnContext::new(4, &world)
            .feedback(Some("press_keys [up]: movement had no effect".into()))
            .history(vec!["Turn 3: wait 60 frames -> waited".into()])
            .exploration(ExplorationStats {
                tiles_visited: 12,
                maps_visited: 2,
                steps: 15,
            })
            .render();
        assert!(text.contains("## Last Action\npress_keys [up]: movement had no effect"));
        assert!(text.contains("- Turn 3: wait 60 frames -> waited"));
        assert!(text.contains("Tiles visited: 12 | Maps visited: 2 | Steps taken: 15"));
    }

    #[test]
    fn test_game_status_section() {
        let mut map = small_map();
        map.game = GameStatus {
            party: Some(vec![155, 16]),
            money: Some(3000),
            badges: Some(Badges {
                johto: 0b11,
                kanto: 0,
            }),
            playtime: Some(PlayTime {
                hours: 1,
                minutes: 2,
                seconds: 3,
            }),
            items: Some(vec![ItemSlot { id: 18, quantity: 5 }]),
            dex: Some(DexCounts { seen: 9, owned: 3 }),
            in_menu: Some(false),
        };
        let world = WorldState::Mapped(map);
        let text = TurnContext::new(2, &world).render();

        assert!(text.contains("## Game Status\nParty: 2 (#155, #16)"));
        assert!(text.contains("Badges: 2/16 (Johto 2, Kanto 0)"));
        assert!(text.contains("Money: $3000 | Pokédex: 3 owned, 9 seen"));
        assert!(text.contains("Items: #18 x5"));
        assert!(text.contains("Play time: 01:02:03 | Menu open: no"));
    }

    #[test]
    fn test_unresolved_game_status_is_named() {
        let world = WorldState::PositionUnresolved {
            map_id: None,
            facing: None,
            game: GameStatus::default(),
            unresolved: vec!["party"],
        };
        let text = TurnContext::new(1, &world).render();
        assert!(text.contains("Party: unresolved"));
        assert!(text.contains("Money: unresolved | Pokédex: unresolved"));
        assert!(text.contains("Menu open: unresolved"));
    }

    #[test]
    fn test_recent_milestones_listed() {
        let world = WorldState::Mapped(small_map());
        let milestones: Vec<Milestone> = (1..=7)
            .map(|size| Milestone::PartyGrew { size })
            .chain([Milestone::BadgeEarned { total: 1 }])
            .collect();
        let text = TurnContext::new(9, &world).milestones(&milestones).render();

        assert!(text.contains("## Milestones\n"));
        assert!(text.contains("- badge earned (1/16)"));
        assert!(text.contains("- party grew to 7"));
        assert!(!text.contains("- party grew to 3\n"));
    }

    #[test]
    fn test_relative_direction() {
        let o = Position::new(5, 5);
        assert_eq!(relative_direction(o, o), "here");
        assert_eq!(relative_direction(o, Position::new(5, 2)), "3 north");
        assert_eq!(relative_direction(o, Position::new(7, 6)), "1 south, 2 east");
    }
}
