//! World state builder
//!
//! Rebuilds the local map from one memory snapshot per turn. Nothing is carried
//! over between builds except the per-map warp table cache, so two builds from
//! the same snapshot always agree.
//!
//! Signals, strongest first:
//! - the four per-direction collision bytes (measured, adjacent tiles only)
//! - NPC occupancy (derived, can only block)
//! - block ids through an established tileset mapping (derived)
//!
//! Anything else is `Unknown`.

use crate::core::types::{Direction, Facing, MapId, Position};
use crate::memory::layout::{CollisionAddrs, MemoryLayout};
use crate::memory::resolver::{
    any_byte, is_bcd, is_clock_component, is_coordinate, is_dex_count, is_dimension,
    is_item_count, is_item_id, is_item_quantity, is_map_component, is_object_count,
    is_party_count, is_species, is_warp_count, resolve, Validator,
};
use crate::memory::snapshot::MemoryView;
use crate::world::game_status::{decode_bcd, Badges, DexCounts, GameStatus, ItemSlot, PlayTime};
use crate::world::local_map::{
    Bounds, Confidence, Exit, ExitSource, LocalMap, StatusFlags, TerrainSignal, TileClass,
    WorldState,
};
use crate::world::tileset::TilesetRegistry;
use crate::world::warps::{WarpCache, WarpRegistry};

use ahash::AHashMap;

/// Record `field` as unresolved when `value` is missing
fn noted<T>(value: Option<T>, field: &'static str, unresolved: &mut Vec<&'static str>) -> Option<T> {
    if value.is_none() {
        unresolved.push(field);
    }
    value
}

/// Single fixed address through the resolver
fn byte_at<M: MemoryView + ?Sized>(
    mem: &M,
    field: &'static str,
    addr: u16,
    valid: Validator,
) -> Option<u8> {
    resolve(field, &[addr], valid, mem).value()
}

/// Measured passability of the four adjacent tiles; `None` when the
/// collision byte could not be read
type Adjacent = [(Direction, Option<bool>); 4];

pub struct WorldBuilder {
    layout: MemoryLayout,
    radius: i32,
    tilesets: TilesetRegistry,
    registry: WarpRegistry,
    warp_cache: WarpCache,
}

impl WorldBuilder {
    pub fn new(
        layout: MemoryLayout,
        radius: i32,
        tilesets: TilesetRegistry,
        registry: WarpRegistry,
    ) -> Self {
        Self {
            layout,
            radius: radius.max(1),
            tilesets,
            registry,
            warp_cache: WarpCache::new(),
        }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn registry(&self) -> &WarpRegistry {
        &self.registry
    }

    /// Build this turn's world state from a memory snapshot
    pub fn build<M: MemoryView + ?Sized>(&mut self, mem: &M) -> WorldState {
        let layout = &self.layout;
        let mut unresolved = Vec::new();

        let x = resolve("player_x", &layout.player_x, is_coordinate, mem);
        let y = resolve("player_y", &layout.player_y, is_coordinate, mem);
        let facing_raw = resolve("facing", &layout.facing, any_byte, mem);
        let group = resolve("map_group", &layout.map_group, is_map_component, mem);
        let number = resolve("map_number", &layout.map_number, is_map_component, mem);

        for r in [&x, &y, &facing_raw, &group, &number] {
            if !r.is_resolved() {
                unresolved.push(r.field);
            }
        }

        let map_id = match (group.value(), number.value()) {
            (Some(g), Some(n)) => Some(MapId::new(g, n)),
            _ => None,
        };
        let facing = facing_raw.value().map(Facing::from_byte);
        if let Some(Facing::Unknown { raw }) = facing {
            tracing::warn!(raw = %format!("0x{raw:02X}"), "Facing byte matches no known encoding");
        }
        let game = self.read_game_status(mem, &mut unresolved);

        let (Some(px), Some(py)) = (x.value(), y.value()) else {
            tracing::warn!(?unresolved, "Player position unresolved");
            return WorldState::PositionUnresolved {
                map_id,
                facing,
                game,
                unresolved,
            };
        };
        let player = Position::new(i32::from(px), i32::from(py));

        let adjacent = self.measure_adjacent(mem, &mut unresolved);
        let (bounds, width_blocks) = self.resolve_bounds(mem, player, &mut unresolved);
        let npcs = self.read_npcs(mem, &bounds, &mut unresolved);
        let terrain =
            self.terrain_signal(mem, player, &adjacent, &npcs, width_blocks, &mut unresolved);
        let status = self.read_status(mem, &mut unresolved);

        let mut tiles = AHashMap::new();
        for dy in -self.radius..=self.radius {
            for dx in -self.radius..=self.radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let pos = Position::new(player.x + dx, player.y + dy);
                let class = self.classify(
                    mem,
                    pos,
                    player,
                    &adjacent,
                    &bounds,
                    &npcs,
                    &terrain,
                    width_blocks,
                );
                tiles.insert(pos, class);
            }
        }

        let exits = self.resolve_exits(mem, map_id, &bounds);

        let map = LocalMap {
            map_id,
            player,
            facing,
            radius: self.radius,
            bounds,
            tiles,
            exits,
            npcs,
            terrain,
            status,
            game,
            unresolved,
        };
        tracing::debug!(
            player = %map.player,
            walkable = map.count(TileClass::is_walkable),
            unknown = map.count(|c| *c == TileClass::Unknown),
            exits = map.exits.len(),
            "Local map built"
        );
        WorldState::Mapped(map)
    }

    fn measure_adjacent<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        unresolved: &mut Vec<&'static str>,
    ) -> Adjacent {
        let collision = self.layout.collision;
        Direction::ALL.map(|dir| {
            let field = CollisionAddrs::field_name(dir);
            let r = resolve(field, &[collision.address(dir)], any_byte, mem);
            if !r.is_resolved() {
                unresolved.push(field);
            }
            (dir, r.value().map(|v| v == collision.walkable_value))
        })
    }

    /// Map extent in steps. A player standing outside the reported extent
    /// means the dimension bytes are wrong, so no clipping is done.
    fn resolve_bounds<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        player: Position,
        unresolved: &mut Vec<&'static str>,
    ) -> (Bounds, Option<u8>) {
        let w = resolve("map_width", &self.layout.map_width, is_dimension, mem);
        let h = resolve("map_height", &self.layout.map_height, is_dimension, mem);
        let (Some(wb), Some(hb)) = (w.value(), h.value()) else {
            if !w.is_resolved() {
                unresolved.push(w.field);
            }
            if !h.is_resolved() {
                unresolved.push(h.field);
            }
            return (
                Bounds::Unresolved {
                    reason: "map dimensions unresolved".into(),
                },
                None,
            );
        };

        let spb = i32::from(self.layout.steps_per_block.max(1));
        let bounds = Bounds::Known {
            width: i32::from(wb) * spb,
            height: i32::from(hb) * spb,
        };
        if bounds.contains(player) == Some(false) {
            tracing::warn!(
                player = %player,
                width_blocks = wb,
                height_blocks = hb,
                "Player outside reported map dimensions; bounds not trusted"
            );
            unresolved.push("map_bounds");
            return (
                Bounds::Unresolved {
                    reason: format!("dimensions {wb}x{hb} blocks exclude player at {player}"),
                },
                None,
            );
        }
        (bounds, Some(wb))
    }

    fn read_npcs<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        bounds: &Bounds,
        unresolved: &mut Vec<&'static str>,
    ) -> Vec<Position> {
        let table = self.layout.objects;
        let count = resolve("object_count", &[table.count], is_object_count, mem);
        let Some(count) = count.value() else {
            unresolved.push("object_count");
            return Vec::new();
        };

        let mut npcs = Vec::new();
        for i in 0..u16::from(count) {
            match mem.byte(table.slot(i, table.sprite_offset)) {
                None | Some(0) => continue,
                Some(_) => {}
            }
            let y = mem.byte(table.slot(i, table.y_offset)).filter(|v| is_coordinate(*v));
            let x = mem.byte(table.slot(i, table.x_offset)).filter(|v| is_coordinate(*v));
            let (Some(x), Some(y)) = (x, y) else {
                continue;
            };
            let pos = Position::new(i32::from(x), i32::from(y));
            if bounds.contains(pos) == Some(false) {
                continue;
            }
            npcs.push(pos);
        }
        npcs
    }

    /// Decide whether the block-id signal may be used this turn.
    ///
    /// The mapping must exist for the active tileset and agree with every
    /// measured adjacent tile that is not occupied by an NPC.
    fn terrain_signal<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        player: Position,
        adjacent: &Adjacent,
        npcs: &[Position],
        width_blocks: Option<u8>,
        unresolved: &mut Vec<&'static str>,
    ) -> TerrainSignal {
        let tileset = resolve("tileset", &self.layout.terrain.tileset, any_byte, mem);
        let Some(tileset) = tileset.value() else {
            unresolved.push("tileset");
            return TerrainSignal::Unavailable;
        };
        let Some(wb) = width_blocks else {
            return TerrainSignal::Unavailable;
        };
        if !self.tilesets.has_mapping(tileset) {
            return TerrainSignal::NoMapping { tileset };
        }

        for &(dir, measured) in adjacent {
            let pos = player.step(dir);
            let Some(measured) = measured else {
                continue;
            };
            if npcs.contains(&pos) {
                continue;
            }
            if let Some(derived) = self.block_passability(mem, tileset, wb, pos) {
                if derived != measured {
                    tracing::warn!(
                        tileset,
                        at = %pos,
                        measured,
                        derived,
                        "Block mapping contradicts collision byte; ignoring it this turn"
                    );
                    return TerrainSignal::Contradicted { tileset, at: pos };
                }
            }
        }
        TerrainSignal::Applied { tileset }
    }

    fn block_passability<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        tileset: u8,
        width_blocks: u8,
        pos: Position,
    ) -> Option<bool> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let terrain = &self.layout.terrain;
        let spb = i32::from(self.layout.steps_per_block.max(1));
        let border = i32::from(terrain.border_blocks);
        let row = i32::from(width_blocks) + 2 * border;
        let index = (pos.y / spb + border) * row + pos.x / spb + border;
        let index = u16::try_from(index).ok()?;
        let block = mem.byte(terrain.blocks_base.checked_add(index)?)?;
        self.tilesets.passable(tileset, block)
    }

    #[allow(clippy::too_many_arguments)]
    fn classify<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        pos: Position,
        player: Position,
        adjacent: &Adjacent,
        bounds: &Bounds,
        npcs: &[Position],
        terrain: &TerrainSignal,
        width_blocks: Option<u8>,
    ) -> TileClass {
        // Measured adjacency wins over everything, including the bounds:
        // map connections let the player step past the edge
        if pos.manhattan(&player) == 1 {
            let measured = adjacent.iter().find(|(d, _)| player.step(*d) == pos);
            if let Some(&(_, Some(walkable))) = measured {
                return if walkable {
                    TileClass::Walkable(Confidence::Measured)
                } else {
                    TileClass::Blocked(Confidence::Measured)
                };
            }
        }

        if bounds.contains(pos) == Some(false) {
            return TileClass::OutOfBounds;
        }
        if npcs.contains(&pos) {
            return TileClass::Blocked(Confidence::Derived);
        }

        match (terrain, width_blocks) {
            (TerrainSignal::Applied { tileset }, Some(wb)) => {
                match self.block_passability(mem, *tileset, wb, pos) {
                    Some(true) => TileClass::Walkable(Confidence::Derived),
                    Some(false) => TileClass::Blocked(Confidence::Derived),
                    None => TileClass::Unknown,
                }
            }
            _ => TileClass::Unknown,
        }
    }

    fn read_status<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        unresolved: &mut Vec<&'static str>,
    ) -> StatusFlags {
        let dialogue = resolve("dialogue_flags", &self.layout.dialogue_flags, any_byte, mem);
        let battle = resolve("battle_mode", &self.layout.battle_mode, any_byte, mem);
        for r in [&dialogue, &battle] {
            if !r.is_resolved() {
                unresolved.push(r.field);
            }
        }
        StatusFlags {
            dialogue_open: dialogue.value().map(|v| v & 0x01 != 0),
            in_battle: battle.value().map(|v| v != 0),
        }
    }

    /// Party, money, badges, play time, bag, Pokédex and menu.
    ///
    /// Each group resolves as a whole: one bad byte leaves that group `None`
    /// and names it unresolved.
    fn read_game_status<M: MemoryView + ?Sized>(
        &self,
        mem: &M,
        unresolved: &mut Vec<&'static str>,
    ) -> GameStatus {
        let addrs = &self.layout.game;

        let party = resolve("party_count", &addrs.party_count, is_party_count, mem)
            .value()
            .and_then(|count| {
                (0..u16::from(count))
                    .map(|i| {
                        let addr = addrs.party_species.wrapping_add(i);
                        byte_at(mem, "party_species", addr, is_species)
                    })
                    .collect::<Option<Vec<u8>>>()
            });
        let party = noted(party, "party", unresolved);

        let money = (0..3u16)
            .map(|i| byte_at(mem, "money", addrs.money.wrapping_add(i), is_bcd))
            .collect::<Option<Vec<u8>>>()
            .and_then(|bytes| decode_bcd(&bytes));
        let money = noted(money, "money", unresolved);

        let johto = resolve("johto_badges", &addrs.johto_badges, any_byte, mem).value();
        let kanto = resolve("kanto_badges", &addrs.kanto_badges, any_byte, mem).value();
        let badges = match (johto, kanto) {
            (Some(johto), Some(kanto)) => Some(Badges { johto, kanto }),
            _ => None,
        };
        let badges = noted(badges, "badges", unresolved);

        let clock = addrs.playtime;
        let playtime = match (
            byte_at(mem, "playtime_hours", clock, any_byte),
            byte_at(mem, "playtime_minutes", clock.wrapping_add(1), is_clock_component),
            byte_at(mem, "playtime_seconds", clock.wrapping_add(2), is_clock_component),
        ) {
            (Some(hours), Some(minutes), Some(seconds)) => Some(PlayTime {
                hours,
                minutes,
                seconds,
            }),
            _ => None,
        };
        let playtime = noted(playtime, "playtime", unresolved);

        let items = resolve("item_count", &addrs.item_count, is_item_count, mem)
            .value()
            .and_then(|count| {
                (0..u16::from(count))
                    .map(|i| {
                        Some(ItemSlot {
                            id: byte_at(mem, "item_id", addrs.item_id(i), is_item_id)?,
                            quantity: byte_at(
                                mem,
                                "item_quantity",
                                addrs.item_quantity(i),
                                is_item_quantity,
                            )?,
                        })
                    })
                    .collect::<Option<Vec<ItemSlot>>>()
            });
        let items = noted(items, "items", unresolved);

        let seen = resolve("dex_seen", &addrs.dex_seen, is_dex_count, mem).value();
        let owned = resolve("dex_owned", &addrs.dex_owned, is_dex_count, mem).value();
        let dex = match (seen, owned) {
            // Every owned species has been seen
            (Some(seen), Some(owned)) if owned <= seen => Some(DexCounts { seen, owned }),
            _ => None,
        };
        let dex = noted(dex, "pokedex", unresolved);

        let in_menu = resolve("menu_cursor", &addrs.menu_cursor, any_byte, mem)
            .value()
            .map(|v| v != 0);
        let in_menu = noted(in_menu, "menu_cursor", unresolved);

        GameStatus {
            party,
            money,
            badges,
            playtime,
            items,
            dex,
            in_menu,
        }
    }

    /// Warp sources in priority order, then the registry, then nothing
    fn resolve_exits<M: MemoryView + ?Sized>(
        &mut self,
        mem: &M,
        map_id: Option<MapId>,
        bounds: &Bounds,
    ) -> Vec<Exit> {
        for (candidate, src) in self.layout.warp_sources.iter().enumerate() {
            let count = match mem.byte(src.count) {
                Some(c) if c >= 1 && is_warp_count(c) => c,
                observed => {
                    tracing::debug!(candidate, ?observed, "Warp source count rejected");
                    continue;
                }
            };

            let exits: Option<Vec<Exit>> = (0..u16::from(count))
                .map(|i| {
                    let x = mem.byte(src.entry_x(i)).filter(|v| is_coordinate(*v))?;
                    let y = mem.byte(src.entry_y(i)).filter(|v| is_coordinate(*v))?;
                    let pos = Position::new(i32::from(x), i32::from(y));
                    (bounds.contains(pos) != Some(false)).then_some(Exit {
                        pos,
                        source: ExitSource::Detected { candidate },
                    })
                })
                .collect();

            match exits {
                Some(exits) => {
                    if candidate > 0 {
                        tracing::debug!(candidate, count, "Warps read from fallback source");
                    }
                    return exits;
                }
                None => tracing::debug!(candidate, count, "Warp source entries rejected"),
            }
        }

        let Some(map_id) = map_id else {
            tracing::debug!("No valid warp source and no map id; reporting no exits");
            return Vec::new();
        };
        let table = self.warp_cache.table(&self.registry, map_id);
        match &table.exits {
            Some(exits) => {
                tracing::info!(map = %map_id, count = exits.len(), "Using registry exits");
                exits
                    .iter()
                    .map(|&pos| Exit {
                        pos,
                        source: ExitSource::Registry,
                    })
                    .collect()
            }
            None => {
                tracing::info!(map = %map_id, "No warp source and no registry entry; reporting no exits");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::sim::{GridSim, SIM_FLOOR_BLOCK};
    use crate::memory::snapshot::MemorySnapshot;
    use crate::world::tileset::TilesetMapping;

    const HALL: &str = "
        ########
        #......#
        #......#
        #..@...#
        #......#
        ########
    ";

    const ROOM: &str = "
        #####
        #.W.#
        #.@.#
        #...#
        #####
    ";

    fn snapshot(sim: &mut GridSim) -> MemorySnapshot {
        let layout = sim.layout().clone();
        MemorySnapshot::capture(sim, layout.capture_start, layout.capture_len).unwrap()
    }

    fn builder(tilesets: TilesetRegistry, registry: WarpRegistry, radius: i32) -> WorldBuilder {
        WorldBuilder::new(MemoryLayout::default(), radius, tilesets, registry)
    }

    fn floor_mapping(id: u8) -> TilesetRegistry {
        TilesetRegistry::from_mappings(&[TilesetMapping {
            id,
            walkable: vec![SIM_FLOOR_BLOCK],
            blocked: vec![],
        }])
    }

    fn mapped(state: WorldState) -> LocalMap {
        match state {
            WorldState::Mapped(m) => m,
            other => panic!("expected a local map, got {other:?}"),
        }
    }

    #[test]
    fn test_adjacent_tiles_are_measured() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));

        assert_eq!(map.player, Position::new(2, 2));
        assert_eq!(map.facing, Some(Facing::Known(Direction::Down)));
        for (_, class) in map.movement_legality() {
            assert_eq!(class, TileClass::Walkable(Confidence::Measured));
        }
    }

    #[test]
    fn test_non_adjacent_tiles_unknown_without_mapping() {
        let mut sim = GridSim::from_plan(HALL, MapId::new(1, 1)).unwrap();
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));

        assert_eq!(map.terrain, TerrainSignal::NoMapping { tileset: 0 });
        // Open floor two steps away is still unknown
        assert_eq!(map.classify(Position::new(5, 3)), TileClass::Unknown);
        assert_eq!(map.classify(Position::new(1, 1)), TileClass::Unknown);
        let derived_walkable = map.count(|c| *c == TileClass::Walkable(Confidence::Derived));
        assert_eq!(derived_walkable, 0);
    }

    #[test]
    fn test_established_mapping_yields_derived_tiles() {
        let mut sim = GridSim::from_plan(HALL, MapId::new(1, 1)).unwrap();
        sim.set_tileset(7);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(floor_mapping(7), WarpRegistry::empty(), 2).build(&mem));

        assert_eq!(map.terrain, TerrainSignal::Applied { tileset: 7 });
        assert_eq!(map.classify(Position::new(5, 2)), TileClass::Walkable(Confidence::Derived));
        // Block containing a wall is not in the mapping
        assert_eq!(map.classify(Position::new(1, 1)), TileClass::Unknown);
        // Adjacent stays measured
        assert_eq!(map.classify(Position::new(3, 2)), TileClass::Walkable(Confidence::Measured));
    }

    #[test]
    fn test_mapping_for_other_tileset_is_not_used() {
        let mut sim = GridSim::from_plan(HALL, MapId::new(1, 1)).unwrap();
        sim.set_tileset(3);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(floor_mapping(7), WarpRegistry::empty(), 2).build(&mem));

        assert_eq!(map.terrain, TerrainSignal::NoMapping { tileset: 3 });
        assert_eq!(map.classify(Position::new(5, 2)), TileClass::Unknown);
    }

    #[test]
    fn test_contradicted_mapping_is_dropped() {
        let mut sim = GridSim::from_plan(HALL, MapId::new(1, 1)).unwrap();
        sim.set_tileset(7);
        let mem = snapshot(&mut sim);
        let wrong = TilesetRegistry::from_mappings(&[TilesetMapping {
            id: 7,
            walkable: vec![],
            blocked: vec![SIM_FLOOR_BLOCK],
        }]);
        let map = mapped(builder(wrong, WarpRegistry::empty(), 2).build(&mem));

        assert!(matches!(map.terrain, TerrainSignal::Contradicted { tileset: 7, .. }));
        assert_eq!(map.classify(Position::new(5, 2)), TileClass::Unknown);
        assert_eq!(map.classify(Position::new(3, 2)), TileClass::Walkable(Confidence::Measured));
    }

    #[test]
    fn test_window_clipped_to_bounds() {
        let mut sim = GridSim::from_plan(HALL, MapId::new(1, 1)).unwrap();
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 5).build(&mem));

        assert_eq!(map.bounds, Bounds::Known { width: 8, height: 6 });
        assert_eq!(map.classify(Position::new(-1, 3)), TileClass::OutOfBounds);
        assert_eq!(map.classify(Position::new(3, 6)), TileClass::OutOfBounds);
        assert_eq!(map.classify(Position::new(0, 0)), TileClass::Unknown);
    }

    #[test]
    fn test_bounds_excluding_player_are_not_trusted() {
        let mut sim = GridSim::from_plan(HALL, MapId::new(1, 1)).unwrap();
        let width_addr = sim.layout().map_width[0];
        sim.poke(width_addr, 1);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 5).build(&mem));

        assert!(matches!(map.bounds, Bounds::Unresolved { .. }));
        assert!(map.unresolved.contains(&"map_bounds"));
        assert_eq!(map.count(|c| *c == TileClass::OutOfBounds), 0);
    }

    #[test]
    fn test_unresolved_position_reports_no_tiles() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let x_addr = sim.layout().player_x[0];
        sim.poke(x_addr, 0xFF);
        let mem = snapshot(&mut sim);
        let state = builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem);

        match state {
            WorldState::PositionUnresolved { map_id, unresolved, .. } => {
                assert_eq!(map_id, Some(MapId::new(24, 7)));
                assert_eq!(unresolved, vec!["player_x"]);
            }
            other => panic!("expected unresolved position, got {other:?}"),
        }
    }

    #[test]
    fn test_game_status_reads_progress_fields() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let game = sim.layout().game.clone();
        sim.poke(game.party_count[0], 2);
        sim.poke(game.party_species, 0x9B);
        sim.poke(game.party_species + 1, 0x10);
        for (i, b) in [0x01, 0x23, 0x45].into_iter().enumerate() {
            sim.poke(game.money + i as u16, b);
        }
        sim.poke(game.johto_badges[0], 0b0000_0011);
        sim.poke(game.kanto_badges[0], 0b0000_0001);
        sim.poke(game.playtime, 12);
        sim.poke(game.playtime + 1, 34);
        sim.poke(game.playtime + 2, 56);
        sim.poke(game.item_count[0], 1);
        sim.poke(game.item_id(0), 0x12);
        sim.poke(game.item_quantity(0), 5);
        sim.poke(game.dex_seen[0], 9);
        sim.poke(game.dex_owned[0], 3);
        sim.poke(game.menu_cursor[0], 1);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));

        let status = &map.game;
        assert_eq!(status.party, Some(vec![0x9B, 0x10]));
        assert_eq!(status.money, Some(12_345));
        assert_eq!(status.badges.map(|b| b.total()), Some(3));
        assert_eq!(status.playtime.map(|t| t.to_string()), Some("12:34:56".to_string()));
        assert_eq!(status.items, Some(vec![ItemSlot { id: 0x12, quantity: 5 }]));
        assert_eq!(status.dex, Some(DexCounts { seen: 9, owned: 3 }));
        assert_eq!(status.in_menu, Some(true));
        assert!(map.unresolved.is_empty());
    }

    #[test]
    fn test_invalid_progress_bytes_are_unresolved() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let game = sim.layout().game.clone();
        sim.poke(game.party_count[0], 9);
        sim.poke(game.money + 1, 0x4C);
        sim.poke(game.playtime + 1, 75);
        sim.poke(game.item_count[0], 1);
        sim.poke(game.item_id(0), 0x12);
        // quantity left at zero
        sim.poke(game.dex_seen[0], 2);
        sim.poke(game.dex_owned[0], 5);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));

        let status = &map.game;
        assert_eq!(status.party, None);
        assert_eq!(status.money, None);
        assert_eq!(status.playtime, None);
        assert_eq!(status.items, None);
        assert_eq!(status.dex, None);
        // Zeroed bytes are still valid
        assert_eq!(status.badges, Some(Badges::default()));
        assert_eq!(status.in_menu, Some(false));
        for field in ["party", "money", "playtime", "items", "pokedex"] {
            assert!(map.unresolved.contains(&field), "{field} not reported");
        }
    }

    #[test]
    fn test_game_status_survives_unresolved_position() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let layout = sim.layout().clone();
        sim.poke(layout.player_y[0], 0xFF);
        sim.poke(layout.game.johto_badges[0], 0b1000_0000);
        let mem = snapshot(&mut sim);
        let state = builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem);

        assert!(state.local_map().is_none());
        assert_eq!(state.game().badges.map(|b| b.total()), Some(1));
    }

    #[test]
    fn test_unknown_facing_keeps_raw_byte() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let facing_addr = sim.layout().facing[0];
        sim.poke(facing_addr, 0x1F);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));
        assert_eq!(map.facing, Some(Facing::Unknown { raw: 0x1F }));
    }

    #[test]
    fn test_primary_warp_source_detected() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));
        assert_eq!(
            map.exits,
            vec![Exit {
                pos: Position::new(2, 1),
                source: ExitSource::Detected { candidate: 0 },
            }]
        );
    }

    #[test]
    fn test_second_warp_source_used_when_primary_invalid() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let layout = sim.layout().clone();
        let alt = layout.warp_sources[1];
        sim.poke(layout.warp_sources[0].count, 0);
        sim.poke(alt.count, 1);
        sim.poke(alt.entry_y(0), 1);
        sim.poke(alt.entry_x(0), 3);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));
        assert_eq!(
            map.exits,
            vec![Exit {
                pos: Position::new(3, 1),
                source: ExitSource::Detected { candidate: 1 },
            }]
        );
    }

    #[test]
    fn test_registry_fallback_when_all_sources_invalid() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let layout = sim.layout().clone();
        sim.poke(layout.warp_sources[0].count, 200);
        sim.poke(layout.warp_sources[1].count, 0);
        let mem = snapshot(&mut sim);

        let registry =
            WarpRegistry::from_toml_str("[[maps]]\ngroup = 24\nnumber = 7\nexits = [[7, 0]]\n").unwrap();
        let map = mapped(builder(TilesetRegistry::new(), registry, 2).build(&mem));
        assert_eq!(
            map.exits,
            vec![Exit {
                pos: Position::new(7, 0),
                source: ExitSource::Registry,
            }]
        );

        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));
        assert!(map.exits.is_empty());
    }

    #[test]
    fn test_npcs_block_without_adding_walkable() {
        let plan = "
            #######
            #.....#
            #.@.N.#
            #..N..#
            #######
        ";
        let mut sim = GridSim::from_plan(plan, MapId::new(2, 2)).unwrap();
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));

        assert_eq!(map.npcs.len(), 2);
        assert_eq!(map.classify(Position::new(4, 2)), TileClass::Blocked(Confidence::Derived));
        assert_eq!(map.classify(Position::new(3, 3)), TileClass::Blocked(Confidence::Derived));
        assert_eq!(map.classify(Position::new(1, 1)), TileClass::Unknown);
        assert_eq!(map.classify(Position::new(2, 3)), TileClass::Walkable(Confidence::Measured));
        assert_eq!(map.count(|c| *c == TileClass::Walkable(Confidence::Derived)), 0);
    }

    #[test]
    fn test_status_flags() {
        let mut sim = GridSim::from_plan(ROOM, MapId::new(24, 7)).unwrap();
        let layout = sim.layout().clone();
        sim.poke(layout.dialogue_flags[0], 0x03);
        let mem = snapshot(&mut sim);
        let map = mapped(builder(TilesetRegistry::new(), WarpRegistry::empty(), 2).build(&mem));
        assert_eq!(map.status.dialogue_open, Some(true));
        assert_eq!(map.status.in_battle, Some(false));
    }

    #[test]
    fn test_rebuild_is_identical() {
        let mut sim = GridSim::from_plan(HALL, MapId::new(1, 1)).unwrap();
        sim.set_tileset(7);
        let mem = snapshot(&mut sim);
        let mut b = builder(floor_mapping(7), WarpRegistry::empty(), 3);
        assert_eq!(b.build(&mem), b.build(&mem));
    }
}
