//! Grid simulator that speaks the same RAM layout as the real console.
//!
//! Used by tests and by `--sim` runs. It keeps a tile grid, the player, a few
//! NPCs and warps, and after every input rewrites the bytes the world builder
//! reads: position, facing, the four collision bytes, map dimensions, warp
//! and object tables, and the block grid.

use ahash::AHashSet;

use crate::core::error::{PilotError, Result};
use crate::core::types::{Direction, MapId, Position};
use crate::emulator::{Button, Emulator};
use crate::memory::layout::MemoryLayout;

/// Collision byte written for a blocked neighbour
pub const SIM_WALL_COLLISION: u8 = 0x07;
/// Block id written for a block whose four tiles are all floor
pub const SIM_FLOOR_BLOCK: u8 = 0x01;
/// Block id written for any block containing a wall
pub const SIM_WALL_BLOCK: u8 = 0x02;

/// Input event as seen by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Press(Button),
    Release(Button),
    Advance(u32),
}

pub struct GridSim {
    layout: MemoryLayout,
    ram: Vec<u8>,
    width: i32,
    height: i32,
    walls: AHashSet<Position>,
    npcs: Vec<Position>,
    warps: Vec<Position>,
    map_id: MapId,
    tileset: u8,
    player: Position,
    facing: Direction,
    held: Option<Button>,
    held_frames: u32,
    stepped_this_press: bool,
    /// Frames a d-pad button must be held before the player takes a step
    pub frames_per_step: u32,
    /// Every input in arrival order
    pub inputs: Vec<InputEvent>,
    /// Presses that arrived while another button was still held
    pub overlapping_presses: u32,
    /// Moves actually taken, in order
    pub steps_taken: Vec<Direction>,
}

impl GridSim {
    /// Build a room from an ASCII plan.
    ///
    /// `#` wall, `.` floor, `@` player (floor), `W` warp (floor),
    /// `N` NPC (floor the player cannot enter).
    pub fn from_plan(plan: &str, map_id: MapId) -> Result<Self> {
        let rows: Vec<&str> = plan
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        if width == 0 || height == 0 {
            return Err(PilotError::Emulator("empty sim plan".into()));
        }

        let mut walls = AHashSet::new();
        let mut npcs = Vec::new();
        let mut warps = Vec::new();
        let mut player = None;
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let pos = Position::new(x as i32, y as i32);
                match c {
                    '#' => {
                        walls.insert(pos);
                    }
                    '@' => player = Some(pos),
                    'W' => warps.push(pos),
                    'N' => npcs.push(pos),
                    '.' => {}
                    other => {
                        return Err(PilotError::Emulator(format!(
                            "unknown sim plan glyph {other:?} at {pos}"
                        )))
                    }
                }
            }
        }
        let player =
            player.ok_or_else(|| PilotError::Emulator("sim plan has no player '@'".into()))?;

        let layout = MemoryLayout::default();
        let ram = vec![0u8; layout.capture_len as usize];
        let mut sim = Self {
            layout,
            ram,
            width,
            height,
            walls,
            npcs,
            warps,
            map_id,
            tileset: 0,
            player,
            facing: Direction::Down,
            held: None,
            held_frames: 0,
            stepped_this_press: false,
            frames_per_step: 8,
            inputs: Vec::new(),
            overlapping_presses: 0,
            steps_taken: Vec::new(),
        };
        sim.sync_ram();
        Ok(sim)
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn set_tileset(&mut self, tileset: u8) {
        self.tileset = tileset;
        self.sync_ram();
    }

    /// Overwrite one RAM byte, e.g. to simulate a corrupted field.
    ///
    /// The value sticks until the next input rewrites that field.
    pub fn poke(&mut self, addr: u16, value: u8) {
        if let Some(slot) = self.slot(addr) {
            *slot = value;
        }
    }

    pub fn peek(&self, addr: u16) -> Option<u8> {
        let offset = addr.checked_sub(self.layout.capture_start)?;
        self.ram.get(offset as usize).copied()
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.x < self.width
            && pos.y < self.height
            && !self.walls.contains(&pos)
            && !self.npcs.contains(&pos)
    }

    fn slot(&mut self, addr: u16) -> Option<&mut u8> {
        let offset = addr.checked_sub(self.layout.capture_start)?;
        self.ram.get_mut(offset as usize)
    }

    fn write(&mut self, addrs: &[u16], value: u8) {
        if let Some(&addr) = addrs.first() {
            self.poke(addr, value);
        }
    }

    /// Plan width in blocks, rounded up. A plan whose width is not a
    /// multiple of `steps_per_block` reports bounds one partial block wider
    /// than the room; the extra steps are outside the plan and never walkable.
    fn width_blocks(&self) -> i32 {
        let spb = i32::from(self.layout.steps_per_block.max(1));
        (self.width + spb - 1) / spb
    }

    /// Plan height in blocks, rounded up the same way as [`Self::width_blocks`]
    fn height_blocks(&self) -> i32 {
        let spb = i32::from(self.layout.steps_per_block.max(1));
        (self.height + spb - 1) / spb
    }

    fn sync_ram(&mut self) {
        let layout = self.layout.clone();

        self.write(&layout.player_x, self.player.x as u8);
        self.write(&layout.player_y, self.player.y as u8);
        let facing_byte = match self.facing {
            Direction::Down => 0x00,
            Direction::Up => 0x04,
            Direction::Left => 0x08,
            Direction::Right => 0x0C,
        };
        self.write(&layout.facing, facing_byte);
        self.write(&layout.map_group, self.map_id.group);
        self.write(&layout.map_number, self.map_id.number);
        self.write(&layout.map_width, self.width_blocks() as u8);
        self.write(&layout.map_height, self.height_blocks() as u8);

        for dir in Direction::ALL {
            let value = if self.is_walkable(self.player.step(dir)) {
                layout.collision.walkable_value
            } else {
                SIM_WALL_COLLISION
            };
            self.poke(layout.collision.address(dir), value);
        }

        if let Some(src) = layout.warp_sources.first().copied() {
            let warps = self.warps.clone();
            self.poke(src.count, warps.len() as u8);
            for (i, w) in warps.iter().enumerate() {
                self.poke(src.entry_y(i as u16), w.y as u8);
                self.poke(src.entry_x(i as u16), w.x as u8);
            }
        }

        let objects = layout.objects;
        let npcs = self.npcs.clone();
        self.poke(objects.count, npcs.len() as u8);
        for (i, n) in npcs.iter().enumerate() {
            let i = i as u16;
            self.poke(objects.slot(i, objects.sprite_offset), 0x10 + i as u8);
            self.poke(objects.slot(i, objects.y_offset), n.y as u8);
            self.poke(objects.slot(i, objects.x_offset), n.x as u8);
        }

        self.write(&layout.terrain.tileset, self.tileset);
        self.write_blocks(&layout);

        self.write(&layout.dialogue_flags, 0);
        self.write(&layout.battle_mode, 0);
    }

    fn write_blocks(&mut self, layout: &MemoryLayout) {
        let spb = i32::from(layout.steps_per_block.max(1));
        let border = i32::from(layout.terrain.border_blocks);
        let row = self.width_blocks() + 2 * border;
        for by in 0..self.height_blocks() {
            for bx in 0..self.width_blocks() {
                let all_floor = (0..spb).all(|dy| {
                    (0..spb).all(|dx| {
                        let p = Position::new(bx * spb + dx, by * spb + dy);
                        p.x >= self.width || p.y >= self.height || !self.walls.contains(&p)
                    })
                });
                let id = if all_floor {
                    SIM_FLOOR_BLOCK
                } else {
                    SIM_WALL_BLOCK
                };
                let index = (by + border) * row + bx + border;
                let addr = layout.terrain.blocks_base.wrapping_add(index as u16);
                self.poke(addr, id);
            }
        }
    }

    fn try_step(&mut self) {
        let Some(dir) = self.held.and_then(|b| b.direction()) else {
            return;
        };
        if self.stepped_this_press || self.held_frames < self.frames_per_step {
            return;
        }
        self.stepped_this_press = true;
        let target = self.player.step(dir);
        if self.is_walkable(target) {
            self.player = target;
            self.steps_taken.push(dir);
        }
        self.sync_ram();
    }
}

impl Emulator for GridSim {
    fn read_range(&mut self, start: u16, len: u16) -> Result<Vec<u8>> {
        (0..len)
            .map(|i| {
                let addr = start.wrapping_add(i);
                self.peek(addr).ok_or_else(|| {
                    PilotError::Emulator(format!("read outside sim RAM at 0x{addr:04X}"))
                })
            })
            .collect()
    }

    fn press(&mut self, button: Button) -> Result<()> {
        self.inputs.push(InputEvent::Press(button));
        if self.held.is_some() {
            self.overlapping_presses += 1;
        }
        self.held = Some(button);
        self.held_frames = 0;
        self.stepped_this_press = false;
        if let Some(dir) = button.direction() {
            self.facing = dir;
            self.sync_ram();
        }
        Ok(())
    }

    fn release(&mut self, button: Button) -> Result<()> {
        self.inputs.push(InputEvent::Release(button));
        if self.held == Some(button) {
            self.held = None;
        }
        Ok(())
    }

    fn advance(&mut self, frames: u32) -> Result<()> {
        self.inputs.push(InputEvent::Advance(frames));
        if self.held.is_some() {
            self.held_frames = self.held_frames.saturating_add(frames);
            self.try_step();
        }
        Ok(())
    }
}
