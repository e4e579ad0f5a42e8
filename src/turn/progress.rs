//! Exploration bookkeeping across turns

use ahash::AHashSet;
use serde::Serialize;

use crate::core::types::{MapId, Position};
use crate::world::game_status::GameStatus;

/// Counters shown to the decision maker each turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExplorationStats {
    pub tiles_visited: usize,
    pub maps_visited: usize,
    pub steps: u64,
}

/// Progress gain noticed between two status reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Milestone {
    BadgeEarned { total: u32 },
    PartyGrew { size: usize },
    DexOwnedGrew { owned: u8 },
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Milestone::BadgeEarned { total } => write!(f, "badge earned ({total}/16)"),
            Milestone::PartyGrew { size } => write!(f, "party grew to {size}"),
            Milestone::DexOwnedGrew { owned } => write!(f, "Pokédex owned rose to {owned}"),
        }
    }
}

/// Last resolved progress values; the first read only sets the baseline
#[derive(Debug, Default)]
struct ProgressBaseline {
    badges: Option<u32>,
    party: Option<usize>,
    dex_owned: Option<u8>,
}

/// What a single observation added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discovery {
    pub new_tile: bool,
    pub new_map: bool,
}

/// Tracks which (map, tile) pairs the player has stood on.
///
/// Steps count position changes within one map; a map change is not a step.
#[derive(Debug, Default)]
pub struct ExplorationTracker {
    tiles: AHashSet<(MapId, Position)>,
    maps: AHashSet<MapId>,
    last: Option<(MapId, Position)>,
    steps: u64,
    baseline: ProgressBaseline,
    milestones: Vec<Milestone>,
}

impl ExplorationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, map: MapId, pos: Position) -> Discovery {
        let new_map = self.maps.insert(map);
        let new_tile = self.tiles.insert((map, pos));

        if let Some((last_map, last_pos)) = self.last {
            if last_map == map && last_pos != pos {
                self.steps += u64::from(last_pos.manhattan(&pos));
            }
        }
        self.last = Some((map, pos));

        if new_map {
            tracing::info!(map = %map, "Entered new map");
        }
        Discovery { new_tile, new_map }
    }

    /// Compare progress against the last resolved read.
    ///
    /// Only gains count. Unresolved fields keep their previous baseline, and a
    /// drop (party member deposited) lowers it without a milestone.
    pub fn observe_status(&mut self, status: &GameStatus) -> Vec<Milestone> {
        let mut gained = Vec::new();

        if let Some(total) = status.badges.map(|b| b.total()) {
            if self.baseline.badges.is_some_and(|prev| total > prev) {
                gained.push(Milestone::BadgeEarned { total });
            }
            self.baseline.badges = Some(total);
        }
        if let Some(size) = status.party_size() {
            if self.baseline.party.is_some_and(|prev| size > prev) {
                gained.push(Milestone::PartyGrew { size });
            }
            self.baseline.party = Some(size);
        }
        if let Some(owned) = status.dex.map(|d| d.owned) {
            if self.baseline.dex_owned.is_some_and(|prev| owned > prev) {
                gained.push(Milestone::DexOwnedGrew { owned });
            }
            self.baseline.dex_owned = Some(owned);
        }

        for m in &gained {
            tracing::info!(milestone = %m, "Milestone reached");
        }
        self.milestones.extend(gained.iter().copied());
        gained
    }

    /// Every milestone so far, oldest first
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn stats(&self) -> ExplorationStats {
        ExplorationStats {
            tiles_visited: self.tiles.len(),
            maps_visited: self.maps.len(),
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::game_status::{Badges, DexCounts};

    #[test]
    fn test_first_observation_is_new() {
        let mut tracker = ExplorationTracker::new();
        let d = tracker.observe(MapId::new(0, 1), Position::new(3, 3));
        assert!(d.new_tile && d.new_map);
        assert_eq!(tracker.stats().steps, 0);
    }

    #[test]
    fn test_revisit_is_not_new() {
        let mut tracker = ExplorationTracker::new();
        let map = MapId::new(0, 1);
        tracker.observe(map, Position::new(3, 3));
        tracker.observe(map, Position::new(3, 4));
        let d = tracker.observe(map, Position::new(3, 3));
        assert_eq!(d, Discovery::default());
        assert_eq!(
            tracker.stats(),
            ExplorationStats {
                tiles_visited: 2,
                maps_visited: 1,
                steps: 2,
            }
        );
    }

    #[test]
    fn test_same_coordinates_on_other_map_are_new() {
        let mut tracker = ExplorationTracker::new();
        tracker.observe(MapId::new(0, 1), Position::new(2, 2));
        let d = tracker.observe(MapId::new(0, 2), Position::new(2, 2));
        assert!(d.new_tile && d.new_map);
        assert_eq!(tracker.stats().steps, 0);
    }

    fn status(badges: u8, party: usize, owned: u8) -> GameStatus {
        GameStatus {
            party: Some(vec![0x10; party]),
            badges: Some(Badges {
                johto: badges,
                kanto: 0,
            }),
            dex: Some(DexCounts { seen: owned, owned }),
            ..GameStatus::default()
        }
    }

    #[test]
    fn test_first_status_sets_baseline_only() {
        let mut tracker = ExplorationTracker::new();
        assert!(tracker.observe_status(&status(0b11, 2, 4)).is_empty());
        assert!(tracker.milestones().is_empty());
    }

    #[test]
    fn test_badge_gain_is_a_milestone() {
        let mut tracker = ExplorationTracker::new();
        tracker.observe_status(&status(0b001, 1, 1));
        let gained = tracker.observe_status(&status(0b011, 1, 1));
        assert_eq!(gained, vec![Milestone::BadgeEarned { total: 2 }]);
        assert_eq!(gained[0].to_string(), "badge earned (2/16)");
    }

    #[test]
    fn test_party_and_dex_gains_are_milestones() {
        let mut tracker = ExplorationTracker::new();
        tracker.observe_status(&status(0, 1, 1));
        let gained = tracker.observe_status(&status(0, 2, 2));
        assert_eq!(
            gained,
            vec![
                Milestone::PartyGrew { size: 2 },
                Milestone::DexOwnedGrew { owned: 2 },
            ]
        );
        assert_eq!(tracker.milestones().len(), 2);
    }

    #[test]
    fn test_unresolved_status_keeps_baseline() {
        let mut tracker = ExplorationTracker::new();
        tracker.observe_status(&status(0, 1, 1));
        assert!(tracker.observe_status(&GameStatus::default()).is_empty());
        let gained = tracker.observe_status(&status(0, 2, 1));
        assert_eq!(gained, vec![Milestone::PartyGrew { size: 2 }]);
    }

    #[test]
    fn test_party_shrink_is_not_a_milestone() {
        let mut tracker = ExplorationTracker::new();
        tracker.observe_status(&status(0, 3, 1));
        assert!(tracker.observe_status(&status(0, 2, 1)).is_empty());
        let gained = tracker.observe_status(&status(0, 3, 1));
        assert_eq!(gained, vec![Milestone::PartyGrew { size: 3 }]);
    }

    #[test]
    fn test_multi_tile_move_counts_each_step() {
        let mut tracker = ExplorationTracker::new();
        let map = MapId::new(3, 0);
        tracker.observe(map, Position::new(0, 0));
        tracker.observe(map, Position::new(2, 3));
        assert_eq!(tracker.stats().steps, 5);
    }
}
