pub mod boss_requirements;
pub mod evaluate;
pub mod helpers;

use doorrando_game::{CrystalBarrier, LocationId, PlacedItem, PlayerId, RegionId};
use hashbrown::{HashMap, HashSet};
use helpers::*;

/// Set of crystal barrier colors a region has been reached with.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BarrierMask(u8);

impl BarrierMask {
    pub const NONE: BarrierMask = BarrierMask(0);
    pub const ORANGE: BarrierMask = BarrierMask(1);
    pub const BLUE: BarrierMask = BarrierMask(2);
    pub const BOTH: BarrierMask = BarrierMask(3);

    pub fn contains(self, color: CrystalBarrier) -> bool {
        let bit = match color {
            CrystalBarrier::Orange => Self::ORANGE.0,
            CrystalBarrier::Blue => Self::BLUE.0,
        };
        self.0 & bit != 0
    }

    pub fn union(self, other: BarrierMask) -> BarrierMask {
        BarrierMask(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Hypothetical game state: items held per player, regions reached so far
/// and locations already swept.
///
/// Everything only grows; there is no way to remove an item:
///
/// ```compile_fail
/// let mut state = doorrando_logic::CollectionState::new();
/// state.collect_named("Lamp", 1);
/// state.uncollect("Lamp", 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CollectionState {
    prog_items: HashMap<(String, PlayerId), u32>,
    reachable_regions: HashMap<PlayerId, HashMap<RegionId, BarrierMask>>,
    collected_locations: HashSet<LocationId>,
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, item: &PlacedItem) {
        self.collect_named(&item.name, item.player);
    }

    /// Adds one copy of an item. Progressive items resolve to the first tier
    /// not yet held; past the last tier they are counted under their own name.
    pub fn collect_named(&mut self, name: &str, player: PlayerId) {
        let resolved = match progressive_tiers(name) {
            Some(tiers) => tiers
                .iter()
                .find(|tier| !self.has(tier, player, 1))
                .map_or(name, |tier| *tier),
            None => name,
        };
        *self
            .prog_items
            .entry((resolved.to_string(), player))
            .or_insert(0) += 1;
    }

    pub fn item_count(&self, item: &str, player: PlayerId) -> u32 {
        self.prog_items
            .get(&(item.to_string(), player))
            .copied()
            .unwrap_or(0)
    }

    pub fn has(&self, item: &str, player: PlayerId, count: u32) -> bool {
        self.item_count(item, player) >= count
    }

    pub fn items_of(&self, player: PlayerId) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.prog_items
            .iter()
            .filter(move |((_, p), _)| *p == player)
            .map(|((name, _), &count)| (name.as_str(), count))
    }

    /// True if this state holds at least as much of every item as `other`.
    pub fn includes(&self, other: &CollectionState) -> bool {
        other
            .prog_items
            .iter()
            .all(|((name, player), &count)| self.has(name, *player, count))
    }

    pub fn has_sm_key(&self, key: &str, player: PlayerId, count: u32) -> bool {
        self.has(key, player, count)
    }

    pub fn has_crystals(&self, count: u32, player: PlayerId) -> bool {
        crystal_count(self, player) >= count
    }

    pub fn has_hearts(&self, count: u32, player: PlayerId) -> bool {
        heart_count(self, player) >= count
    }

    pub fn can_extend_magic(&self, amount: u32, player: PlayerId) -> bool {
        magic_available(self, player) >= amount
    }

    pub fn can_lift_rocks(&self, player: PlayerId) -> bool {
        self.has("Power Glove", player, 1) || self.has("Titans Mitts", player, 1)
    }

    pub fn can_lift_heavy_rocks(&self, player: PlayerId) -> bool {
        self.has("Titans Mitts", player, 1)
    }

    pub fn has_moon_pearl(&self, player: PlayerId) -> bool {
        self.has("Moon Pearl", player, 1)
    }

    pub fn has_mirror(&self, player: PlayerId) -> bool {
        self.has("Magic Mirror", player, 1)
    }

    pub fn has_boots(&self, player: PlayerId) -> bool {
        self.has("Pegasus Boots", player, 1)
    }

    pub fn has_sword(&self, player: PlayerId) -> bool {
        sword_level(self, player) >= 1
    }

    pub fn has_beam_sword(&self, player: PlayerId) -> bool {
        sword_level(self, player) >= 2
    }

    pub fn has_blunt_weapon(&self, player: PlayerId) -> bool {
        self.has_sword(player) || self.has("Hammer", player, 1)
    }

    pub fn has_fire_source(&self, player: PlayerId) -> bool {
        self.has("Fire Rod", player, 1) || self.has("Lamp", player, 1)
    }

    pub fn can_melt_things(&self, player: PlayerId) -> bool {
        self.has("Fire Rod", player, 1) || (self.has("Bombos", player, 1) && self.has_sword(player))
    }

    pub fn can_shoot_arrows(&self, player: PlayerId) -> bool {
        self.has("Bow", player, 1) || self.has("Silver Arrows", player, 1)
    }

    pub fn can_kill_most_things(&self, player: PlayerId) -> bool {
        self.has_blunt_weapon(player)
            || self.has("Cane of Somaria", player, 1)
            || (self.has("Cane of Byrna", player, 1) && self.can_extend_magic(16, player))
            || self.can_shoot_arrows(player)
            || self.has("Fire Rod", player, 1)
    }

    pub fn has_bottle(&self, player: PlayerId) -> bool {
        bottle_count(self, player) >= 1
    }

    pub fn can_flute(&self, player: PlayerId) -> bool {
        self.has("Ocarina", player, 1)
    }

    pub fn can_reach_region(&self, region: RegionId, player: PlayerId) -> bool {
        !self.region_colors(region, player).is_empty()
    }

    pub fn can_reach_blue(&self, region: RegionId, player: PlayerId) -> bool {
        self.region_colors(region, player)
            .contains(CrystalBarrier::Blue)
    }

    pub fn can_reach_orange(&self, region: RegionId, player: PlayerId) -> bool {
        self.region_colors(region, player)
            .contains(CrystalBarrier::Orange)
    }

    pub fn region_colors(&self, region: RegionId, player: PlayerId) -> BarrierMask {
        self.reachable_regions
            .get(&player)
            .and_then(|regions| regions.get(&region))
            .copied()
            .unwrap_or(BarrierMask::NONE)
    }

    pub fn reachable_regions(&self, player: PlayerId) -> impl Iterator<Item = RegionId> + '_ {
        self.reachable_regions
            .get(&player)
            .into_iter()
            .flat_map(|regions| regions.keys().copied())
    }

    /// Records that `region` was reached with the given colors. Returns true
    /// if anything new was recorded.
    pub fn mark_region_reachable(
        &mut self,
        region: RegionId,
        player: PlayerId,
        colors: BarrierMask,
    ) -> bool {
        let entry = self
            .reachable_regions
            .entry(player)
            .or_default()
            .entry(region)
            .or_insert(BarrierMask::NONE);
        let merged = entry.union(colors);
        let changed = merged != *entry;
        *entry = merged;
        changed
    }

    pub fn is_location_collected(&self, location: LocationId) -> bool {
        self.collected_locations.contains(&location)
    }

    /// Marks a location as swept and collects its item. Returns false if it was
    /// already swept.
    pub fn collect_location(&mut self, location: LocationId, item: &PlacedItem) -> bool {
        if !self.collected_locations.insert(location) {
            return false;
        }
        self.collect(item);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progressive_sword_climbs_tiers() {
        let mut state = CollectionState::new();
        assert!(!state.has_sword(1));
        state.collect_named("Progressive Sword", 1);
        assert!(state.has("Fighter Sword", 1, 1));
        assert!(!state.has_beam_sword(1));
        state.collect_named("Progressive Sword", 1);
        assert!(state.has("Master Sword", 1, 1));
        assert!(state.has_beam_sword(1));
    }

    #[test]
    fn items_are_per_player() {
        let mut state = CollectionState::new();
        state.collect(&PlacedItem::new("Moon Pearl", 2));
        assert!(!state.has_moon_pearl(1));
        assert!(state.has_moon_pearl(2));
    }

    #[test]
    fn glove_tiers() {
        let mut state = CollectionState::new();
        state.collect_named("Progressive Glove", 1);
        assert!(state.can_lift_rocks(1));
        assert!(!state.can_lift_heavy_rocks(1));
        state.collect_named("Progressive Glove", 1);
        assert!(state.can_lift_heavy_rocks(1));
    }

    #[test]
    fn region_colors_only_grow() {
        let mut state = CollectionState::new();
        assert!(state.mark_region_reachable(4, 1, BarrierMask::ORANGE));
        assert!(!state.mark_region_reachable(4, 1, BarrierMask::ORANGE));
        assert!(state.can_reach_orange(4, 1));
        assert!(!state.can_reach_blue(4, 1));
        assert!(state.mark_region_reachable(4, 1, BarrierMask::BLUE));
        assert!(state.can_reach_blue(4, 1));
        assert!(state.can_reach_orange(4, 1));
    }

    #[test]
    fn locations_are_collected_once() {
        let mut state = CollectionState::new();
        let event = PlacedItem::new("Beat Agahnim 1", 1);
        assert!(state.collect_location(7, &event));
        assert!(!state.collect_location(7, &event));
        assert_eq!(state.item_count("Beat Agahnim 1", 1), 1);
    }

    #[test]
    fn includes_compares_counts() {
        let mut small = CollectionState::new();
        small.collect_named("Small Key (Escape)", 1);
        let mut big = small.clone();
        assert!(big.includes(&small));
        big.collect_named("Small Key (Escape)", 1);
        assert!(big.includes(&small));
        assert!(!small.includes(&big));
    }
}
