use crate::{CollectionState, boss_requirements::can_defeat};
use doorrando_game::{
    Ability, EntranceId, LocationId, PlayerId, Requirement, RuleSet, WorldGraph,
};

// Reach checks can point at rules that themselves contain reach checks.
// Past this depth a reach check counts as unsatisfied.
const MAX_REACH_DEPTH: usize = 16;

pub struct TraversalContext<'a> {
    pub world: &'a WorldGraph,
    pub state: &'a CollectionState,
    pub player: PlayerId,
}

impl<'a> TraversalContext<'a> {
    pub fn new(world: &'a WorldGraph, state: &'a CollectionState, player: PlayerId) -> Self {
        TraversalContext {
            world,
            state,
            player,
        }
    }

    pub fn satisfies(&self, req: &Requirement) -> bool {
        self.apply_requirement(req, 0)
    }

    pub fn satisfies_rules(&self, rules: &RuleSet) -> bool {
        self.apply_rules(rules, 0)
    }

    pub fn can_reach_location(&self, location: LocationId) -> bool {
        self.reach_location(location, 0)
    }

    pub fn can_reach_entrance(&self, entrance: EntranceId) -> bool {
        self.reach_entrance(entrance, 0)
    }

    fn apply_rules(&self, rules: &RuleSet, depth: usize) -> bool {
        rules
            .terms()
            .iter()
            .all(|req| self.apply_requirement(req, depth))
    }

    fn reach_location(&self, location: LocationId, depth: usize) -> bool {
        let loc = &self.world.locations[location];
        self.state.can_reach_region(loc.parent_region, loc.player)
            && self.apply_rules(&loc.access, depth)
    }

    fn reach_entrance(&self, entrance: EntranceId, depth: usize) -> bool {
        let ent = &self.world.entrances[entrance];
        if !self.state.can_reach_region(ent.parent_region, ent.player) {
            return false;
        }
        self.apply_rules(&ent.access, depth)
            || ent
                .always_allow
                .as_ref()
                .is_some_and(|req| self.apply_requirement(req, depth))
    }

    fn apply_ability(&self, ability: Ability) -> bool {
        let state = self.state;
        let player = self.player;
        match ability {
            Ability::MoonPearl => state.has_moon_pearl(player),
            Ability::Mirror => state.has_mirror(player),
            Ability::Boots => state.has_boots(player),
            Ability::LiftRocks => state.can_lift_rocks(player),
            Ability::LiftHeavyRocks => state.can_lift_heavy_rocks(player),
            Ability::Sword => state.has_sword(player),
            Ability::BeamSword => state.has_beam_sword(player),
            Ability::BluntWeapon => state.has_blunt_weapon(player),
            Ability::FireSource => state.has_fire_source(player),
            Ability::MeltThings => state.can_melt_things(player),
            Ability::ShootArrows => state.can_shoot_arrows(player),
            Ability::KillMostThings => state.can_kill_most_things(player),
            Ability::Bottle => state.has_bottle(player),
            Ability::Flute => state.can_flute(player),
            Ability::MiseryMireMedallion => {
                state.has(&self.world.medallions(player).misery_mire, player, 1)
            }
            Ability::TurtleRockMedallion => {
                state.has(&self.world.medallions(player).turtle_rock, player, 1)
            }
        }
    }

    fn apply_requirement(&self, req: &Requirement, depth: usize) -> bool {
        let state = self.state;
        let player = self.player;
        match req {
            Requirement::Free => true,
            Requirement::Never => false,
            Requirement::Item { item, count } => state.has(item, player, *count),
            Requirement::SmallKey { key, count } => state.has_sm_key(key, player, *count),
            Requirement::Ability(ability) => self.apply_ability(*ability),
            Requirement::Crystals(count) => state.has_crystals(*count, player),
            Requirement::Hearts(count) => state.has_hearts(*count, player),
            Requirement::Magic(amount) => state.can_extend_magic(*amount, player),
            Requirement::CanReachRegion(region) => {
                state.can_reach_region(*region, self.world.regions[*region].player)
            }
            Requirement::CanReachEntrance(entrance) => {
                depth < MAX_REACH_DEPTH && self.reach_entrance(*entrance, depth + 1)
            }
            Requirement::CanReachLocation(location) => {
                depth < MAX_REACH_DEPTH && self.reach_location(*location, depth + 1)
            }
            Requirement::CrystalBarrier { region, color } => state
                .region_colors(*region, self.world.regions[*region].player)
                .contains(*color),
            Requirement::DefeatBoss(boss_ref) => {
                let dungeon = &self.world.dungeons[boss_ref.dungeon];
                match dungeon.bosses.get(&boss_ref.slot) {
                    Some(&boss) => can_defeat(boss, state, dungeon.player),
                    // An empty slot holds a placeholder boss.
                    None => true,
                }
            }
            Requirement::ItemAt {
                location,
                item,
                player,
            } => self.world.locations[*location]
                .item
                .as_ref()
                .is_some_and(|placed| placed.name == *item && placed.player == *player),
            Requirement::Not(inner) => !self.apply_requirement(inner, depth),
            Requirement::And(reqs) => reqs.iter().all(|r| self.apply_requirement(r, depth)),
            Requirement::Or(reqs) => reqs.iter().any(|r| self.apply_requirement(r, depth)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BarrierMask;
    use doorrando_game::{
        Boss, BossRef, BossSlot, CrystalBarrier, PlacedItem, RegionType, RuleTarget,
    };

    fn small_world() -> WorldGraph {
        let mut world = WorldGraph::new(1);
        let menu = world.add_region("Menu", 1, RegionType::Menu);
        let lobby = world.add_region("Lobby", 1, RegionType::Dungeon);
        world.add_entrance("Start", 1, menu, Some(lobby));
        world.add_location("Chest", 1, lobby);
        let dungeon = world.add_dungeon("Tower", 1, "Small Key (Tower)", "Big Key (Tower)");
        world.assign_dungeon(lobby, dungeon);
        world
    }

    #[test]
    fn unknown_items_are_false() {
        let world = small_world();
        let state = CollectionState::new();
        let ctx = TraversalContext::new(&world, &state, 1);
        assert!(!ctx.satisfies(&Requirement::item("Nonexistent Item")));
        assert!(ctx.satisfies(&Requirement::Free));
        assert!(ctx.satisfies(&Requirement::make_not(Requirement::item("Lamp"))));
    }

    #[test]
    fn boss_is_looked_up_at_evaluation_time() {
        let mut world = small_world();
        let dungeon = world.get_dungeon("Tower", 1).unwrap();
        let req = Requirement::DefeatBoss(BossRef {
            dungeon,
            slot: BossSlot::Main,
        });
        let state = CollectionState::new();
        assert!(TraversalContext::new(&world, &state, 1).satisfies(&req));

        world.set_boss(dungeon, BossSlot::Main, Boss::Agahnim);
        assert!(!TraversalContext::new(&world, &state, 1).satisfies(&req));
    }

    #[test]
    fn location_needs_reached_region() {
        let mut world = small_world();
        let chest = world.get_location("Chest", 1).unwrap();
        let lobby = world.get_region("Lobby", 1).unwrap();
        world.set_rule(RuleTarget::Location(chest), Requirement::item("Lamp"));

        let mut state = CollectionState::new();
        state.collect_named("Lamp", 1);
        assert!(!TraversalContext::new(&world, &state, 1).can_reach_location(chest));
        state.mark_region_reachable(lobby, 1, BarrierMask::ORANGE);
        assert!(TraversalContext::new(&world, &state, 1).can_reach_location(chest));
    }

    #[test]
    fn always_allow_opens_entrance() {
        let mut world = small_world();
        let start = world.get_entrance("Start", 1).unwrap();
        let menu = world.get_region("Menu", 1).unwrap();
        world.set_rule(RuleTarget::Entrance(start), Requirement::Never);
        world.set_always_allow(start, Requirement::item("Ocarina"));

        let mut state = CollectionState::new();
        state.mark_region_reachable(menu, 1, BarrierMask::ORANGE);
        assert!(!TraversalContext::new(&world, &state, 1).can_reach_entrance(start));
        state.collect_named("Ocarina", 1);
        assert!(TraversalContext::new(&world, &state, 1).can_reach_entrance(start));
    }

    #[test]
    fn self_referencing_location_terminates() {
        let mut world = small_world();
        let chest = world.get_location("Chest", 1).unwrap();
        let lobby = world.get_region("Lobby", 1).unwrap();
        world.set_rule(
            RuleTarget::Location(chest),
            Requirement::CanReachLocation(chest),
        );
        let mut state = CollectionState::new();
        state.mark_region_reachable(lobby, 1, BarrierMask::ORANGE);
        assert!(!TraversalContext::new(&world, &state, 1).can_reach_location(chest));
    }

    #[test]
    fn crystal_barrier_checks_color() {
        let world = small_world();
        let lobby = world.get_region("Lobby", 1).unwrap();
        let blue = Requirement::CrystalBarrier {
            region: lobby,
            color: CrystalBarrier::Blue,
        };
        let mut state = CollectionState::new();
        state.mark_region_reachable(lobby, 1, BarrierMask::ORANGE);
        assert!(!TraversalContext::new(&world, &state, 1).satisfies(&blue));
        state.mark_region_reachable(lobby, 1, BarrierMask::BOTH);
        assert!(TraversalContext::new(&world, &state, 1).satisfies(&blue));
    }

    #[test]
    fn item_at_checks_placement() {
        let mut world = small_world();
        let chest = world.get_location("Chest", 1).unwrap();
        let req = Requirement::ItemAt {
            location: chest,
            item: "Bombs (10)".to_string(),
            player: 1,
        };
        let state = CollectionState::new();
        assert!(!TraversalContext::new(&world, &state, 1).satisfies(&req));
        world.place_item(chest, PlacedItem::new("Bombs (10)", 1));
        assert!(TraversalContext::new(&world, &state, 1).satisfies(&req));
    }
}
