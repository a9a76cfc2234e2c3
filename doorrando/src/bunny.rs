//! World classification and bunny-transformation rules.
//!
//! A region belongs to the light world, the dark world, both (mixed) or
//! neither. Outside the player's native world Link turns into a bunny unless
//! he holds the Moon Pearl, so exits and locations that a bunny cannot use
//! get a pearl requirement, relaxed for mixed regions by any route that
//! arrives from the native world.

use std::collections::VecDeque;

use anyhow::Result;
use doorrando_game::{
    Ability, Combine, DoorKind, DoorType, EntranceId, PlayerId, Region, RegionId, RegionType,
    Requirement, RuleTarget, WorldGraph,
};
use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::rule_tables::BunnyTables;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorldSide {
    Light,
    Dark,
}

impl WorldSide {
    pub fn mirrored(self) -> WorldSide {
        match self {
            WorldSide::Light => WorldSide::Dark,
            WorldSide::Dark => WorldSide::Light,
        }
    }

    pub fn contains(self, region: &Region) -> bool {
        match self {
            WorldSide::Light => region.is_light_world,
            WorldSide::Dark => region.is_dark_world,
        }
    }

    pub fn is_pure(self, region: &Region) -> bool {
        self.contains(region) && !self.mirrored().contains(region)
    }
}

fn is_world_kind(kind: RegionType) -> bool {
    matches!(
        kind,
        RegionType::LightWorld | RegionType::DarkWorld | RegionType::Menu
    )
}

/// Spreads world membership from overworld regions into the caves and
/// dungeons reachable from them. Overworld regions keep the side their kind
/// gives them; an interior reached from both sides ends up mixed.
pub fn classify_regions(world: &mut WorldGraph, player: PlayerId) {
    let region_ids: Vec<RegionId> = world.player_regions(player).collect();
    for &r in &region_ids {
        let region = &mut world.regions[r];
        if !is_world_kind(region.kind) {
            region.is_light_world = false;
            region.is_dark_world = false;
        }
    }

    for side in [WorldSide::Light, WorldSide::Dark] {
        let seed_kind = match side {
            WorldSide::Light => RegionType::LightWorld,
            WorldSide::Dark => RegionType::DarkWorld,
        };
        let mut visited: HashSet<RegionId> = HashSet::new();
        let mut queue: VecDeque<RegionId> = region_ids
            .iter()
            .copied()
            .filter(|&r| world.regions[r].kind == seed_kind)
            .collect();
        while let Some(r) = queue.pop_front() {
            for &exit in &world.regions[r].exits {
                let Some(next) = world.entrances[exit].connected_region else {
                    continue;
                };
                if is_world_kind(world.regions[next].kind) || !visited.insert(next) {
                    continue;
                }
                queue.push_back(next);
            }
        }
        for r in visited {
            match side {
                WorldSide::Light => world.regions[r].is_light_world = true,
                WorldSide::Dark => world.regions[r].is_dark_world = true,
            }
        }
    }

    let mixed = region_ids
        .iter()
        .filter(|&&r| world.regions[r].is_light_world && world.regions[r].is_dark_world)
        .count();
    debug!("Classified {} regions for player {player}, {mixed} mixed", region_ids.len());
}

/// Builds bunny requirements for regions of one player. `safe` is the side
/// where Link keeps his own form.
pub struct BunnyRules<'a> {
    world: &'a WorldGraph,
    safe: WorldSide,
    cache: HashMap<RegionId, Requirement>,
}

impl<'a> BunnyRules<'a> {
    pub fn new(world: &'a WorldGraph, safe: WorldSide) -> Self {
        BunnyRules {
            world,
            safe,
            cache: HashMap::new(),
        }
    }

    /// Requirement for acting inside `region` as a non-bunny. Path options are
    /// computed on first use and reused afterwards.
    pub fn rule_for(&mut self, region: RegionId) -> Requirement {
        if let Some(req) = self.cache.get(&region) {
            return req.clone();
        }
        let req = Requirement::make_or(
            std::iter::once(Requirement::Ability(Ability::MoonPearl))
                .chain(self.path_options(region))
                .collect(),
        );
        self.cache.insert(region, req.clone());
        req
    }

    /// Walks entrances backward from `start` through mixed regions. Every
    /// entrance whose source is purely on the safe side yields one option:
    /// reaching that entrance plus every rule crossed on the way.
    pub fn path_options(&self, start: RegionId) -> Vec<Requirement> {
        let world = self.world;
        if !self.safe.contains(&world.regions[start]) {
            return vec![];
        }
        let mut options = vec![];
        let mut seen: HashSet<RegionId> = HashSet::new();
        seen.insert(start);
        let mut queue: VecDeque<(RegionId, Vec<Requirement>)> = VecDeque::new();
        queue.push_back((start, vec![]));
        while let Some((current, path)) = queue.pop_front() {
            for &entrance in &world.regions[current].entrances {
                let source = world.entrances[entrance].parent_region;
                if !seen.insert(source) {
                    continue;
                }
                let source_region = &world.regions[source];
                if !self.safe.contains(source_region) {
                    continue;
                }
                let mut new_path = path.clone();
                new_path.push(world.entrances[entrance].access.to_requirement());
                if self.safe.mirrored().contains(source_region) {
                    queue.push_back((source, new_path));
                } else {
                    options.push(path_option(entrance, new_path));
                }
            }
        }
        options
    }
}

fn path_option(entrance: EntranceId, path: Vec<Requirement>) -> Requirement {
    let mut terms = vec![Requirement::CanReachEntrance(entrance)];
    terms.extend(path);
    Requirement::make_and(terms)
}

fn is_bunny_blocking_door(door_type: DoorType, kind: DoorKind) -> bool {
    matches!(door_type, DoorType::Normal | DoorType::Interior)
        && matches!(kind, DoorKind::Dashable | DoorKind::Bombable | DoorKind::Hidden)
}

/// Adds bunny requirements to every exit, door and location a bunny cannot
/// use on the penalized side of `player`'s world.
pub fn set_bunny_rules(
    world: &mut WorldGraph,
    player: PlayerId,
    inverted: bool,
    tables: &BunnyTables,
) -> Result<()> {
    let safe = if inverted {
        WorldSide::Dark
    } else {
        WorldSide::Light
    };
    let penalized = safe.mirrored();
    let cave_names = if inverted {
        &tables.impassable_caves_inverted
    } else {
        &tables.impassable_caves
    };

    let mut additions: Vec<(RuleTarget, RegionId)> = vec![];
    for name in cave_names {
        let region = world.get_region(name, player)?;
        if penalized.contains(&world.regions[region]) {
            for &exit in &world.regions[region].exits {
                additions.push((RuleTarget::Entrance(exit), region));
            }
        }
    }

    if let Some(name) = &tables.death_mountain_shop {
        let region = world.get_region(name, player)?;
        if penalized.contains(&world.regions[region]) {
            if let Some(&entrance) = world.regions[region].entrances.first() {
                additions.push((RuleTarget::Entrance(entrance), region));
            }
        }
    }

    let mut impassable: HashSet<EntranceId> = HashSet::new();
    for name in &tables.impassable_doors {
        let entrance = world.get_entrance(name, player)?;
        impassable.insert(entrance);
        let region = world.entrances[entrance].parent_region;
        if penalized.contains(&world.regions[region]) {
            additions.push((RuleTarget::Entrance(entrance), region));
        }
    }

    for d in world.player_doors(player) {
        let door = &world.doors[d];
        if impassable.contains(&door.entrance)
            || door.blocked
            || !is_bunny_blocking_door(door.door_type, door.kind)
        {
            continue;
        }
        let region = world.entrances[door.entrance].parent_region;
        if penalized.contains(&world.regions[region]) {
            additions.push((RuleTarget::Entrance(door.entrance), region));
        }
    }

    let accessible: HashSet<&str> = tables
        .accessible_locations
        .iter()
        .map(|s| s.as_str())
        .collect();
    for l in world.player_locations(player) {
        let location = &world.locations[l];
        if accessible.contains(location.name.as_str()) {
            continue;
        }
        if penalized.contains(&world.regions[location.parent_region]) {
            additions.push((RuleTarget::Location(l), location.parent_region));
        }
    }

    // Rules are built against the graph as it stands before any bunny rule
    // is installed.
    let rules: Vec<(RuleTarget, Requirement)> = {
        let mut builder = BunnyRules::new(world, safe);
        additions
            .into_iter()
            .map(|(target, region)| (target, builder.rule_for(region)))
            .collect()
    };
    debug!("Adding {} bunny rules for player {player}", rules.len());
    for (target, req) in rules {
        world.add_rule(target, req, Combine::And);
    }
    Ok(())
}
