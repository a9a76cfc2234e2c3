//! Fixed-point reachability over a compiled world.

use doorrando_game::{LocationId, MENU_REGION, PlacedItem, PlayerId, RegionId, WorldGraph};
use doorrando_logic::{BarrierMask, CollectionState, evaluate::TraversalContext};
use hashbrown::HashSet;
use log::debug;

fn propagate_colors(world: &WorldGraph, from: BarrierMask, to: RegionId) -> BarrierMask {
    if world.regions[to].crystal_switch {
        BarrierMask::BOTH
    } else {
        from
    }
}

/// Expands the regions `player` can reach from the menu until nothing new is
/// found. Rules that refer to other regions are re-checked after every pass,
/// so a region reached late can still open an earlier edge.
pub fn update_reachable_regions(world: &WorldGraph, state: &mut CollectionState, player: PlayerId) {
    let Ok(menu) = world.get_region(MENU_REGION, player) else {
        return;
    };
    let start_colors = propagate_colors(world, BarrierMask::ORANGE, menu);
    state.mark_region_reachable(menu, player, start_colors);

    loop {
        let mut modified: HashSet<RegionId> = state.reachable_regions(player).collect();
        let mut any_change = false;
        while !modified.is_empty() {
            let mut sources: Vec<RegionId> = modified.into_iter().collect();
            // Sorted so traversal order does not depend on hashing.
            sources.sort();
            let updates: Vec<(RegionId, BarrierMask)> = {
                let cx = TraversalContext::new(world, state, player);
                sources
                    .iter()
                    .flat_map(|&src| {
                        let colors = state.region_colors(src, player);
                        world.regions[src].exits.iter().filter_map(move |&exit| {
                            let dst = world.entrances[exit].connected_region?;
                            Some((exit, dst, colors))
                        })
                    })
                    .filter(|&(exit, _, _)| cx.can_reach_entrance(exit))
                    .map(|(_, dst, colors)| (dst, propagate_colors(world, colors, dst)))
                    .collect()
            };
            modified = HashSet::new();
            for (dst, colors) in updates {
                if state.mark_region_reachable(dst, player, colors) {
                    modified.insert(dst);
                }
            }
            any_change |= !modified.is_empty();
        }
        if !any_change {
            break;
        }
    }
}

fn reachable_uncollected(
    world: &WorldGraph,
    state: &CollectionState,
    events_only: bool,
) -> Vec<(LocationId, PlacedItem)> {
    let mut found = vec![];
    for (l, location) in world.locations.iter().enumerate() {
        if events_only && !location.event {
            continue;
        }
        let Some(item) = &location.item else {
            continue;
        };
        if state.is_location_collected(l) {
            continue;
        }
        let cx = TraversalContext::new(world, state, location.player);
        if cx.can_reach_location(l) {
            found.push((l, item.clone()));
        }
    }
    found
}

fn sweep(world: &WorldGraph, state: &mut CollectionState, events_only: bool) -> usize {
    let mut collected = 0;
    loop {
        for player in 1..=world.players {
            update_reachable_regions(world, state, player);
        }
        let found = reachable_uncollected(world, state, events_only);
        if found.is_empty() {
            return collected;
        }
        for (l, item) in found {
            if state.collect_location(l, &item) {
                collected += 1;
            }
        }
    }
}

/// Collects every reachable event item, repeating until no further event
/// becomes reachable.
pub fn sweep_for_events(world: &WorldGraph, state: &mut CollectionState) {
    let n = sweep(world, state, true);
    debug!("Swept {n} events");
}

/// Collects every reachable placed item, events included, until a fixed
/// point. Returns the locations that are reachable at the end.
pub fn collect_reachable_items(world: &WorldGraph, state: &mut CollectionState) -> Vec<LocationId> {
    let n = sweep(world, state, false);
    debug!("Collected {n} items");
    reachable_locations(world, state)
}

pub fn reachable_locations(world: &WorldGraph, state: &CollectionState) -> Vec<LocationId> {
    (0..world.locations.len())
        .filter(|&l| can_reach_location(world, state, l))
        .collect()
}

pub fn can_reach_location(world: &WorldGraph, state: &CollectionState, location: LocationId) -> bool {
    let player = world.locations[location].player;
    TraversalContext::new(world, state, player).can_reach_location(location)
}

/// True if a fresh state holding only `item` triggers `event` for `player`.
pub fn item_unlocks_event(
    world: &WorldGraph,
    event: &str,
    player: PlayerId,
    item: &PlacedItem,
) -> bool {
    let mut state = CollectionState::new();
    state.collect(item);
    sweep_for_events(world, &mut state);
    state.has(event, player, 1)
}

/// Whether `item` may be placed at `location`.
pub fn item_rule_allows(world: &WorldGraph, location: LocationId, item: &PlacedItem) -> bool {
    world.locations[location]
        .item_rule
        .allows(item, &|event, player, item| {
            item_unlocks_event(world, event, player, item)
        })
}
