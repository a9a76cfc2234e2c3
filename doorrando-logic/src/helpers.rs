use crate::CollectionState;
use doorrando_game::PlayerId;

pub const SWORD_TIERS: [&str; 4] = ["Fighter Sword", "Master Sword", "Tempered Sword", "Golden Sword"];
pub const GLOVE_TIERS: [&str; 2] = ["Power Glove", "Titans Mitts"];
pub const BOW_TIERS: [&str; 2] = ["Bow", "Silver Arrows"];
pub const SHIELD_TIERS: [&str; 3] = ["Blue Shield", "Red Shield", "Mirror Shield"];

pub const CRYSTALS: [&str; 7] = [
    "Crystal 1",
    "Crystal 2",
    "Crystal 3",
    "Crystal 4",
    "Crystal 5",
    "Crystal 6",
    "Crystal 7",
];

/// Every item and event name a rule may test, besides tiers, crystals and
/// dungeon keys.
pub const ITEM_NAMES: &[&str] = &[
    "Progressive Sword",
    "Progressive Glove",
    "Progressive Bow",
    "Progressive Shield",
    "Progressive Armor",
    "Blue Mail",
    "Red Mail",
    "Blue Boomerang",
    "Red Boomerang",
    "Hookshot",
    "Mushroom",
    "Magic Powder",
    "Fire Rod",
    "Ice Rod",
    "Bombos",
    "Ether",
    "Quake",
    "Lamp",
    "Hammer",
    "Shovel",
    "Ocarina",
    "Bug Catching Net",
    "Book of Mudora",
    "Cane of Somaria",
    "Cane of Byrna",
    "Cape",
    "Magic Mirror",
    "Pegasus Boots",
    "Flippers",
    "Moon Pearl",
    "Magic Upgrade (1/2)",
    "Magic Upgrade (1/4)",
    "Boss Heart Container",
    "Sanctuary Heart Container",
    "Piece of Heart",
    "Single Bomb",
    "Bombs (3)",
    "Bombs (10)",
    "Single Arrow",
    "Arrows (10)",
    "Rupee (1)",
    "Rupees (5)",
    "Rupees (20)",
    "Rupees (50)",
    "Rupees (100)",
    "Rupees (300)",
    "Small Key (Universal)",
    "Triforce",
    "Triforce Piece",
    "Red Pendant",
    "Blue Pendant",
    "Green Pendant",
    "Beat Agahnim 1",
    "Beat Agahnim 2",
    "Zelda Herself",
    "Zelda Delivered",
];

/// Whether `name` is an item the game knows, ignoring dungeon-specific keys.
pub fn is_item_name(name: &str) -> bool {
    ITEM_NAMES.contains(&name)
        || name.starts_with("Bottle")
        || [
            &SWORD_TIERS[..],
            &GLOVE_TIERS[..],
            &BOW_TIERS[..],
            &SHIELD_TIERS[..],
            &CRYSTALS[..],
        ]
            .iter()
            .any(|tiers| tiers.contains(&name))
}

/// Tier list a progressive item resolves through, if it is one.
pub fn progressive_tiers(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "Progressive Sword" => Some(&SWORD_TIERS),
        "Progressive Glove" => Some(&GLOVE_TIERS),
        "Progressive Bow" => Some(&BOW_TIERS),
        "Progressive Shield" => Some(&SHIELD_TIERS),
        _ => None,
    }
}

pub fn sword_level(state: &CollectionState, player: PlayerId) -> usize {
    SWORD_TIERS
        .iter()
        .rposition(|s| state.has(s, player, 1))
        .map_or(0, |i| i + 1)
}

pub fn bottle_count(state: &CollectionState, player: PlayerId) -> u32 {
    state
        .items_of(player)
        .filter(|(name, _)| name.starts_with("Bottle"))
        .map(|(_, count)| count)
        .sum()
}

pub fn crystal_count(state: &CollectionState, player: PlayerId) -> u32 {
    CRYSTALS
        .iter()
        .filter(|c| state.has(c, player, 1))
        .count() as u32
}

/// Heart containers held, counting the three starting hearts.
pub fn heart_count(state: &CollectionState, player: PlayerId) -> u32 {
    let containers = state.item_count("Boss Heart Container", player)
        + state.item_count("Sanctuary Heart Container", player);
    let pieces = state.item_count("Piece of Heart", player);
    3 + containers + pieces / 4
}

/// Magic available from a full meter, with one refill per bottle.
pub fn magic_available(state: &CollectionState, player: PlayerId) -> u32 {
    let base = if state.has("Magic Upgrade (1/4)", player, 1) {
        32
    } else if state.has("Magic Upgrade (1/2)", player, 1) {
        16
    } else {
        8
    };
    base + base * bottle_count(state, player)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_names_cover_tiers_and_bottles() {
        assert!(is_item_name("Titans Mitts"));
        assert!(is_item_name("Crystal 4"));
        assert!(is_item_name("Bottle (Green Potion)"));
        assert!(is_item_name("Beat Agahnim 2"));
        assert!(!is_item_name("Hookshott"));
    }

    #[test]
    fn magic_scales_with_upgrades_and_bottles() {
        let mut state = CollectionState::new();
        assert_eq!(magic_available(&state, 1), 8);
        state.collect_named("Magic Upgrade (1/2)", 1);
        assert_eq!(magic_available(&state, 1), 16);
        state.collect_named("Bottle", 1);
        state.collect_named("Bottle (Red Potion)", 1);
        assert_eq!(bottle_count(&state, 1), 2);
        assert_eq!(magic_available(&state, 1), 48);
    }

    #[test]
    fn hearts_count_pieces_in_fours() {
        let mut state = CollectionState::new();
        for _ in 0..7 {
            state.collect_named("Piece of Heart", 1);
        }
        state.collect_named("Boss Heart Container", 1);
        assert_eq!(heart_count(&state, 1), 5);
    }
}
