use anyhow::Result;
use doorrando_game::{
    Combine, DoorKeyRule, Dungeon, EntranceId, LocationId, PlayerId, Requirement, RuleTarget,
    WorldGraph, or_rule,
};
use log::debug;

use crate::settings::{LogicSettings, Mode};

pub const UNIVERSAL_KEY: &str = "Small Key (Universal)";

fn big_key_in(big_key: &str, player: PlayerId, locations: &[LocationId]) -> Requirement {
    Requirement::make_or(
        locations
            .iter()
            .map(|&location| Requirement::ItemAt {
                location,
                item: big_key.to_string(),
                player,
            })
            .collect(),
    )
}

/// Builds the requirement for one side of a key door.
///
/// | allow_small | alternate_small_key | requirement |
/// |---|---|---|
/// | no  | no  | `keys >= n` |
/// | yes | no  | `keys >= n`, or the nominated location holds this key and `keys >= n - 1` |
/// | no  | yes | `keys >= n` with the big key outside the nominated chests, or the big key inside them and `keys >= alt` |
/// | yes | yes | any of the above |
pub fn create_advanced_key_rule(dungeon: &Dungeon, rule: &DoorKeyRule) -> Requirement {
    let player = dungeon.player;
    let small_key = &dungeon.small_key;
    let keys = Requirement::small_key(small_key, rule.small_key_num);

    let allow_small = match (rule.allow_small, rule.small_location) {
        (true, Some(location)) => Some(Requirement::make_and(vec![
            Requirement::ItemAt {
                location,
                item: small_key.clone(),
                player,
            },
            Requirement::small_key(small_key, rule.small_key_num.saturating_sub(1)),
        ])),
        _ => None,
    };

    match rule.alternate_small_key {
        None => match allow_small {
            None => keys,
            Some(relaxed) => Requirement::make_or(vec![keys, relaxed]),
        },
        Some(alternate) => {
            let bk_in_chests = big_key_in(&dungeon.big_key, player, &rule.alternate_big_key_loc);
            let mut options = vec![
                Requirement::make_and(vec![
                    keys,
                    Requirement::make_not(bk_in_chests.clone()),
                ]),
                Requirement::make_and(vec![
                    bk_in_chests,
                    Requirement::small_key(small_key, alternate),
                ]),
            ];
            if let Some(relaxed) = allow_small {
                options.insert(1, relaxed);
            }
            Requirement::make_or(options)
        }
    }
}

fn in_dungeon(world: &WorldGraph, entrance: EntranceId, dungeon_name: &str) -> bool {
    world.regions[world.entrances[entrance].parent_region]
        .dungeon
        .is_some_and(|d| world.dungeons[d].name == dungeon_name)
}

/// Installs small key, big key and key placement rules for every dungeon of
/// `player`. In retro mode every layout door also takes one universal key.
/// Doors of the escape dungeon in standard retro games get no key rule at all.
pub fn add_key_logic_rules(
    world: &mut WorldGraph,
    player: PlayerId,
    settings: &LogicSettings,
    escape_dungeon: &str,
) -> Result<()> {
    let escape_exempt = |world: &WorldGraph, entrance: EntranceId| {
        settings.retro
            && settings.mode == Mode::Standard
            && in_dungeon(world, entrance, escape_dungeon)
    };
    let dungeon_ids: Vec<_> = (0..world.dungeons.len())
        .filter(|&d| world.dungeons[d].player == player)
        .collect();

    for &d in &dungeon_ids {
        let dungeon = world.dungeons[d].clone();
        let key_logic = &dungeon.key_logic;
        for (entrance, rule) in &key_logic.door_rules {
            if escape_exempt(world, *entrance) {
                continue;
            }
            let mut req = create_advanced_key_rule(&dungeon, rule);
            if let Some(opposite) = &rule.opposite {
                req = or_rule(req, create_advanced_key_rule(&dungeon, opposite));
            }
            world.add_rule(RuleTarget::Entrance(*entrance), req, Combine::And);
        }
        for &location in &key_logic.bk_restricted {
            if !world.locations[location].forced_item {
                world.forbid_item(location, &dungeon.big_key, player);
            }
        }
        for &location in &key_logic.sm_restricted {
            world.forbid_item(location, &dungeon.small_key, player);
        }
        for &entrance in &key_logic.bk_doors {
            world.add_rule(
                RuleTarget::Entrance(entrance),
                Requirement::item(&dungeon.big_key),
                Combine::And,
            );
        }
        for &location in &key_logic.bk_chests {
            world.add_rule(
                RuleTarget::Location(location),
                Requirement::item(&dungeon.big_key),
                Combine::And,
            );
        }
        debug!(
            "Key logic for {}: {} door rules",
            dungeon.name,
            key_logic.door_rules.len()
        );
    }

    if settings.retro {
        for &d in &dungeon_ids {
            let layout_doors = world.dungeons[d].key_logic.layout_doors.clone();
            for entrance in layout_doors {
                if !escape_exempt(world, entrance) {
                    world.add_rule(
                        RuleTarget::Entrance(entrance),
                        Requirement::small_key(UNIVERSAL_KEY, 1),
                        Combine::And,
                    );
                }
            }
        }
    }
    Ok(())
}
