use crate::{
    Boss, BossSlot, CrystalBarrier, DoorKeyRule, DoorKind, DoorType, KeyLogic, Medallions,
    PlacedItem, PlayerId, RegionType, WorldGraph,
};
use anyhow::{Context, Result, ensure};
use hashbrown::HashMap;
use log::info;
use serde::Deserialize;
use std::path::Path;

fn first_player() -> PlayerId {
    1
}

fn one_player() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldFile {
    #[serde(default = "one_player")]
    pub players: usize,
    pub regions: Vec<RegionEntry>,
    pub entrances: Vec<EntranceEntry>,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
    #[serde(default)]
    pub doors: Vec<DoorEntry>,
    #[serde(default)]
    pub dungeons: Vec<DungeonEntry>,
    #[serde(default)]
    pub placements: Vec<PlacementEntry>,
    #[serde(default)]
    pub medallions: Vec<MedallionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionEntry {
    pub name: String,
    #[serde(default = "first_player")]
    pub player: PlayerId,
    pub kind: RegionType,
    pub dungeon: Option<String>,
    pub shop: Option<String>,
    #[serde(default)]
    pub crystal_switch: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntranceEntry {
    pub name: String,
    #[serde(default = "first_player")]
    pub player: PlayerId,
    pub from: String,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntry {
    pub name: String,
    #[serde(default = "first_player")]
    pub player: PlayerId,
    pub region: String,
    // Event locations carry their event item with them.
    pub event: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorEntry {
    pub name: String,
    #[serde(default = "first_player")]
    pub player: PlayerId,
    // Defaults to the entrance with the same name.
    pub entrance: Option<String>,
    pub crystal: Option<CrystalBarrier>,
    #[serde(default)]
    pub door_type: DoorType,
    #[serde(default)]
    pub kind: DoorKind,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub entrance_flag: bool,
    pub room_index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorKeyRuleEntry {
    #[serde(default)]
    pub small_key_num: u32,
    #[serde(default)]
    pub allow_small: bool,
    pub small_location: Option<String>,
    pub alternate_small_key: Option<u32>,
    #[serde(default)]
    pub alternate_big_key_loc: Vec<String>,
    pub opposite: Option<Box<DoorKeyRuleEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyLogicEntry {
    #[serde(default)]
    pub door_rules: Vec<(String, DoorKeyRuleEntry)>,
    #[serde(default)]
    pub bk_restricted: Vec<String>,
    #[serde(default)]
    pub sm_restricted: Vec<String>,
    #[serde(default)]
    pub bk_doors: Vec<String>,
    #[serde(default)]
    pub bk_chests: Vec<String>,
    #[serde(default)]
    pub layout_doors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonEntry {
    pub name: String,
    #[serde(default = "first_player")]
    pub player: PlayerId,
    pub small_key: String,
    pub big_key: String,
    #[serde(default)]
    pub bosses: HashMap<BossSlot, Boss>,
    #[serde(default)]
    pub key_logic: KeyLogicEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementEntry {
    pub location: String,
    #[serde(default = "first_player")]
    pub player: PlayerId,
    pub item: String,
    pub item_player: Option<PlayerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedallionEntry {
    #[serde(default = "first_player")]
    pub player: PlayerId,
    pub misery_mire: String,
    pub turtle_rock: String,
}

impl WorldGraph {
    pub fn load(path: &Path) -> Result<WorldGraph> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read world file {}", path.display()))?;
        let world = Self::from_json_str(&text)
            .with_context(|| format!("unable to load world file {}", path.display()))?;
        info!(
            "Loaded world {}: {} regions, {} entrances, {} locations",
            path.display(),
            world.regions.len(),
            world.entrances.len(),
            world.locations.len()
        );
        Ok(world)
    }

    pub fn from_json_str(text: &str) -> Result<WorldGraph> {
        let file: WorldFile = serde_json::from_str(text)?;
        Self::from_world_file(&file)
    }

    pub fn from_world_file(file: &WorldFile) -> Result<WorldGraph> {
        ensure!(file.players >= 1, "world must have at least one player");
        let mut world = WorldGraph::new(file.players);

        for d in &file.dungeons {
            let id = world.add_dungeon(&d.name, d.player, &d.small_key, &d.big_key);
            for (&slot, &boss) in &d.bosses {
                world.set_boss(id, slot, boss);
            }
        }
        for r in &file.regions {
            ensure!(
                r.player >= 1 && r.player <= file.players,
                "region '{}' belongs to unknown player {}",
                r.name,
                r.player
            );
            let id = world.add_region(&r.name, r.player, r.kind);
            world.regions[id].shop = r.shop.clone();
            world.regions[id].crystal_switch = r.crystal_switch;
            if let Some(dungeon_name) = &r.dungeon {
                let dungeon = world.get_dungeon(dungeon_name, r.player)?;
                world.assign_dungeon(id, dungeon);
            }
        }
        for e in &file.entrances {
            let from = world.get_region(&e.from, e.player)?;
            let to = match &e.to {
                Some(name) => Some(world.get_region(name, e.player)?),
                None => None,
            };
            world.add_entrance(&e.name, e.player, from, to);
        }
        for l in &file.locations {
            let region = world.get_region(&l.region, l.player)?;
            let id = world.add_location(&l.name, l.player, region);
            if let Some(event) = &l.event {
                world.locations[id].event = true;
                world.locations[id].forced_item = true;
                world.place_item(id, PlacedItem::new(event, l.player));
            }
        }
        for d in &file.doors {
            let entrance_name = d.entrance.as_deref().unwrap_or(&d.name);
            let entrance = world.get_entrance(entrance_name, d.player)?;
            let id = world.add_door(&d.name, d.player, entrance);
            let door = &mut world.doors[id];
            door.crystal = d.crystal;
            door.door_type = d.door_type;
            door.kind = d.kind;
            door.blocked = d.blocked;
            door.entrance_flag = d.entrance_flag;
            door.room_index = d.room_index;
        }
        for (dungeon_id, d) in file.dungeons.iter().enumerate() {
            let key_logic = world
                .resolve_key_logic(&d.key_logic, d.player)
                .with_context(|| format!("key logic of dungeon '{}'", d.name))?;
            world.dungeons[dungeon_id].key_logic = key_logic;
        }
        for p in &file.placements {
            let location = world.get_location(&p.location, p.player)?;
            let item_player = p.item_player.unwrap_or(p.player);
            world.place_item(location, PlacedItem::new(&p.item, item_player));
        }
        for m in &file.medallions {
            world.medallions.insert(
                m.player,
                Medallions {
                    misery_mire: m.misery_mire.clone(),
                    turtle_rock: m.turtle_rock.clone(),
                },
            );
        }
        Ok(world)
    }

    fn resolve_door_key_rule(
        &self,
        entry: &DoorKeyRuleEntry,
        player: PlayerId,
    ) -> Result<DoorKeyRule> {
        let small_location = match &entry.small_location {
            Some(name) => Some(self.get_location(name, player)?),
            None => None,
        };
        let alternate_big_key_loc = entry
            .alternate_big_key_loc
            .iter()
            .map(|name| self.get_location(name, player))
            .collect::<Result<Vec<_>, _>>()?;
        let opposite = match &entry.opposite {
            Some(opp) => Some(Box::new(self.resolve_door_key_rule(opp, player)?)),
            None => None,
        };
        Ok(DoorKeyRule {
            small_key_num: entry.small_key_num,
            allow_small: entry.allow_small,
            small_location,
            alternate_small_key: entry.alternate_small_key,
            alternate_big_key_loc,
            opposite,
        })
    }

    fn resolve_key_logic(&self, entry: &KeyLogicEntry, player: PlayerId) -> Result<KeyLogic> {
        let entrances = |names: &[String]| {
            names
                .iter()
                .map(|name| self.get_entrance(name, player))
                .collect::<Result<Vec<_>, _>>()
        };
        let locations = |names: &[String]| {
            names
                .iter()
                .map(|name| self.get_location(name, player))
                .collect::<Result<Vec<_>, _>>()
        };
        let mut door_rules = vec![];
        for (door_name, rule) in &entry.door_rules {
            let entrance = self.get_entrance(door_name, player)?;
            door_rules.push((entrance, self.resolve_door_key_rule(rule, player)?));
        }
        Ok(KeyLogic {
            door_rules,
            bk_restricted: locations(&entry.bk_restricted)?,
            sm_restricted: locations(&entry.sm_restricted)?,
            bk_doors: entrances(&entry.bk_doors)?,
            bk_chests: locations(&entry.bk_chests)?,
            layout_doors: entrances(&entry.layout_doors)?,
        })
    }
}
