pub mod error;
pub mod requirement;
pub mod world_file;

pub use error::RuleError;
pub use requirement::{
    Ability, BossRef, Combine, ItemRule, ItemRuleSet, Requirement, RuleSet,
};

use anyhow::Result;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, VariantNames};

pub type PlayerId = usize; // Players are numbered from 1
pub type RegionId = usize; // Index into WorldGraph.regions
pub type EntranceId = usize; // Index into WorldGraph.entrances
pub type LocationId = usize; // Index into WorldGraph.locations
pub type DoorId = usize; // Index into WorldGraph.doors
pub type DungeonId = usize; // Index into WorldGraph.dungeons

pub const MENU_REGION: &str = "Menu";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionType {
    Menu,
    LightWorld,
    DarkWorld,
    Cave,
    Dungeon,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum CrystalBarrier {
    Orange,
    Blue,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoorType {
    #[default]
    Normal,
    Interior,
    Spiral,
    Open,
    Hole,
    Warp,
    Ladder,
}

/// Physical kind of the room side a door belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoorKind {
    #[default]
    Normal,
    Dashable,
    Bombable,
    Hidden,
    SmallKey,
    BigKey,
    Trapped,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum BossSlot {
    Main,
    Top,
    Middle,
    Bottom,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Boss {
    ArmosKnights,
    Lanmolas,
    Moldorm,
    HelmasaurKing,
    Arrghus,
    Mothula,
    Blind,
    Kholdstare,
    Vitreous,
    Trinexx,
    Agahnim,
    Agahnim2,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacedItem {
    pub name: String,
    pub player: PlayerId,
}

impl PlacedItem {
    pub fn new(name: &str, player: PlayerId) -> Self {
        PlacedItem {
            name: name.to_string(),
            player,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub player: PlayerId,
    pub kind: RegionType,
    pub is_light_world: bool,
    pub is_dark_world: bool,
    pub entrances: Vec<EntranceId>,
    pub exits: Vec<EntranceId>,
    pub locations: Vec<LocationId>,
    pub dungeon: Option<DungeonId>,
    pub shop: Option<String>,
    pub crystal_switch: bool,
}

#[derive(Clone, Debug)]
pub struct Entrance {
    pub name: String,
    pub player: PlayerId,
    pub parent_region: RegionId,
    pub connected_region: Option<RegionId>,
    pub access: RuleSet,
    pub always_allow: Option<Requirement>,
    pub hide_path: bool,
    pub door: Option<DoorId>,
}

#[derive(Clone, Debug)]
pub struct Location {
    pub name: String,
    pub player: PlayerId,
    pub parent_region: RegionId,
    pub access: RuleSet,
    pub item_rule: ItemRuleSet,
    pub item: Option<PlacedItem>,
    pub forced_item: bool,
    pub event: bool,
}

#[derive(Clone, Debug)]
pub struct Door {
    pub name: String,
    pub player: PlayerId,
    pub entrance: EntranceId,
    pub crystal: Option<CrystalBarrier>,
    pub door_type: DoorType,
    pub kind: DoorKind,
    pub blocked: bool,
    pub entrance_flag: bool,
    pub room_index: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoorKeyRule {
    pub small_key_num: u32,
    pub allow_small: bool,
    pub small_location: Option<LocationId>,
    pub alternate_small_key: Option<u32>,
    pub alternate_big_key_loc: Vec<LocationId>,
    pub opposite: Option<Box<DoorKeyRule>>,
}

#[derive(Clone, Debug, Default)]
pub struct KeyLogic {
    pub door_rules: Vec<(EntranceId, DoorKeyRule)>,
    pub bk_restricted: Vec<LocationId>,
    pub sm_restricted: Vec<LocationId>,
    pub bk_doors: Vec<EntranceId>,
    pub bk_chests: Vec<LocationId>,
    pub layout_doors: Vec<EntranceId>,
}

#[derive(Clone, Debug)]
pub struct Dungeon {
    pub name: String,
    pub player: PlayerId,
    pub regions: Vec<RegionId>,
    pub small_key: String,
    pub big_key: String,
    pub bosses: HashMap<BossSlot, Boss>,
    pub key_logic: KeyLogic,
}

#[derive(Clone, Debug)]
pub struct Medallions {
    pub misery_mire: String,
    pub turtle_rock: String,
}

impl Default for Medallions {
    fn default() -> Self {
        Medallions {
            misery_mire: "Ether".to_string(),
            turtle_rock: "Quake".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleTarget {
    Entrance(EntranceId),
    Location(LocationId),
}

/// Regions, entrances, locations, doors and dungeons of every player, stored
/// in arenas and addressed by index. Names are unique per player.
#[derive(Clone, Debug, Default)]
pub struct WorldGraph {
    pub players: usize,
    pub regions: Vec<Region>,
    pub entrances: Vec<Entrance>,
    pub locations: Vec<Location>,
    pub doors: Vec<Door>,
    pub dungeons: Vec<Dungeon>,
    pub medallions: HashMap<PlayerId, Medallions>,
    region_index: HashMap<(String, PlayerId), RegionId>,
    entrance_index: HashMap<(String, PlayerId), EntranceId>,
    location_index: HashMap<(String, PlayerId), LocationId>,
    door_index: HashMap<(String, PlayerId), DoorId>,
    dungeon_index: HashMap<(String, PlayerId), DungeonId>,
}

impl WorldGraph {
    pub fn new(players: usize) -> Self {
        WorldGraph {
            players,
            ..Default::default()
        }
    }

    pub fn add_region(&mut self, name: &str, player: PlayerId, kind: RegionType) -> RegionId {
        let id = self.regions.len();
        self.regions.push(Region {
            name: name.to_string(),
            player,
            kind,
            is_light_world: kind == RegionType::LightWorld,
            is_dark_world: kind == RegionType::DarkWorld,
            entrances: vec![],
            exits: vec![],
            locations: vec![],
            dungeon: None,
            shop: None,
            crystal_switch: false,
        });
        self.region_index.insert((name.to_string(), player), id);
        id
    }

    /// Adds a directed edge. Both endpoints are updated so that the exit list
    /// of `from` and the entrance list of `to` stay consistent.
    pub fn add_entrance(
        &mut self,
        name: &str,
        player: PlayerId,
        from: RegionId,
        to: Option<RegionId>,
    ) -> EntranceId {
        let id = self.entrances.len();
        self.entrances.push(Entrance {
            name: name.to_string(),
            player,
            parent_region: from,
            connected_region: None,
            access: RuleSet::default(),
            always_allow: None,
            hide_path: false,
            door: None,
        });
        self.regions[from].exits.push(id);
        self.entrance_index.insert((name.to_string(), player), id);
        if let Some(to) = to {
            self.connect(id, to);
        }
        id
    }

    pub fn connect(&mut self, entrance: EntranceId, region: RegionId) {
        if let Some(old) = self.entrances[entrance].connected_region {
            self.regions[old].entrances.retain(|&e| e != entrance);
        }
        self.entrances[entrance].connected_region = Some(region);
        self.regions[region].entrances.push(entrance);
    }

    pub fn add_location(&mut self, name: &str, player: PlayerId, region: RegionId) -> LocationId {
        let id = self.locations.len();
        self.locations.push(Location {
            name: name.to_string(),
            player,
            parent_region: region,
            access: RuleSet::default(),
            item_rule: ItemRuleSet::default(),
            item: None,
            forced_item: false,
            event: false,
        });
        self.regions[region].locations.push(id);
        self.location_index.insert((name.to_string(), player), id);
        id
    }

    pub fn add_door(&mut self, name: &str, player: PlayerId, entrance: EntranceId) -> DoorId {
        let id = self.doors.len();
        self.doors.push(Door {
            name: name.to_string(),
            player,
            entrance,
            crystal: None,
            door_type: DoorType::Normal,
            kind: DoorKind::Normal,
            blocked: false,
            entrance_flag: false,
            room_index: None,
        });
        self.entrances[entrance].door = Some(id);
        self.door_index.insert((name.to_string(), player), id);
        id
    }

    pub fn add_dungeon(
        &mut self,
        name: &str,
        player: PlayerId,
        small_key: &str,
        big_key: &str,
    ) -> DungeonId {
        let id = self.dungeons.len();
        self.dungeons.push(Dungeon {
            name: name.to_string(),
            player,
            regions: vec![],
            small_key: small_key.to_string(),
            big_key: big_key.to_string(),
            bosses: HashMap::new(),
            key_logic: KeyLogic::default(),
        });
        self.dungeon_index.insert((name.to_string(), player), id);
        id
    }

    pub fn assign_dungeon(&mut self, region: RegionId, dungeon: DungeonId) {
        self.regions[region].dungeon = Some(dungeon);
        if !self.dungeons[dungeon].regions.contains(&region) {
            self.dungeons[dungeon].regions.push(region);
        }
    }

    pub fn set_boss(&mut self, dungeon: DungeonId, slot: BossSlot, boss: Boss) {
        self.dungeons[dungeon].bosses.insert(slot, boss);
    }

    pub fn place_item(&mut self, location: LocationId, item: PlacedItem) {
        self.locations[location].item = Some(item);
    }

    pub fn get_region(&self, name: &str, player: PlayerId) -> Result<RegionId, RuleError> {
        self.region_index
            .get(&(name.to_string(), player))
            .copied()
            .ok_or_else(|| RuleError::UnknownRegion {
                name: name.to_string(),
                player,
            })
    }

    pub fn get_entrance(&self, name: &str, player: PlayerId) -> Result<EntranceId, RuleError> {
        self.entrance_index
            .get(&(name.to_string(), player))
            .copied()
            .ok_or_else(|| RuleError::UnknownEntrance {
                name: name.to_string(),
                player,
            })
    }

    pub fn get_location(&self, name: &str, player: PlayerId) -> Result<LocationId, RuleError> {
        self.location_index
            .get(&(name.to_string(), player))
            .copied()
            .ok_or_else(|| RuleError::UnknownLocation {
                name: name.to_string(),
                player,
            })
    }

    pub fn get_door(&self, name: &str, player: PlayerId) -> Result<DoorId, RuleError> {
        self.door_index
            .get(&(name.to_string(), player))
            .copied()
            .ok_or_else(|| RuleError::UnknownDoor {
                name: name.to_string(),
                player,
            })
    }

    pub fn get_dungeon(&self, name: &str, player: PlayerId) -> Result<DungeonId, RuleError> {
        self.dungeon_index
            .get(&(name.to_string(), player))
            .copied()
            .ok_or_else(|| RuleError::UnknownDungeon {
                name: name.to_string(),
                player,
            })
    }

    pub fn player_regions(&self, player: PlayerId) -> impl Iterator<Item = RegionId> + '_ {
        (0..self.regions.len()).filter(move |&r| self.regions[r].player == player)
    }

    pub fn player_locations(&self, player: PlayerId) -> impl Iterator<Item = LocationId> + '_ {
        (0..self.locations.len()).filter(move |&l| self.locations[l].player == player)
    }

    pub fn player_doors(&self, player: PlayerId) -> impl Iterator<Item = DoorId> + '_ {
        (0..self.doors.len()).filter(move |&d| self.doors[d].player == player)
    }

    pub fn medallions(&self, player: PlayerId) -> Medallions {
        self.medallions.get(&player).cloned().unwrap_or_default()
    }

    fn rules_mut(&mut self, target: RuleTarget) -> &mut RuleSet {
        match target {
            RuleTarget::Entrance(id) => &mut self.entrances[id].access,
            RuleTarget::Location(id) => &mut self.locations[id].access,
        }
    }

    pub fn rules(&self, target: RuleTarget) -> &RuleSet {
        match target {
            RuleTarget::Entrance(id) => &self.entrances[id].access,
            RuleTarget::Location(id) => &self.locations[id].access,
        }
    }

    pub fn set_rule(&mut self, target: RuleTarget, req: Requirement) {
        self.rules_mut(target).set(req);
    }

    pub fn add_rule(&mut self, target: RuleTarget, req: Requirement, combine: Combine) {
        self.rules_mut(target).add(req, combine);
    }

    pub fn set_always_allow(&mut self, entrance: EntranceId, req: Requirement) {
        self.entrances[entrance].always_allow = Some(req);
    }

    pub fn forbid_item(&mut self, location: LocationId, item: &str, player: PlayerId) {
        self.add_item_rule(
            location,
            ItemRule::Forbid {
                item: item.to_string(),
                player,
            },
        );
    }

    pub fn add_item_rule(&mut self, location: LocationId, rule: ItemRule) {
        self.locations[location].item_rule.add(rule);
    }
}

pub fn or_rule(a: Requirement, b: Requirement) -> Requirement {
    Requirement::make_or(vec![a, b])
}
