//! Game-specific rule data: which entrance or location gets which
//! requirement, per mode and logic level. Loaded once and never mutated.

use std::path::Path;

use anyhow::{Context, Result, bail};
use hashbrown::HashMap;
use json::JsonValue;
use log::info;

use crate::settings::Goal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetName {
    Entrance(String),
    Location(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleOp {
    Set,
    And,
    Or,
    AlwaysAllow,
}

/// Setting-dependent guard on a rule entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    DoorShuffle,
    EntranceShuffle,
    SwampPatchNotRequired,
    Retro,
    CanTakeDamage,
    NotSwordless,
}

#[derive(Clone, Debug)]
pub struct RuleEntry {
    pub target: TargetName,
    pub op: RuleOp,
    pub requires: Option<JsonValue>,
    pub forbid: Vec<String>,
    pub only_item: Option<String>,
    pub when: Option<Condition>,
    pub unless_entrance_flag: Option<String>,
}

/// Rule sections that differ between the normal and inverted world.
#[derive(Clone, Debug, Default)]
pub struct WorldSplit {
    pub common: Vec<RuleEntry>,
    pub non_inverted: Vec<RuleEntry>,
    pub inverted: Vec<RuleEntry>,
}

#[derive(Clone, Debug)]
pub struct DarkRoom {
    pub region: String,
    pub sewer: bool,
    pub entrances: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DarkRoomTables {
    pub lamp: String,
    pub rooms: Vec<DarkRoom>,
    // Lit only by the world light cone of whichever world the room is in.
    pub conditional: Vec<DarkRoom>,
    pub dark_world_entrances: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum RouteOutcome {
    Requires(JsonValue),
    SelfLock,
    Unroutable,
}

#[derive(Clone, Debug)]
pub struct BombShopRoute {
    pub entrances: Vec<String>,
    pub outcome: RouteOutcome,
}

#[derive(Clone, Debug)]
pub struct BombShopTable {
    pub shop_region: String,
    pub target: String,
    pub base: Option<JsonValue>,
    pub routes: Vec<BombShopRoute>,
}

#[derive(Clone, Debug)]
pub struct ZeldaDelivery {
    pub start: String,
    pub goal: String,
    pub location: String,
    pub requires: JsonValue,
    pub pass_through: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct StandardTables {
    pub rules: Vec<RuleEntry>,
    pub escape_dungeon: String,
    pub escape_rule: JsonValue,
    pub escape_locations: Vec<String>,
    pub kill_rooms: Vec<(String, Vec<String>)>,
    pub uncle_location: String,
    pub delivered_event: String,
    pub zelda_delivery: ZeldaDelivery,
    pub delivered_entrances: Vec<String>,
    pub delivered_locations: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct BunnyTables {
    pub impassable_caves: Vec<String>,
    pub impassable_caves_inverted: Vec<String>,
    pub accessible_locations: Vec<String>,
    pub impassable_doors: Vec<String>,
    pub death_mountain_shop: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RuleTables {
    pub helpers: HashMap<String, JsonValue>,
    pub global: Vec<RuleEntry>,
    pub non_inverted: Vec<RuleEntry>,
    pub open: Vec<RuleEntry>,
    pub standard: StandardTables,
    pub inverted: Vec<RuleEntry>,
    pub big_bomb_shop: BombShopTable,
    pub big_bomb_shop_inverted: BombShopTable,
    pub swamp_moat: Vec<RuleEntry>,
    pub doors: Vec<RuleEntry>,
    pub goals: HashMap<Goal, Vec<RuleEntry>>,
    pub swordless: WorldSplit,
    pub no_glitches: WorldSplit,
    pub dark_rooms: DarkRoomTables,
    pub bunny: BunnyTables,
}

fn str_field(json: &JsonValue, key: &str) -> Result<String> {
    Ok(json[key]
        .as_str()
        .with_context(|| format!("expected string field '{key}'"))?
        .to_string())
}

fn str_list(json: &JsonValue, key: &str) -> Result<Vec<String>> {
    let value = &json[key];
    if value.is_null() {
        return Ok(vec![]);
    }
    if !value.is_array() {
        bail!("expected list field '{key}'");
    }
    value
        .members()
        .map(|x| {
            x.as_str()
                .map(|s| s.to_string())
                .with_context(|| format!("expected string in list '{key}'"))
        })
        .collect()
}

fn parse_condition(value: &str) -> Result<Condition> {
    Ok(match value {
        "doorShuffle" => Condition::DoorShuffle,
        "entranceShuffle" => Condition::EntranceShuffle,
        "swampPatchNotRequired" => Condition::SwampPatchNotRequired,
        "retro" => Condition::Retro,
        "canTakeDamage" => Condition::CanTakeDamage,
        "notSwordless" => Condition::NotSwordless,
        _ => bail!("unknown rule condition '{value}'"),
    })
}

fn parse_entry(json: &JsonValue) -> Result<RuleEntry> {
    let target = if let Some(name) = json["entrance"].as_str() {
        TargetName::Entrance(name.to_string())
    } else if let Some(name) = json["location"].as_str() {
        TargetName::Location(name.to_string())
    } else {
        bail!("rule entry needs an 'entrance' or 'location': {}", json.dump());
    };
    let op = match json["op"].as_str().unwrap_or("set") {
        "set" => RuleOp::Set,
        "and" => RuleOp::And,
        "or" => RuleOp::Or,
        "alwaysAllow" => RuleOp::AlwaysAllow,
        other => bail!("unknown rule op '{other}'"),
    };
    let requires = if json["requires"].is_null() {
        None
    } else {
        Some(json["requires"].clone())
    };
    let forbid = if json["forbid"].is_string() {
        vec![str_field(json, "forbid")?]
    } else {
        str_list(json, "forbid")?
    };
    let when = match json["when"].as_str() {
        Some(value) => Some(parse_condition(value)?),
        None => None,
    };
    let entry = RuleEntry {
        target,
        op,
        requires,
        forbid,
        only_item: json["onlyItem"].as_str().map(|s| s.to_string()),
        when,
        unless_entrance_flag: json["unlessEntranceFlag"].as_str().map(|s| s.to_string()),
    };
    if entry.requires.is_none() && entry.forbid.is_empty() && entry.only_item.is_none() {
        bail!("rule entry has no effect: {}", json.dump());
    }
    Ok(entry)
}

fn parse_entries(json: &JsonValue, section: &str) -> Result<Vec<RuleEntry>> {
    let value = &json[section];
    if value.is_null() {
        return Ok(vec![]);
    }
    if !value.is_array() {
        bail!("section '{section}' must be a list");
    }
    value
        .members()
        .map(parse_entry)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("in section '{section}'"))
}

fn parse_split(json: &JsonValue) -> Result<WorldSplit> {
    Ok(WorldSplit {
        common: parse_entries(json, "common")?,
        non_inverted: parse_entries(json, "nonInverted")?,
        inverted: parse_entries(json, "inverted")?,
    })
}

fn parse_dark_room(json: &JsonValue) -> Result<DarkRoom> {
    Ok(DarkRoom {
        region: str_field(json, "region")?,
        sewer: json["sewer"].as_bool().unwrap_or(false),
        entrances: str_list(json, "entrances")?,
        locations: str_list(json, "locations")?,
    })
}

fn parse_dark_rooms(json: &JsonValue) -> Result<DarkRoomTables> {
    Ok(DarkRoomTables {
        lamp: json["lamp"].as_str().unwrap_or("Lamp").to_string(),
        rooms: json["rooms"]
            .members()
            .map(parse_dark_room)
            .collect::<Result<_>>()?,
        conditional: json["conditional"]
            .members()
            .map(parse_dark_room)
            .collect::<Result<_>>()?,
        dark_world_entrances: str_list(json, "darkWorldEntrances")?,
    })
}

fn parse_bomb_shop(json: &JsonValue) -> Result<BombShopTable> {
    let mut routes = vec![];
    for route_json in json["routes"].members() {
        let outcome = if route_json["selfLock"].as_bool() == Some(true) {
            RouteOutcome::SelfLock
        } else if route_json["unroutable"].as_bool() == Some(true) {
            RouteOutcome::Unroutable
        } else if !route_json["requires"].is_null() {
            RouteOutcome::Requires(route_json["requires"].clone())
        } else {
            bail!("bomb shop route without outcome: {}", route_json.dump());
        };
        routes.push(BombShopRoute {
            entrances: str_list(route_json, "entrances")?,
            outcome,
        });
    }
    Ok(BombShopTable {
        shop_region: str_field(json, "shopRegion")?,
        target: str_field(json, "target")?,
        base: if json["base"].is_null() {
            None
        } else {
            Some(json["base"].clone())
        },
        routes,
    })
}

fn parse_standard(json: &JsonValue) -> Result<StandardTables> {
    let mut kill_rooms = vec![];
    for (region, entrances) in json["killRooms"].entries() {
        let names = entrances
            .members()
            .map(|x| x.as_str().map(|s| s.to_string()))
            .collect::<Option<Vec<_>>>()
            .with_context(|| format!("kill room '{region}' must list entrance names"))?;
        kill_rooms.push((region.to_string(), names));
    }
    let delivery = &json["zeldaDelivery"];
    Ok(StandardTables {
        rules: parse_entries(json, "rules")?,
        escape_dungeon: str_field(json, "escapeDungeon")?,
        escape_rule: json["escapeRule"].clone(),
        escape_locations: str_list(json, "escapeLocations")?,
        kill_rooms,
        uncle_location: str_field(json, "uncleLocation")?,
        delivered_event: str_field(json, "deliveredEvent")?,
        zelda_delivery: ZeldaDelivery {
            start: str_field(delivery, "start")?,
            goal: str_field(delivery, "goal")?,
            location: str_field(delivery, "location")?,
            requires: delivery["requires"].clone(),
            pass_through: str_list(delivery, "passThrough")?,
        },
        delivered_entrances: str_list(&json["deliveredGates"], "entrances")?,
        delivered_locations: str_list(&json["deliveredGates"], "locations")?,
    })
}

fn parse_bunny(json: &JsonValue) -> Result<BunnyTables> {
    Ok(BunnyTables {
        impassable_caves: str_list(&json["impassableCaves"], "nonInverted")?,
        impassable_caves_inverted: str_list(&json["impassableCaves"], "inverted")?,
        accessible_locations: str_list(json, "accessibleLocations")?,
        impassable_doors: str_list(json, "impassableDoors")?,
        death_mountain_shop: json["deathMountainShop"].as_str().map(|s| s.to_string()),
    })
}

impl RuleTables {
    pub fn load(path: &Path) -> Result<RuleTables> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read rule tables {}", path.display()))?;
        let tables = Self::parse(&text)
            .with_context(|| format!("Unable to load rule tables {}", path.display()))?;
        info!(
            "Loaded rule tables {}: {} helpers",
            path.display(),
            tables.helpers.len()
        );
        Ok(tables)
    }

    pub fn parse(text: &str) -> Result<RuleTables> {
        let json = json::parse(text)?;
        let mut helpers = HashMap::new();
        for (name, value) in json["helpers"].entries() {
            helpers.insert(name.to_string(), value.clone());
        }
        let mut goals = HashMap::new();
        for (name, value) in json["goals"].entries() {
            let goal: Goal = name
                .parse()
                .ok()
                .with_context(|| format!("unknown goal '{name}' in rule tables"))?;
            let entries = value
                .members()
                .map(parse_entry)
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("in goal '{name}'"))?;
            goals.insert(goal, entries);
        }
        Ok(RuleTables {
            helpers,
            global: parse_entries(&json, "global")?,
            non_inverted: parse_entries(&json, "nonInverted")?,
            open: parse_entries(&json, "open")?,
            standard: parse_standard(&json["standard"]).context("in section 'standard'")?,
            inverted: parse_entries(&json, "inverted")?,
            big_bomb_shop: parse_bomb_shop(&json["bigBombShop"]["nonInverted"])
                .context("in section 'bigBombShop'")?,
            big_bomb_shop_inverted: parse_bomb_shop(&json["bigBombShop"]["inverted"])
                .context("in section 'bigBombShop'")?,
            swamp_moat: parse_entries(&json, "swampMoat")?,
            doors: parse_entries(&json, "doors")?,
            goals,
            swordless: parse_split(&json["swordless"]).context("in section 'swordless'")?,
            no_glitches: parse_split(&json["noGlitches"]).context("in section 'noGlitches'")?,
            dark_rooms: parse_dark_rooms(&json["darkRooms"]).context("in section 'darkRooms'")?,
            bunny: parse_bunny(&json["bunny"]).context("in section 'bunny'")?,
        })
    }
}
