use std::str::FromStr;

use anyhow::{Context, Result};
use doorrando_game::{
    Ability, BossRef, BossSlot, CrystalBarrier, PlayerId, RegionId, Requirement, RuleError,
    WorldGraph,
};
use doorrando_logic::helpers::is_item_name;
use hashbrown::HashMap;
use json::JsonValue;

use crate::settings::LogicSettings;

/// Where a requirement is being attached. Used to resolve `defeatBoss`
/// without naming the dungeon.
#[derive(Clone, Copy, Default)]
pub struct RequirementContext {
    pub region: Option<RegionId>,
}

/// Turns rule-table JSON into `Requirement` values, resolving every name to
/// an id up front. Helpers are expanded once and cached.
pub struct RequirementParser<'a> {
    world: &'a WorldGraph,
    player: PlayerId,
    settings: &'a LogicSettings,
    helper_json: &'a HashMap<String, JsonValue>,
    // `None` marks a helper that is still being parsed.
    helpers: &'a mut HashMap<String, Option<Requirement>>,
}

fn invalid(msg: String) -> anyhow::Error {
    RuleError::InvalidRequirement(msg).into()
}

impl<'a> RequirementParser<'a> {
    pub fn new(
        world: &'a WorldGraph,
        player: PlayerId,
        settings: &'a LogicSettings,
        helper_json: &'a HashMap<String, JsonValue>,
        helpers: &'a mut HashMap<String, Option<Requirement>>,
    ) -> Self {
        RequirementParser {
            world,
            player,
            settings,
            helper_json,
            helpers,
        }
    }

    fn parse_helper(&mut self, name: &str) -> Result<Requirement> {
        match self.helpers.get(name) {
            Some(Some(req)) => return Ok(req.clone()),
            Some(None) => return Err(RuleError::CircularHelper(name.to_string()).into()),
            None => {}
        }
        let helper_json = self.helper_json;
        let json = helper_json
            .get(name)
            .with_context(|| format!("unknown helper '{name}'"))?;
        self.helpers.insert(name.to_string(), None);
        // Helpers carry no target, so they may not use an implicit dungeon.
        let req = self
            .parse_requirement(json, &RequirementContext::default())
            .with_context(|| format!("in helper '{name}'"))?;
        self.helpers.insert(name.to_string(), Some(req.clone()));
        Ok(req)
    }

    fn parse_requirement_list(
        &mut self,
        json: &JsonValue,
        ctx: &RequirementContext,
    ) -> Result<Vec<Requirement>> {
        if !json.is_array() {
            return Err(invalid(format!("expected list: {}", json.dump())));
        }
        json.members()
            .map(|x| self.parse_requirement(x, ctx))
            .collect()
    }

    fn parse_string(&mut self, value: &str) -> Result<Requirement> {
        Ok(match value {
            "free" => Requirement::Free,
            "never" => Requirement::Never,
            "lamp" => Requirement::item_count("Lamp", self.settings.lamps_needed_for_dark_rooms),
            "canTakeDamage" => {
                if self.settings.can_take_damage {
                    Requirement::Free
                } else {
                    Requirement::Never
                }
            }
            "crystalsForGanon" => Requirement::Crystals(self.settings.crystals_needed_for_ganon),
            "crystalsForGT" => Requirement::Crystals(self.settings.crystals_needed_for_gt),
            _ => {
                if let Ok(ability) = Ability::from_str(value) {
                    Requirement::Ability(ability)
                } else if self.helper_json.contains_key(value) {
                    self.parse_helper(value)?
                } else {
                    Requirement::item(self.known_item(value)?)
                }
            }
        })
    }

    /// Rejects names that are neither game items, this world's dungeon keys
    /// nor events placed in this world.
    fn known_item<'n>(&self, name: &'n str) -> Result<&'n str> {
        let world = self.world;
        let known = is_item_name(name)
            || world
                .dungeons
                .iter()
                .any(|d| d.small_key == name || d.big_key == name)
            || world
                .locations
                .iter()
                .any(|l| l.event && l.item.as_ref().is_some_and(|item| item.name == name));
        if known {
            Ok(name)
        } else {
            Err(RuleError::UnknownItem(name.to_string()).into())
        }
    }

    fn parse_count(json: &JsonValue, what: &str) -> Result<u32> {
        json.as_u32()
            .ok_or_else(|| invalid(format!("{what} needs a count: {}", json.dump())))
    }

    fn parse_named_count(json: &JsonValue, what: &str) -> Result<(String, u32)> {
        if let Some(name) = json.as_str() {
            return Ok((name.to_string(), 1));
        }
        let name = json["name"]
            .as_str()
            .ok_or_else(|| invalid(format!("{what} needs a name: {}", json.dump())))?;
        let count = json["count"].as_u32().unwrap_or(1);
        Ok((name.to_string(), count))
    }

    fn parse_can_reach(&self, json: &JsonValue) -> Result<Requirement> {
        let player = self.player;
        if let Some(name) = json["region"].as_str() {
            Ok(Requirement::CanReachRegion(self.world.get_region(name, player)?))
        } else if let Some(name) = json["entrance"].as_str() {
            Ok(Requirement::CanReachEntrance(
                self.world.get_entrance(name, player)?,
            ))
        } else if let Some(name) = json["location"].as_str() {
            Ok(Requirement::CanReachLocation(
                self.world.get_location(name, player)?,
            ))
        } else {
            Err(invalid(format!("canReach needs a target: {}", json.dump())))
        }
    }

    fn parse_crystal_barrier(&self, json: &JsonValue) -> Result<Requirement> {
        let region_name = json["region"]
            .as_str()
            .ok_or_else(|| invalid(format!("crystalBarrier needs a region: {}", json.dump())))?;
        let region = self.world.get_region(region_name, self.player)?;
        let color = if let Some(door_name) = json["door"].as_str() {
            let door = self.world.get_door(door_name, self.player)?;
            self.world.doors[door]
                .crystal
                .ok_or_else(|| invalid(format!("door '{door_name}' has no crystal barrier")))?
        } else {
            let color = json["color"].as_str().unwrap_or("");
            CrystalBarrier::from_str(color)
                .map_err(|_| invalid(format!("unknown crystal color '{color}'")))?
        };
        Ok(Requirement::CrystalBarrier { region, color })
    }

    fn parse_defeat_boss(&self, json: &JsonValue, ctx: &RequirementContext) -> Result<Requirement> {
        let (dungeon, slot_name) = if let Some(slot) = json.as_str() {
            let region = ctx
                .region
                .ok_or_else(|| invalid("defeatBoss without a target region".to_string()))?;
            let dungeon = self.world.regions[region].dungeon.ok_or_else(|| {
                invalid(format!(
                    "defeatBoss in region '{}' outside any dungeon",
                    self.world.regions[region].name
                ))
            })?;
            (dungeon, slot)
        } else {
            let dungeon_name = json["dungeon"]
                .as_str()
                .ok_or_else(|| invalid(format!("defeatBoss needs a dungeon: {}", json.dump())))?;
            let dungeon = self.world.get_dungeon(dungeon_name, self.player)?;
            (dungeon, json["slot"].as_str().unwrap_or("main"))
        };
        let slot = BossSlot::from_str(slot_name)
            .map_err(|_| invalid(format!("unknown boss slot '{slot_name}'")))?;
        Ok(Requirement::DefeatBoss(BossRef { dungeon, slot }))
    }

    fn parse_item_at(&self, json: &JsonValue) -> Result<Requirement> {
        let location_name = json["location"]
            .as_str()
            .ok_or_else(|| invalid(format!("itemAt needs a location: {}", json.dump())))?;
        let item = json["item"]
            .as_str()
            .ok_or_else(|| invalid(format!("itemAt needs an item: {}", json.dump())))?;
        Ok(Requirement::ItemAt {
            location: self.world.get_location(location_name, self.player)?,
            item: item.to_string(),
            player: json["player"].as_usize().unwrap_or(self.player),
        })
    }

    pub fn parse_requirement(
        &mut self,
        req_json: &JsonValue,
        ctx: &RequirementContext,
    ) -> Result<Requirement> {
        if let Some(value) = req_json.as_str() {
            return self.parse_string(value);
        }
        if req_json.is_array() {
            return Ok(Requirement::make_and(
                self.parse_requirement_list(req_json, ctx)?,
            ));
        }
        if !req_json.is_object() || req_json.len() != 1 {
            return Err(invalid(format!(
                "unrecognized requirement: {}",
                req_json.dump()
            )));
        }
        let (key, value) = req_json
            .entries()
            .next()
            .ok_or_else(|| invalid("empty requirement".to_string()))?;
        match key {
            "and" => Ok(Requirement::make_and(
                self.parse_requirement_list(value, ctx)?,
            )),
            "or" => Ok(Requirement::make_or(
                self.parse_requirement_list(value, ctx)?,
            )),
            "not" => Ok(Requirement::make_not(self.parse_requirement(value, ctx)?)),
            "helper" => {
                let name = value
                    .as_str()
                    .ok_or_else(|| invalid(format!("helper needs a name: {}", value.dump())))?;
                self.parse_helper(name)
            }
            "item" => {
                let (name, count) = Self::parse_named_count(value, "item")?;
                Ok(Requirement::item_count(self.known_item(&name)?, count))
            }
            "smallKey" => {
                let (name, count) = Self::parse_named_count(value, "smallKey")?;
                Ok(Requirement::small_key(&name, count))
            }
            "crystals" => Ok(Requirement::Crystals(Self::parse_count(value, "crystals")?)),
            "hearts" => Ok(Requirement::Hearts(Self::parse_count(value, "hearts")?)),
            "magic" => Ok(Requirement::Magic(Self::parse_count(value, "magic")?)),
            "canReach" => self.parse_can_reach(value),
            "crystalBarrier" => self.parse_crystal_barrier(value),
            "defeatBoss" => self.parse_defeat_boss(value, ctx),
            "itemAt" => self.parse_item_at(value),
            _ => Err(invalid(format!("unknown requirement key '{key}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Goal, LogicLevel, Mode, SwordMode};
    use doorrando_game::RegionType;

    fn world() -> WorldGraph {
        let mut world = WorldGraph::new(1);
        let menu = world.add_region("Menu", 1, RegionType::Menu);
        let lobby = world.add_region("Tower Lobby", 1, RegionType::Dungeon);
        world.add_entrance("Agahnims Tower", 1, menu, Some(lobby));
        let tower = world.add_dungeon("Agahnims Tower", 1, "Small Key (Agahnims Tower)", "");
        world.assign_dungeon(lobby, tower);
        world
    }

    fn settings() -> LogicSettings {
        LogicSettings::new(
            Mode::Open,
            LogicLevel::NoGlitches,
            Goal::Ganon,
            SwordMode::Randomized,
        )
    }

    fn parse(helpers: &str, req: &str) -> Result<Requirement> {
        let world = world();
        let settings = settings();
        let helper_json: HashMap<String, JsonValue> = json::parse(helpers)
            .unwrap()
            .entries()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let mut cache = HashMap::new();
        let mut parser = RequirementParser::new(&world, 1, &settings, &helper_json, &mut cache);
        let ctx = RequirementContext {
            region: world.get_region("Tower Lobby", 1).ok(),
        };
        parser.parse_requirement(&json::parse(req).unwrap(), &ctx)
    }

    #[test]
    fn strings_resolve_in_order() {
        assert_eq!(parse("{}", r#""free""#).unwrap(), Requirement::Free);
        assert_eq!(
            parse("{}", r#""canLiftRocks""#).unwrap(),
            Requirement::Ability(Ability::LiftRocks)
        );
        assert_eq!(
            parse("{}", r#""Hookshot""#).unwrap(),
            Requirement::item("Hookshot")
        );
        assert_eq!(
            parse(r#"{"canCross": ["Hookshot"]}"#, r#""canCross""#).unwrap(),
            Requirement::item("Hookshot")
        );
        assert_eq!(parse("{}", r#""crystalsForGT""#).unwrap(), Requirement::Crystals(7));
    }

    #[test]
    fn misspelled_item_is_fatal() {
        for req in [r#""Hookshott""#, r#"{"item": {"name": "Lampp", "count": 1}}"#] {
            let err = parse("{}", req).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<RuleError>(),
                Some(RuleError::UnknownItem(_))
            ));
        }
        assert_eq!(
            parse("{}", r#""Small Key (Agahnims Tower)""#).unwrap(),
            Requirement::item("Small Key (Agahnims Tower)")
        );
    }

    #[test]
    fn circular_helper_is_fatal() {
        let err = parse(r#"{"a": "b", "b": {"or": ["Lamp", "a"]}}"#, r#""a""#).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RuleError>(),
            Some(&RuleError::CircularHelper("a".to_string()))
        );
    }

    #[test]
    fn unknown_region_is_fatal() {
        let err = parse("{}", r#"{"canReach": {"region": "Nowhere"}}"#).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RuleError>(),
            Some(&RuleError::UnknownRegion {
                name: "Nowhere".to_string(),
                player: 1
            })
        );
    }

    #[test]
    fn defeat_boss_uses_target_dungeon() {
        let req = parse("{}", r#"{"defeatBoss": "main"}"#).unwrap();
        assert_eq!(
            req,
            Requirement::DefeatBoss(BossRef {
                dungeon: 0,
                slot: BossSlot::Main
            })
        );
    }

    #[test]
    fn combinators_normalize() {
        assert_eq!(
            parse("{}", r#"{"or": ["never", "Lamp"]}"#).unwrap(),
            Requirement::item("Lamp")
        );
        assert_eq!(
            parse("{}", r#"{"item": {"name": "Lamp", "count": 0}}"#).unwrap(),
            Requirement::Free
        );
        assert!(parse("{}", r#"{"bogus": 1}"#).is_err());
    }
}
