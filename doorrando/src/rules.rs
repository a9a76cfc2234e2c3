//! Installs access rules and item rules onto a world for one player.
//!
//! The tables decide which entrance or location gets which requirement; this
//! module decides which tables apply, in which order, and builds the rules
//! that depend on the shape of the graph (escape path, bunny paths, keys).

use std::collections::VecDeque;

use anyhow::Result;
use doorrando_game::{
    Combine, ItemRule, MENU_REGION, PlayerId, RegionId, RegionType, Requirement, RuleError,
    RuleTarget, WorldGraph,
};
use doorrando_logic::{CollectionState, evaluate::TraversalContext};
use hashbrown::{HashMap, HashSet};
use json::JsonValue;
use log::{debug, info, warn};

use crate::bunny::{classify_regions, set_bunny_rules};
use crate::key_logic::add_key_logic_rules;
use crate::requirement_parser::{RequirementContext, RequirementParser};
use crate::rule_tables::{
    BombShopTable, Condition, DarkRoom, RouteOutcome, RuleEntry, RuleOp, RuleTables, TargetName,
    WorldSplit,
};
use crate::settings::{DoorShuffle, LogicLevel, LogicSettings, Mode, SwordMode};

/// Compiles every rule for `player` onto `world`.
///
/// Settings are validated before anything is touched, and the rules are
/// built on a copy of the world that only replaces `world` once compilation
/// succeeded, so an error never leaves a partial rule set installed.
pub fn set_rules(
    world: &mut WorldGraph,
    player: PlayerId,
    settings: &LogicSettings,
    tables: &RuleTables,
) -> Result<()> {
    settings.validate()?;
    let compiler = RuleCompiler::new(world.clone(), player, settings, tables);
    *world = compiler.compile()?;
    Ok(())
}

pub struct RuleCompiler<'a> {
    world: WorldGraph,
    player: PlayerId,
    settings: &'a LogicSettings,
    tables: &'a RuleTables,
    helpers: HashMap<String, Option<Requirement>>,
}

impl<'a> RuleCompiler<'a> {
    pub fn new(
        world: WorldGraph,
        player: PlayerId,
        settings: &'a LogicSettings,
        tables: &'a RuleTables,
    ) -> Self {
        RuleCompiler {
            world,
            player,
            settings,
            tables,
            helpers: HashMap::new(),
        }
    }

    pub fn compile(mut self) -> Result<WorldGraph> {
        let player = self.player;
        let settings = self.settings;
        let tables = self.tables;
        classify_regions(&mut self.world, player);

        if settings.logic == LogicLevel::NoLogic {
            warn!(
                "Player {player} uses no logic: every location counts as reachable and seeds may require major glitches"
            );
            self.hide_menu_exits()?;
            return Ok(self.world);
        }

        // Global rules
        self.hide_menu_exits()?;
        self.apply_entries(&tables.global)?;

        // Mode rules
        if !settings.is_inverted() {
            self.apply_entries(&tables.non_inverted)?;
        }
        match settings.mode {
            Mode::Open => self.apply_entries(&tables.open)?,
            Mode::Standard => self.standard_rules()?,
            Mode::Inverted => {
                self.apply_entries(&tables.open)?;
                self.apply_entries(&tables.inverted)?;
            }
        }
        if settings.is_inverted() {
            self.big_bomb_rules(&tables.big_bomb_shop_inverted)?;
        } else {
            self.big_bomb_rules(&tables.big_bomb_shop)?;
        }
        if !settings.swamp_patch_required {
            self.apply_entries(&tables.swamp_moat)?;
        }

        // Door rules
        let has_doors = self.world.player_doors(player).next().is_some();
        if has_doors || settings.door_shuffle != DoorShuffle::Vanilla {
            self.apply_entries(&tables.doors)?;
        }

        // Goal rules
        match tables.goals.get(&settings.goal) {
            Some(entries) => self.apply_entries(entries)?,
            None => debug!("No goal rules for {:?}", settings.goal),
        }

        // Swordless rules
        if settings.swords == SwordMode::Swordless {
            self.apply_split(&tables.swordless)?;
        }

        // Glitch level restrictions
        match settings.logic {
            LogicLevel::NoGlitches => {
                self.apply_split(&tables.no_glitches)?;
                self.dark_room_rules()?;
            }
            LogicLevel::MinorGlitches => {
                warn!("Minor glitches logic is only partially modeled; reachability checks may be wrong");
            }
            LogicLevel::NoLogic | LogicLevel::OwGlitches | LogicLevel::MajorGlitches => {
                return Err(RuleError::UnsupportedLogic(format!("{:?}", settings.logic)).into());
            }
        }

        add_key_logic_rules(
            &mut self.world,
            player,
            settings,
            &tables.standard.escape_dungeon,
        )?;
        set_bunny_rules(
            &mut self.world,
            player,
            settings.is_inverted(),
            &tables.bunny,
        )?;

        info!("Compiled rules for player {player} ({:?} {:?})", settings.mode, settings.logic);
        Ok(self.world)
    }

    fn hide_menu_exits(&mut self) -> Result<()> {
        let menu = self.world.get_region(MENU_REGION, self.player)?;
        let exits = self.world.regions[menu].exits.clone();
        for exit in exits {
            self.world.entrances[exit].hide_path = true;
        }
        Ok(())
    }

    fn parse(&mut self, json: &JsonValue, ctx: &RequirementContext) -> Result<Requirement> {
        RequirementParser::new(
            &self.world,
            self.player,
            self.settings,
            &self.tables.helpers,
            &mut self.helpers,
        )
        .parse_requirement(json, ctx)
    }

    fn condition_holds(&self, condition: Condition) -> bool {
        let settings = self.settings;
        match condition {
            Condition::DoorShuffle => settings.door_shuffle != DoorShuffle::Vanilla,
            Condition::EntranceShuffle => settings.entrance_shuffle,
            Condition::SwampPatchNotRequired => !settings.swamp_patch_required,
            Condition::Retro => settings.retro,
            Condition::CanTakeDamage => settings.can_take_damage,
            Condition::NotSwordless => settings.swords != SwordMode::Swordless,
        }
    }

    fn resolve_target(&self, target: &TargetName) -> Result<(RuleTarget, RegionId)> {
        Ok(match target {
            TargetName::Entrance(name) => {
                let id = self.world.get_entrance(name, self.player)?;
                (
                    RuleTarget::Entrance(id),
                    self.world.entrances[id].parent_region,
                )
            }
            TargetName::Location(name) => {
                let id = self.world.get_location(name, self.player)?;
                (
                    RuleTarget::Location(id),
                    self.world.locations[id].parent_region,
                )
            }
        })
    }

    pub fn apply_entry(&mut self, entry: &RuleEntry) -> Result<()> {
        if let Some(condition) = entry.when {
            if !self.condition_holds(condition) {
                return Ok(());
            }
        }
        let (target, region) = self.resolve_target(&entry.target)?;
        if let Some(door_name) = &entry.unless_entrance_flag {
            let door = self.world.get_door(door_name, self.player)?;
            if self.world.doors[door].entrance_flag {
                return Ok(());
            }
        }

        if let Some(requires) = &entry.requires {
            let ctx = RequirementContext {
                region: Some(region),
            };
            let req = self.parse(requires, &ctx)?;
            match entry.op {
                RuleOp::Set => self.world.set_rule(target, req),
                RuleOp::And => self.world.add_rule(target, req, Combine::And),
                RuleOp::Or => self.world.add_rule(target, req, Combine::Or),
                RuleOp::AlwaysAllow => match target {
                    RuleTarget::Entrance(entrance) => self.world.set_always_allow(entrance, req),
                    RuleTarget::Location(_) => {
                        return Err(RuleError::InvalidRequirement(format!(
                            "alwaysAllow on location {:?}",
                            entry.target
                        ))
                        .into());
                    }
                },
            }
        }

        if !entry.forbid.is_empty() || entry.only_item.is_some() {
            let RuleTarget::Location(location) = target else {
                return Err(RuleError::InvalidRequirement(format!(
                    "item rule on entrance {:?}",
                    entry.target
                ))
                .into());
            };
            for item in &entry.forbid {
                self.world.forbid_item(location, item, self.player);
            }
            if let Some(item) = &entry.only_item {
                self.world.add_item_rule(
                    location,
                    ItemRule::Only {
                        item: item.clone(),
                        player: self.player,
                    },
                );
            }
        }
        Ok(())
    }

    fn apply_entries(&mut self, entries: &[RuleEntry]) -> Result<()> {
        for entry in entries {
            self.apply_entry(entry)?;
        }
        Ok(())
    }

    fn apply_split(&mut self, split: &WorldSplit) -> Result<()> {
        self.apply_entries(&split.common)?;
        if self.settings.is_inverted() {
            self.apply_entries(&split.inverted)
        } else {
            self.apply_entries(&split.non_inverted)
        }
    }

    fn standard_rules(&mut self) -> Result<()> {
        let player = self.player;
        let tables = self.tables;
        let standard = &tables.standard;
        self.apply_entries(&standard.rules)?;

        let uncle = self.world.get_location(&standard.uncle_location, player)?;
        self.world.add_item_rule(
            uncle,
            ItemRule::UnlocksEvent {
                event: standard.delivered_event.clone(),
                player,
            },
        );

        let escape = self.parse(&standard.escape_rule, &RequirementContext::default())?;
        for name in &standard.escape_locations {
            let location = self.world.get_location(name, player)?;
            self.world
                .add_rule(RuleTarget::Location(location), escape.clone(), Combine::And);
        }
        let dungeon = self.world.get_dungeon(&standard.escape_dungeon, player)?;
        let escape_regions = self.world.dungeons[dungeon].regions.clone();
        for &region in &escape_regions {
            let locations = self.world.regions[region].locations.clone();
            for location in locations {
                self.world
                    .add_rule(RuleTarget::Location(location), escape.clone(), Combine::And);
            }
        }
        for (region_name, entrances) in &standard.kill_rooms {
            let region = self.world.get_region(region_name, player)?;
            if !escape_regions.contains(&region) {
                continue;
            }
            for name in entrances {
                let entrance = self.world.get_entrance(name, player)?;
                self.world
                    .add_rule(RuleTarget::Entrance(entrance), escape.clone(), Combine::And);
            }
        }

        let delivery = &standard.zelda_delivery;
        let path_rules = self.find_delivery_path_rules()?;
        let mut terms = vec![self.parse(&delivery.requires, &RequirementContext::default())?];
        terms.extend(path_rules);
        let drop_off = self.world.get_location(&delivery.location, player)?;
        self.world
            .set_rule(RuleTarget::Location(drop_off), Requirement::make_and(terms));

        let delivered = Requirement::item(&standard.delivered_event);
        for name in &standard.delivered_locations {
            let location = self.world.get_location(name, player)?;
            self.world
                .add_rule(RuleTarget::Location(location), delivered.clone(), Combine::And);
        }
        for name in &standard.delivered_entrances {
            let entrance = self.world.get_entrance(name, player)?;
            self.world
                .add_rule(RuleTarget::Entrance(entrance), delivered.clone(), Combine::And);
        }
        Ok(())
    }

    /// Breadth-first search from the cell block to the sanctuary through
    /// dungeon regions, collecting every edge rule a blank state fails.
    fn find_delivery_path_rules(&self) -> Result<Vec<Requirement>> {
        let world = &self.world;
        let delivery = &self.tables.standard.zelda_delivery;
        let start = world.get_region(&delivery.start, self.player)?;
        let goal = world.get_region(&delivery.goal, self.player)?;
        let pass_through: HashSet<RegionId> = delivery
            .pass_through
            .iter()
            .map(|name| world.get_region(name, self.player))
            .collect::<Result<_, _>>()?;

        let blank_state = CollectionState::new();
        let cx = TraversalContext::new(world, &blank_state, self.player);
        let mut visited: HashSet<RegionId> = HashSet::new();
        visited.insert(start);
        let mut queue: VecDeque<(RegionId, Vec<Requirement>)> = VecDeque::new();
        queue.push_back((start, vec![]));
        while let Some((region, path_rules)) = queue.pop_front() {
            for &exit in &world.regions[region].exits {
                let Some(next) = world.entrances[exit].connected_region else {
                    continue;
                };
                let valid = !visited.contains(&next)
                    && (world.regions[next].kind == RegionType::Dungeon
                        || pass_through.contains(&next));
                if !valid {
                    continue;
                }
                let access = &world.entrances[exit].access;
                let mut rules = path_rules.clone();
                if !cx.satisfies_rules(access) {
                    rules.push(access.to_requirement());
                }
                if next == goal {
                    debug!("Zelda delivery path needs {} rules", rules.len());
                    return Ok(rules);
                }
                visited.insert(next);
                queue.push_back((next, rules));
            }
        }
        Err(RuleError::NoLogicFound {
            entrance: delivery.start.clone(),
            target: delivery.goal.clone(),
        }
        .into())
    }

    fn big_bomb_rules(&mut self, table: &BombShopTable) -> Result<()> {
        let player = self.player;
        let shop = self.world.get_region(&table.shop_region, player)?;
        let target = self.world.get_entrance(&table.target, player)?;
        let Some(&shop_entrance) = self.world.regions[shop].entrances.first() else {
            return Err(RuleError::NoLogicFound {
                entrance: table.shop_region.clone(),
                target: table.target.clone(),
            }
            .into());
        };
        let entrance_name = self.world.entrances[shop_entrance].name.clone();
        let ctx = RequirementContext {
            region: Some(self.world.entrances[target].parent_region),
        };

        if let Some(base) = &table.base {
            let req = self.parse(base, &ctx)?;
            self.world.set_rule(RuleTarget::Entrance(target), req);
        }

        let route = table
            .routes
            .iter()
            .find(|route| route.entrances.iter().any(|e| *e == entrance_name));
        let no_logic = || RuleError::NoLogicFound {
            entrance: entrance_name.clone(),
            target: table.target.clone(),
        };
        match route.map(|r| &r.outcome) {
            Some(RouteOutcome::Requires(json)) => {
                let req = self.parse(json, &ctx)?;
                self.world
                    .add_rule(RuleTarget::Entrance(target), req, Combine::And);
            }
            Some(RouteOutcome::SelfLock) => {
                self.world
                    .set_rule(RuleTarget::Entrance(target), Requirement::Never);
            }
            Some(RouteOutcome::Unroutable) | None => return Err(no_logic().into()),
        }
        debug!("Big bomb shop behind '{entrance_name}'");
        Ok(())
    }

    fn world_has_dark_entrance(&self, region: RegionId) -> bool {
        let names = &self.tables.dark_rooms.dark_world_entrances;
        self.world.regions[region]
            .entrances
            .iter()
            .any(|&e| names.contains(&self.world.entrances[e].name))
    }

    /// A lamp is needed unless the light cone of the world the room sits in
    /// is enabled.
    fn add_conditional_lamp(&mut self, room: &DarkRoom) -> Result<()> {
        let player = self.player;
        let region = self.world.get_region(&room.region, player)?;
        let lit = if self.world_has_dark_entrance(region) {
            self.settings.dark_world_light_cone
        } else {
            self.settings.light_world_light_cone
        };
        if lit {
            return Ok(());
        }
        let lamp = Requirement::item_count(
            &self.tables.dark_rooms.lamp,
            self.settings.lamps_needed_for_dark_rooms,
        );
        for name in &room.entrances {
            let entrance = self.world.get_entrance(name, player)?;
            self.world
                .add_rule(RuleTarget::Entrance(entrance), lamp.clone(), Combine::And);
        }
        for name in &room.locations {
            let location = self.world.get_location(name, player)?;
            self.world
                .add_rule(RuleTarget::Location(location), lamp.clone(), Combine::And);
        }
        Ok(())
    }

    /// With crossed doors the sewer cone follows the escape dungeon's rooms
    /// wherever they ended up, otherwise the rooms flagged as sewers.
    fn in_sewer_cone(&self, room: &DarkRoom) -> Result<bool> {
        if self.settings.door_shuffle != DoorShuffle::Crossed {
            return Ok(room.sewer);
        }
        let region = self.world.get_region(&room.region, self.player)?;
        Ok(self.world.regions[region]
            .dungeon
            .is_some_and(|d| self.world.dungeons[d].name == self.tables.standard.escape_dungeon))
    }

    fn dark_room_rules(&mut self) -> Result<()> {
        let tables = self.tables;
        let sewer_lit = self.settings.sewer_light_cone();
        let mut dark = 0;
        for room in &tables.dark_rooms.rooms {
            if sewer_lit && self.in_sewer_cone(room)? {
                continue;
            }
            self.add_conditional_lamp(room)?;
            dark += 1;
        }
        for room in &tables.dark_rooms.conditional {
            self.add_conditional_lamp(room)?;
        }
        debug!(
            "{dark} of {} dark rooms need light",
            tables.dark_rooms.rooms.len()
        );
        Ok(())
    }
}
