use doorrando::settings::{DoorShuffle, Goal, LogicLevel, Mode, SwordMode};
use doorrando::traverse::{reachable_locations, update_reachable_regions};
use doorrando::{LogicSettings, RuleTables, set_rules};
use doorrando_game::{
    Ability, Combine, LocationId, MENU_REGION, RegionType, Requirement, RuleError, RuleTarget,
    WorldGraph, or_rule,
};
use doorrando_logic::{CollectionState, evaluate::TraversalContext, helpers::CRYSTALS};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};

const WORLD: &str = include_str!("../../data/world.json");
const RULES: &str = include_str!("../../data/rules.json");

fn load() -> (WorldGraph, RuleTables) {
    let world = WorldGraph::from_json_str(WORLD).unwrap();
    let tables = RuleTables::parse(RULES).unwrap();
    (world, tables)
}

fn compiled(settings: &LogicSettings) -> WorldGraph {
    let (mut world, tables) = load();
    set_rules(&mut world, 1, settings, &tables).unwrap();
    world
}

fn rule_snapshot(world: &WorldGraph) -> Vec<Requirement> {
    let entrances = (0..world.entrances.len()).map(|e| RuleTarget::Entrance(e));
    let locations = (0..world.locations.len()).map(|l| RuleTarget::Location(l));
    entrances
        .chain(locations)
        .map(|target| world.rules(target).to_requirement())
        .collect()
}

fn reachable_with(world: &WorldGraph, items: &[&str]) -> Vec<LocationId> {
    let mut state = CollectionState::new();
    for item in items {
        state.collect_named(item, 1);
    }
    update_reachable_regions(world, &mut state, 1);
    reachable_locations(world, &state)
}

#[test]
fn all_supported_settings_compile() {
    let logic_levels = [
        LogicLevel::NoGlitches,
        LogicLevel::MinorGlitches,
        LogicLevel::NoLogic,
    ];
    let goals = [
        Goal::Ganon,
        Goal::Crystals,
        Goal::Dungeons,
        Goal::Pedestal,
        Goal::TriforceHunt,
    ];
    let swords = [SwordMode::Randomized, SwordMode::Swordless];
    for mode in [Mode::Open, Mode::Standard, Mode::Inverted] {
        for logic in logic_levels {
            for goal in goals {
                for sword_mode in swords {
                    for retro in [false, true] {
                        let mut settings = LogicSettings::new(mode, logic, goal, sword_mode);
                        settings.retro = retro;
                        let (mut world, tables) = load();
                        let result = set_rules(&mut world, 1, &settings, &tables);
                        assert!(result.is_ok(), "{settings:?}: {result:?}");
                    }
                }
            }
        }
    }
}

#[test]
fn door_shuffle_compiles() {
    for door_shuffle in [DoorShuffle::Basic, DoorShuffle::Crossed] {
        let mut settings = LogicSettings::new(
            Mode::Standard,
            LogicLevel::NoGlitches,
            Goal::Ganon,
            SwordMode::Randomized,
        );
        settings.door_shuffle = door_shuffle;
        compiled(&settings);
    }
}

#[test]
fn glitched_logic_is_rejected_without_changes() {
    let (mut world, tables) = load();
    let before = rule_snapshot(&world);
    for logic in [LogicLevel::OwGlitches, LogicLevel::MajorGlitches] {
        let settings = LogicSettings::new(Mode::Open, logic, Goal::Ganon, SwordMode::Randomized);
        let err = set_rules(&mut world, 1, &settings, &tables).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RuleError>(),
            Some(RuleError::UnsupportedLogic(_))
        ));
        assert_eq!(rule_snapshot(&world), before);
    }
}

#[test]
fn failed_compile_leaves_world_untouched() {
    let (mut world, _) = load();
    let before = rule_snapshot(&world);
    let broken = RULES.replace(
        r#"{"location": "Spectacle Rock", "requires": "hasMirror"}"#,
        r#"{"location": "Spectacle Rock", "requires": {"canReach": {"region": "Lost Woods"}}}"#,
    );
    assert_ne!(broken, RULES);
    let tables = RuleTables::parse(&broken).unwrap();
    let settings = LogicSettings::new(
        Mode::Open,
        LogicLevel::NoGlitches,
        Goal::Ganon,
        SwordMode::Randomized,
    );
    let err = set_rules(&mut world, 1, &settings, &tables).unwrap_err();
    assert_eq!(
        err.downcast_ref::<RuleError>(),
        Some(&RuleError::UnknownRegion {
            name: "Lost Woods".to_string(),
            player: 1
        })
    );
    assert_eq!(rule_snapshot(&world), before);
}

#[test]
fn compile_is_deterministic() {
    for mode in [Mode::Open, Mode::Standard, Mode::Inverted] {
        let settings =
            LogicSettings::new(mode, LogicLevel::NoGlitches, Goal::Ganon, SwordMode::Randomized);
        let a = compiled(&settings);
        let b = compiled(&settings);
        assert_eq!(rule_snapshot(&a), rule_snapshot(&b));
        assert_eq!(reachable_with(&a, &["Lamp"]), reachable_with(&b, &["Lamp"]));
    }
}

#[test]
fn no_logic_installs_no_access_rules() {
    let settings = LogicSettings::new(
        Mode::Open,
        LogicLevel::NoLogic,
        Goal::Ganon,
        SwordMode::Randomized,
    );
    let world = compiled(&settings);
    assert!(rule_snapshot(&world).iter().all(|req| *req == Requirement::Free));
    let menu = world.get_region(MENU_REGION, 1).unwrap();
    assert!(
        world.regions[menu]
            .exits
            .iter()
            .all(|&e| world.entrances[e].hide_path)
    );
}

#[test]
fn reachability_is_monotone_in_items() {
    let (world, _) = load();
    let pool: Vec<String> = world
        .locations
        .iter()
        .filter(|l| !l.event)
        .filter_map(|l| l.item.as_ref().map(|item| item.name.clone()))
        .collect();
    let mut rng = StdRng::seed_from_u64(0);
    for mode in [Mode::Open, Mode::Standard, Mode::Inverted] {
        let settings =
            LogicSettings::new(mode, LogicLevel::NoGlitches, Goal::Ganon, SwordMode::Randomized);
        let world = compiled(&settings);
        for _ in 0..20 {
            let mut items: Vec<&str> = pool
                .iter()
                .filter(|_| rng.gen_bool(0.3))
                .map(|s| s.as_str())
                .collect();
            let smaller = reachable_with(&world, &items);
            for _ in 0..3 {
                if let Some(extra) = pool.choose(&mut rng) {
                    items.push(extra);
                }
            }
            let larger = reachable_with(&world, &items);
            for location in &smaller {
                assert!(
                    larger.contains(location),
                    "{:?}: '{}' lost after collecting more items",
                    mode,
                    world.locations[*location].name
                );
            }
        }
    }
}

#[test]
fn and_combination_is_order_independent() {
    let mut world = WorldGraph::new(1);
    let menu = world.add_region(MENU_REGION, 1, RegionType::Menu);
    let room = world.add_region("Room", 1, RegionType::Cave);
    let a = world.add_entrance("Door A", 1, menu, Some(room));
    let b = world.add_entrance("Door B", 1, menu, Some(room));
    let names = ["Hammer", "Lamp", "Hookshot", "Flippers"];
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..50 {
        let x = Requirement::item(names.choose(&mut rng).unwrap());
        let y = Requirement::make_or(vec![
            Requirement::item(names.choose(&mut rng).unwrap()),
            Requirement::item(names.choose(&mut rng).unwrap()),
        ]);
        world.set_rule(RuleTarget::Entrance(a), Requirement::Free);
        world.set_rule(RuleTarget::Entrance(b), Requirement::Free);
        world.add_rule(RuleTarget::Entrance(a), x.clone(), Combine::And);
        world.add_rule(RuleTarget::Entrance(a), y.clone(), Combine::And);
        world.add_rule(RuleTarget::Entrance(b), y, Combine::And);
        world.add_rule(RuleTarget::Entrance(b), x, Combine::And);

        let mut state = CollectionState::new();
        for name in names {
            if rng.gen_bool(0.5) {
                state.collect_named(name, 1);
            }
        }
        let cx = TraversalContext::new(&world, &state, 1);
        assert_eq!(
            cx.satisfies_rules(&world.entrances[a].access),
            cx.satisfies_rules(&world.entrances[b].access)
        );
    }
}

#[test]
fn or_rule_identities() {
    let lamp = Requirement::item("Lamp");
    assert_eq!(or_rule(lamp.clone(), Requirement::Never), lamp);
    assert_eq!(or_rule(Requirement::Never, lamp.clone()), lamp);
    assert_eq!(or_rule(lamp, Requirement::Free), Requirement::Free);
}

fn mentions(req: &Requirement, term: &Requirement) -> bool {
    req == term
        || match req {
            Requirement::And(reqs) | Requirement::Or(reqs) => {
                reqs.iter().any(|r| mentions(r, term))
            }
            Requirement::Not(inner) => mentions(inner, term),
            _ => false,
        }
}

fn ganon_rule(world: &WorldGraph) -> Requirement {
    let ganon = world.get_location("Ganon", 1).unwrap();
    world.rules(RuleTarget::Location(ganon)).to_requirement()
}

#[test]
fn compiled_rules_are_monotone_in_items() {
    let (world, _) = load();
    let pool: Vec<String> = world
        .locations
        .iter()
        .filter_map(|l| l.item.as_ref().map(|item| item.name.clone()))
        .collect();
    let mut rng = StdRng::seed_from_u64(2);
    for mode in [Mode::Open, Mode::Standard, Mode::Inverted] {
        let mut settings =
            LogicSettings::new(mode, LogicLevel::NoGlitches, Goal::Ganon, SwordMode::Randomized);
        settings.retro = rng.gen_bool(0.5);
        let world = compiled(&settings);
        for _ in 0..10 {
            let mut smaller = CollectionState::new();
            let mut larger = CollectionState::new();
            for item in &pool {
                if rng.gen_bool(0.3) {
                    smaller.collect_named(item, 1);
                    larger.collect_named(item, 1);
                } else if rng.gen_bool(0.3) {
                    larger.collect_named(item, 1);
                }
            }
            update_reachable_regions(&world, &mut smaller, 1);
            update_reachable_regions(&world, &mut larger, 1);
            let small_cx = TraversalContext::new(&world, &smaller, 1);
            let large_cx = TraversalContext::new(&world, &larger, 1);
            for (e, entrance) in world.entrances.iter().enumerate() {
                if small_cx.satisfies_rules(&entrance.access) {
                    assert!(
                        large_cx.satisfies_rules(&entrance.access),
                        "{mode:?}: rule on '{}' (#{e}) lost after collecting more items",
                        entrance.name
                    );
                }
            }
            for location in &world.locations {
                if small_cx.satisfies_rules(&location.access) {
                    assert!(
                        large_cx.satisfies_rules(&location.access),
                        "{mode:?}: rule on '{}' lost after collecting more items",
                        location.name
                    );
                }
            }
        }
    }
}

#[test]
fn swordless_keeps_goal_requirements() {
    let settings = LogicSettings::new(
        Mode::Open,
        LogicLevel::NoGlitches,
        Goal::Dungeons,
        SwordMode::Swordless,
    );
    let ganon = ganon_rule(&compiled(&settings));
    assert!(mentions(&ganon, &Requirement::item("Beat Agahnim 1")));
    assert!(mentions(&ganon, &Requirement::Crystals(7)));
    assert!(mentions(&ganon, &Requirement::item("Hammer")));
    assert!(!mentions(&ganon, &Requirement::Ability(Ability::BeamSword)));

    let settings = LogicSettings::new(
        Mode::Open,
        LogicLevel::NoGlitches,
        Goal::Ganon,
        SwordMode::Swordless,
    );
    let ganon = ganon_rule(&compiled(&settings));
    assert!(mentions(&ganon, &Requirement::item("Beat Agahnim 2")));
    assert!(mentions(&ganon, &Requirement::Crystals(7)));
    assert!(mentions(&ganon, &Requirement::item("Silver Arrows")));
}

#[test]
fn ganon_goal_needs_agahnim_2() {
    let settings = LogicSettings::new(
        Mode::Open,
        LogicLevel::NoGlitches,
        Goal::Ganon,
        SwordMode::Randomized,
    );
    let mut world = compiled(&settings);
    let hole = world.get_entrance("Pyramid Hole", 1).unwrap();
    world.set_rule(RuleTarget::Entrance(hole), Requirement::Free);
    let ganon = world.get_location("Ganon", 1).unwrap();
    let pyramid = world.get_region("Pyramid", 1).unwrap();

    let mut state = CollectionState::new();
    for item in [
        "Progressive Sword",
        "Progressive Sword",
        "Lamp",
        "Silver Arrows",
        "Moon Pearl",
        "Beat Agahnim 1",
    ] {
        state.collect_named(item, 1);
    }
    for crystal in CRYSTALS {
        state.collect_named(crystal, 1);
    }
    update_reachable_regions(&world, &mut state, 1);
    assert!(state.can_reach_region(pyramid, 1));
    assert!(!TraversalContext::new(&world, &state, 1).can_reach_location(ganon));

    state.collect_named("Beat Agahnim 2", 1);
    update_reachable_regions(&world, &mut state, 1);
    assert!(TraversalContext::new(&world, &state, 1).can_reach_location(ganon));
}

#[test]
fn castle_portals_wait_for_zelda_under_entrance_shuffle() {
    let delivered = Requirement::item("Zelda Delivered");
    for entrance_shuffle in [false, true] {
        let mut settings = LogicSettings::new(
            Mode::Standard,
            LogicLevel::NoGlitches,
            Goal::Ganon,
            SwordMode::Randomized,
        );
        settings.entrance_shuffle = entrance_shuffle;
        let world = compiled(&settings);
        for name in [
            "Hyrule Castle Entrance (West)",
            "Hyrule Castle Entrance (East)",
        ] {
            let entrance = world.get_entrance(name, 1).unwrap();
            let rule = world.rules(RuleTarget::Entrance(entrance)).to_requirement();
            assert_eq!(mentions(&rule, &delivered), entrance_shuffle, "{name}");
        }
    }
}
