use std::path::Path;

use anyhow::{Context, Result, bail};
use doorrando::settings::load_logic_settings;
use doorrando::traverse::{can_reach_location, collect_reachable_items, update_reachable_regions};
use doorrando::{LogicSettings, RuleTables, set_rules};
use doorrando_game::WorldGraph;
use doorrando_logic::CollectionState;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ScenariosList {
    scenarios: Vec<Scenario>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    name: String,
    #[serde(default)]
    items: Vec<String>,
    // Collect everything reachable before checking, starting from `items`.
    #[serde(default)]
    sweep: bool,
    #[serde(default)]
    reachable: Vec<String>,
    #[serde(default)]
    unreachable: Vec<String>,
}

fn compile_world(settings: &LogicSettings, tables: &RuleTables) -> Result<WorldGraph> {
    let mut world = WorldGraph::load(Path::new("data/world.json"))?;
    for player in 1..=world.players {
        set_rules(&mut world, player, settings, tables)?;
    }
    Ok(world)
}

fn test_scenario(world: &WorldGraph, scenario: &Scenario) -> Result<()> {
    let mut state = CollectionState::new();
    for item in &scenario.items {
        state.collect_named(item, 1);
    }
    if scenario.sweep {
        collect_reachable_items(world, &mut state);
    } else {
        update_reachable_regions(world, &mut state, 1);
    }

    for name in &scenario.reachable {
        let location = world
            .get_location(name, 1)
            .context(format!("Unknown location '{}'", name))?;
        if !can_reach_location(world, &state, location) {
            bail!("'{}' expected reachable, but is not", name);
        }
    }
    for name in &scenario.unreachable {
        let location = world
            .get_location(name, 1)
            .context(format!("Unknown location '{}'", name))?;
        if can_reach_location(world, &state, location) {
            bail!("'{}' expected unreachable, but is reachable", name);
        }
    }
    Ok(())
}

#[test]
fn test_logic_scenarios() -> Result<()> {
    std::env::set_current_dir(Path::new(".."))?;
    let tables = RuleTables::load(Path::new("data/rules.json"))?;
    let mut entries: Vec<_> = std::fs::read_dir("doorrando/tests/scenarios")?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        println!("{}", entry.file_name().display());

        let settings = load_logic_settings(&entry.path().join("settings.json"))?;
        let world = compile_world(&settings, &tables)
            .context(format!("compiling rules for {}", entry.path().display()))?;

        let scenarios_path = entry.path().join("scenarios.json");
        let scenarios_str = std::fs::read_to_string(scenarios_path.clone())
            .context(format!("loading {}", scenarios_path.display()))?;
        let scenarios_list: ScenariosList = serde_json::from_str(&scenarios_str)
            .context(format!("parsing {}", scenarios_path.display()))?;
        for scenario in &scenarios_list.scenarios {
            println!("Scenario: {}", scenario.name);
            test_scenario(&world, scenario).context(format!("scenario '{}'", scenario.name))?;
        }
    }
    Ok(())
}
