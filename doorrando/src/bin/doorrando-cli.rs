use anyhow::{Context, Result};
use clap::Parser;
use doorrando::settings::load_logic_settings;
use doorrando::traverse::collect_reachable_items;
use doorrando::{LogicSettings, RuleTables, set_rules};
use doorrando_game::{RuleTarget, WorldGraph};
use doorrando_logic::CollectionState;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    #[arg(long)]
    world: PathBuf,

    #[arg(long, default_value = "data/rules.json")]
    rules: PathBuf,

    /// Settings file; overrides the individual setting flags.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value = "open")]
    mode: String,

    #[arg(long, default_value = "noglitches")]
    logic: String,

    #[arg(long, default_value = "ganon")]
    goal: String,

    #[arg(long, default_value = "randomized")]
    swords: String,

    /// Comma-separated items held by player 1 at the start.
    #[arg(long, value_delimiter = ',')]
    items: Vec<String>,

    /// Print the compiled access rule of these locations.
    #[arg(long)]
    explain: Vec<String>,
}

fn get_settings(args: &Args) -> Result<LogicSettings> {
    match &args.settings {
        Some(path) => load_logic_settings(path),
        None => LogicSettings::from_strings(&args.mode, &args.logic, &args.goal, &args.swords),
    }
}

fn explain(world: &WorldGraph, name: &str) -> Result<()> {
    let location = world
        .get_location(name, 1)
        .with_context(|| format!("Unable to explain '{name}'"))?;
    let req = world.rules(RuleTarget::Location(location)).to_requirement();
    println!("{name}:");
    print!("{}", req.print_pretty(2, world));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let settings = get_settings(&args)?;
    let tables = RuleTables::load(&args.rules)?;
    let mut world = WorldGraph::load(&args.world)?;
    for player in 1..=world.players {
        set_rules(&mut world, player, &settings, &tables)
            .with_context(|| format!("Unable to compile rules for player {player}"))?;
    }

    for name in &args.explain {
        explain(&world, name)?;
    }

    let mut state = CollectionState::new();
    for item in &args.items {
        state.collect_named(item.trim(), 1);
    }
    let reachable = collect_reachable_items(&world, &mut state);
    info!(
        "{} of {} locations reachable",
        reachable.len(),
        world.locations.len()
    );
    for location in reachable {
        let loc = &world.locations[location];
        if loc.event {
            continue;
        }
        match &loc.item {
            Some(item) => println!("{} (player {}): {}", loc.name, loc.player, item.name),
            None => println!("{} (player {})", loc.name, loc.player),
        }
    }
    Ok(())
}
