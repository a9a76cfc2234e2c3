use crate::{
    BossSlot, CrystalBarrier, DungeonId, EntranceId, LocationId, PlayerId, RegionId, WorldGraph,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use strum_macros::{EnumString, VariantNames};

/// Derived capabilities that are more than a single item check.
///
/// The string forms are the names used in rule tables.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize,
)]
pub enum Ability {
    #[strum(serialize = "hasMoonPearl")]
    MoonPearl,
    #[strum(serialize = "hasMirror")]
    Mirror,
    #[strum(serialize = "hasBoots")]
    Boots,
    #[strum(serialize = "canLiftRocks")]
    LiftRocks,
    #[strum(serialize = "canLiftHeavyRocks")]
    LiftHeavyRocks,
    #[strum(serialize = "hasSword")]
    Sword,
    #[strum(serialize = "hasBeamSword")]
    BeamSword,
    #[strum(serialize = "hasBluntWeapon")]
    BluntWeapon,
    #[strum(serialize = "hasFireSource")]
    FireSource,
    #[strum(serialize = "canMeltThings")]
    MeltThings,
    #[strum(serialize = "canShootArrows")]
    ShootArrows,
    #[strum(serialize = "canKillMostThings")]
    KillMostThings,
    #[strum(serialize = "hasBottle")]
    Bottle,
    #[strum(serialize = "canFlute")]
    Flute,
    #[strum(serialize = "hasMiseryMireMedallion")]
    MiseryMireMedallion,
    #[strum(serialize = "hasTurtleRockMedallion")]
    TurtleRockMedallion,
}

/// Handle to a boss slot of a dungeon. The boss occupying the slot is looked
/// up when the requirement is evaluated, so boss shuffle may run after rules
/// are compiled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BossRef {
    pub dungeon: DungeonId,
    pub slot: BossSlot,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Requirement {
    Free,
    Never,
    Item {
        item: String,
        count: u32,
    },
    SmallKey {
        key: String,
        count: u32,
    },
    Ability(Ability),
    Crystals(u32),
    Hearts(u32),
    // Magic units available, counting refills from held bottles.
    Magic(u32),
    CanReachRegion(RegionId),
    CanReachEntrance(EntranceId),
    CanReachLocation(LocationId),
    CrystalBarrier {
        region: RegionId,
        color: CrystalBarrier,
    },
    DefeatBoss(BossRef),
    ItemAt {
        location: LocationId,
        item: String,
        player: PlayerId,
    },
    Not(Box<Requirement>),
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
}

impl Requirement {
    pub fn item(item: &str) -> Requirement {
        Requirement::Item {
            item: item.to_string(),
            count: 1,
        }
    }

    pub fn item_count(item: &str, count: u32) -> Requirement {
        if count == 0 {
            return Requirement::Free;
        }
        Requirement::Item {
            item: item.to_string(),
            count,
        }
    }

    pub fn small_key(key: &str, count: u32) -> Requirement {
        if count == 0 {
            return Requirement::Free;
        }
        Requirement::SmallKey {
            key: key.to_string(),
            count,
        }
    }

    pub fn make_and(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                return Requirement::Never;
            } else if let Requirement::Free = req {
                continue;
            } else if let Requirement::And(and_reqs) = req {
                out_reqs.extend(and_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        if out_reqs.len() > 1 {
            Requirement::And(out_reqs)
        } else {
            out_reqs.pop().unwrap_or(Requirement::Free)
        }
    }

    pub fn make_or(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                continue;
            } else if let Requirement::Free = req {
                return Requirement::Free;
            } else if let Requirement::Or(or_reqs) = req {
                out_reqs.extend(or_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        if out_reqs.len() > 1 {
            Requirement::Or(out_reqs)
        } else {
            out_reqs.pop().unwrap_or(Requirement::Never)
        }
    }

    pub fn make_not(req: Requirement) -> Requirement {
        match req {
            Requirement::Free => Requirement::Never,
            Requirement::Never => Requirement::Free,
            Requirement::Not(inner) => *inner,
            other => Requirement::Not(Box::new(other)),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Requirement::Free)
    }

    pub fn print_pretty(&self, indent: usize, world: &WorldGraph) -> String {
        PrettyRequirement {
            req: self,
            indent,
            world,
        }
        .to_string()
    }

    fn write_pretty<W: Write>(&self, out: &mut W, indent: usize, world: &WorldGraph) -> fmt::Result {
        let pad = " ".repeat(indent);
        match self {
            Requirement::And(reqs) | Requirement::Or(reqs) => {
                let label = if let Requirement::And(_) = self {
                    "and"
                } else {
                    "or"
                };
                writeln!(out, "{pad}{label}:")?;
                for req in reqs {
                    req.write_pretty(out, indent + 2, world)?;
                }
                Ok(())
            }
            Requirement::Not(req) => {
                writeln!(out, "{pad}not:")?;
                req.write_pretty(out, indent + 2, world)
            }
            Requirement::Item { item, count } if *count == 1 => writeln!(out, "{pad}{item}"),
            Requirement::Item { item, count } => writeln!(out, "{pad}{item} x{count}"),
            Requirement::SmallKey { key, count } => writeln!(out, "{pad}{key} x{count}"),
            Requirement::CanReachRegion(id) => {
                writeln!(out, "{pad}canReach region '{}'", world.regions[*id].name)
            }
            Requirement::CanReachEntrance(id) => {
                writeln!(out, "{pad}canReach entrance '{}'", world.entrances[*id].name)
            }
            Requirement::CanReachLocation(id) => {
                writeln!(out, "{pad}canReach location '{}'", world.locations[*id].name)
            }
            Requirement::CrystalBarrier { region, color } => writeln!(
                out,
                "{pad}{color:?} barrier reachable in '{}'",
                world.regions[*region].name
            ),
            Requirement::DefeatBoss(boss_ref) => writeln!(
                out,
                "{pad}defeat {:?} boss of {}",
                boss_ref.slot, world.dungeons[boss_ref.dungeon].name
            ),
            Requirement::ItemAt { location, item, .. } => writeln!(
                out,
                "{pad}'{}' holds {item}",
                world.locations[*location].name
            ),
            other => writeln!(out, "{pad}{other:?}"),
        }
    }
}

/// Indented, one-term-per-line rendering of a requirement with names
/// looked up in the world.
pub struct PrettyRequirement<'a> {
    req: &'a Requirement,
    indent: usize,
    world: &'a WorldGraph,
}

impl fmt::Display for PrettyRequirement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.req.write_pretty(f, self.indent, self.world)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Combine {
    And,
    Or,
}

/// Explicit list of access terms for an entrance or location, AND-folded at
/// evaluation time. An empty list is always satisfied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    terms: Vec<Requirement>,
}

impl RuleSet {
    pub fn terms(&self) -> &[Requirement] {
        &self.terms
    }

    pub fn set(&mut self, req: Requirement) {
        self.terms.clear();
        if !req.is_free() {
            self.terms.push(req);
        }
    }

    pub fn add(&mut self, req: Requirement, combine: Combine) {
        match combine {
            Combine::And => {
                if !req.is_free() {
                    self.terms.push(req);
                }
            }
            Combine::Or => {
                let old = self.to_requirement();
                self.set(Requirement::make_or(vec![old, req]));
            }
        }
    }

    pub fn to_requirement(&self) -> Requirement {
        Requirement::make_and(self.terms.clone())
    }
}

/// Restriction on which items may be placed at a location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemRule {
    Any,
    Forbid { item: String, player: PlayerId },
    Only { item: String, player: PlayerId },
    // Holding only the candidate item, a sweep from the start must trigger the event.
    UnlocksEvent { event: String, player: PlayerId },
    And(Vec<ItemRule>),
}

impl ItemRule {
    /// Checks the rule against a candidate item. `unlocks_event` answers the
    /// `UnlocksEvent` case, which needs a reachability sweep.
    pub fn allows(
        &self,
        item: &crate::PlacedItem,
        unlocks_event: &dyn Fn(&str, PlayerId, &crate::PlacedItem) -> bool,
    ) -> bool {
        match self {
            ItemRule::Any => true,
            ItemRule::Forbid {
                item: name,
                player,
            } => !(item.name == *name && item.player == *player),
            ItemRule::Only {
                item: name,
                player,
            } => item.name == *name && item.player == *player,
            ItemRule::UnlocksEvent { event, player } => unlocks_event(event, *player, item),
            ItemRule::And(rules) => rules.iter().all(|r| r.allows(item, unlocks_event)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRuleSet {
    terms: Vec<ItemRule>,
}

impl ItemRuleSet {
    pub fn terms(&self) -> &[ItemRule] {
        &self.terms
    }

    pub fn add(&mut self, rule: ItemRule) {
        if rule != ItemRule::Any {
            self.terms.push(rule);
        }
    }

    pub fn allows(
        &self,
        item: &crate::PlacedItem,
        unlocks_event: &dyn Fn(&str, PlayerId, &crate::PlacedItem) -> bool,
    ) -> bool {
        self.terms.iter().all(|r| r.allows(item, unlocks_event))
    }
}
