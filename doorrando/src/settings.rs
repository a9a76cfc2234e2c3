use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use doorrando_game::RuleError;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, VariantNames};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Open,
    Standard,
    Inverted,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogicLevel {
    NoLogic,
    NoGlitches,
    MinorGlitches,
    OwGlitches,
    MajorGlitches,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Goal {
    Ganon,
    Crystals,
    Dungeons,
    Pedestal,
    TriforceHunt,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SwordMode {
    Randomized,
    Assured,
    Vanilla,
    Swordless,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DoorShuffle {
    #[default]
    Vanilla,
    Basic,
    Crossed,
}

fn seven() -> u32 {
    7
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// Per-player settings that shape which rules get compiled.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogicSettings {
    pub mode: Mode,
    pub logic: LogicLevel,
    pub goal: Goal,
    pub swords: SwordMode,
    #[serde(default)]
    pub door_shuffle: DoorShuffle,
    #[serde(default)]
    pub entrance_shuffle: bool,
    #[serde(default)]
    pub retro: bool,
    #[serde(default = "seven")]
    pub crystals_needed_for_ganon: u32,
    #[serde(default = "seven")]
    pub crystals_needed_for_gt: u32,
    #[serde(default = "one")]
    pub lamps_needed_for_dark_rooms: u32,
    #[serde(default = "yes")]
    pub can_take_damage: bool,
    // Defaults to on in standard mode only.
    #[serde(default)]
    pub sewer_light_cone: Option<bool>,
    #[serde(default)]
    pub light_world_light_cone: bool,
    #[serde(default)]
    pub dark_world_light_cone: bool,
    #[serde(default)]
    pub swamp_patch_required: bool,
}

fn parse_setting<T: FromStr>(setting: &'static str, value: &str) -> Result<T, RuleError> {
    T::from_str(value).map_err(|_| RuleError::InvalidSetting {
        setting,
        value: value.to_string(),
    })
}

impl LogicSettings {
    pub fn new(mode: Mode, logic: LogicLevel, goal: Goal, swords: SwordMode) -> Self {
        LogicSettings {
            mode,
            logic,
            goal,
            swords,
            door_shuffle: DoorShuffle::Vanilla,
            entrance_shuffle: false,
            retro: false,
            crystals_needed_for_ganon: 7,
            crystals_needed_for_gt: 7,
            lamps_needed_for_dark_rooms: 1,
            can_take_damage: true,
            sewer_light_cone: None,
            light_world_light_cone: false,
            dark_world_light_cone: false,
            swamp_patch_required: false,
        }
    }

    /// Builds settings from the string forms used on the command line. Any
    /// unrecognized value is rejected before a rule is touched.
    pub fn from_strings(mode: &str, logic: &str, goal: &str, swords: &str) -> Result<Self> {
        let settings = LogicSettings::new(
            parse_setting("mode", mode)?,
            parse_setting("logic", logic)?,
            parse_setting("goal", goal)?,
            parse_setting("swords", swords)?,
        );
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        match self.logic {
            LogicLevel::OwGlitches => Err(RuleError::UnsupportedLogic("owglitches".to_string())),
            LogicLevel::MajorGlitches => {
                Err(RuleError::UnsupportedLogic("majorglitches".to_string()))
            }
            LogicLevel::NoLogic | LogicLevel::NoGlitches | LogicLevel::MinorGlitches => Ok(()),
        }
    }

    pub fn sewer_light_cone(&self) -> bool {
        self.sewer_light_cone.unwrap_or(self.mode == Mode::Standard)
    }

    pub fn is_inverted(&self) -> bool {
        self.mode == Mode::Inverted
    }
}

pub fn parse_logic_settings(settings_json: &str) -> Result<LogicSettings> {
    let mut des = serde_json::Deserializer::from_str(settings_json);
    let settings: LogicSettings = serde_path_to_error::deserialize(&mut des)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_logic_settings(path: &Path) -> Result<LogicSettings> {
    let settings_json = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read settings file {}", path.display()))?;
    parse_logic_settings(&settings_json)
        .with_context(|| format!("Invalid settings file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_strings() {
        let settings =
            LogicSettings::from_strings("inverted", "noglitches", "triforcehunt", "swordless")
                .unwrap();
        assert_eq!(settings.mode, Mode::Inverted);
        assert_eq!(settings.goal, Goal::TriforceHunt);
        assert_eq!(settings.swords, SwordMode::Swordless);
        assert!(!settings.sewer_light_cone());
    }

    #[test]
    fn unknown_mode_is_a_configuration_error() {
        let err = LogicSettings::from_strings("retro", "noglitches", "ganon", "randomized")
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RuleError>(),
            Some(&RuleError::InvalidSetting {
                setting: "mode",
                value: "retro".to_string()
            })
        );
    }

    #[test]
    fn glitched_tiers_are_rejected() {
        let err = LogicSettings::from_strings("open", "owglitches", "ganon", "randomized")
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RuleError>(),
            Some(&RuleError::UnsupportedLogic("owglitches".to_string()))
        );
        assert!(LogicSettings::from_strings("open", "minorglitches", "ganon", "randomized").is_ok());
    }

    #[test]
    fn settings_file_defaults() {
        let settings = parse_logic_settings(
            r#"{"mode": "standard", "logic": "noglitches", "goal": "ganon", "swords": "assured"}"#,
        )
        .unwrap();
        assert_eq!(settings.crystals_needed_for_gt, 7);
        assert!(settings.can_take_damage);
        assert!(settings.sewer_light_cone());
        assert_eq!(settings.door_shuffle, DoorShuffle::Vanilla);
    }
}
