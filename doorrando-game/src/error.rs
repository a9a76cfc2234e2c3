use crate::PlayerId;
use thiserror::Error;

/// Errors raised while loading a world or compiling rules onto it.
///
/// Requirement evaluation never fails; everything here happens before the
/// first predicate is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("invalid {setting} setting '{value}'")]
    InvalidSetting { setting: &'static str, value: String },
    #[error("unsupported logic level '{0}'")]
    UnsupportedLogic(String),
    #[error("unknown region '{name}' for player {player}")]
    UnknownRegion { name: String, player: PlayerId },
    #[error("unknown entrance '{name}' for player {player}")]
    UnknownEntrance { name: String, player: PlayerId },
    #[error("unknown location '{name}' for player {player}")]
    UnknownLocation { name: String, player: PlayerId },
    #[error("unknown door '{name}' for player {player}")]
    UnknownDoor { name: String, player: PlayerId },
    #[error("unknown dungeon '{name}' for player {player}")]
    UnknownDungeon { name: String, player: PlayerId },
    #[error("no logic found for '{entrance}' when routing to '{target}'")]
    NoLogicFound { entrance: String, target: String },
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),
    #[error("circular dependence in helper '{0}'")]
    CircularHelper(String),
}
