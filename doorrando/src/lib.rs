// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod bunny;
pub mod key_logic;
pub mod requirement_parser;
pub mod rule_tables;
pub mod rules;
pub mod settings;
pub mod traverse;

pub use rule_tables::RuleTables;
pub use rules::set_rules;
pub use settings::LogicSettings;
