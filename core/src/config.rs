//! Tunable constants of the colony with their documented defaults.
//!
//! Cadences are deliberately absent: the 10/50/100 tick periods are observable
//! behaviour and live next to [`crate::Cadence`] instead.

use serde::Deserialize;
use thiserror::Error;

use crate::{BodyPart, EnergyLevel};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration parsed but is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Body compositions requested for one role, one per energy level.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BodyTiers {
    /// Body used while energy is scarce.
    pub low: Vec<BodyPart>,
    /// Body used once spawn capacity is moderate.
    pub medium: Vec<BodyPart>,
    /// Body used once spawn capacity is large.
    pub high: Vec<BodyPart>,
}

impl BodyTiers {
    /// Body matching the provided energy level.
    #[must_use]
    pub fn for_level(&self, level: EnergyLevel) -> &[BodyPart] {
        match level {
            EnergyLevel::Low => &self.low,
            EnergyLevel::Medium => &self.medium,
            EnergyLevel::High => &self.high,
        }
    }

    fn validate(&self, role: &str) -> Result<(), ConfigError> {
        for (tier, body) in [("low", &self.low), ("medium", &self.medium), ("high", &self.high)] {
            if body.is_empty() {
                return Err(ConfigError::Invalid(format!("{role} {tier} body is empty")));
            }
            if !body.contains(&BodyPart::Move) {
                return Err(ConfigError::Invalid(format!(
                    "{role} {tier} body cannot move"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the colony systems.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    /// Builders each new territory aims for.
    pub desired_builders: u32,

    /// Durability target for walls and ramparts.
    pub desired_wall_hit_points: u32,

    /// Grace period below which builders drop everything to upgrade.
    pub critical_downgrade_ticks: u32,

    /// Grace period above which idle miners repair or build before upgrading.
    pub relaxed_downgrade_ticks: u32,

    /// Tech level from which builders lay roads under their feet.
    pub road_tech_level: u8,

    /// Spawn energy below which a young territory stays on the cheapest bodies.
    pub low_energy_threshold: u32,

    /// Spawn capacity from which the largest bodies are requested.
    pub high_energy_capacity: u32,

    /// Extensions allowed per controller level, indexed by level.
    pub extensions_per_level: Vec<u32>,

    /// Miner bodies per energy level.
    pub miner_bodies: BodyTiers,

    /// Builder bodies per energy level.
    pub builder_bodies: BodyTiers,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        use BodyPart::{Carry, Move, Work};

        Self {
            desired_builders: 2,
            desired_wall_hit_points: 10_000,
            critical_downgrade_ticks: 1_000,
            relaxed_downgrade_ticks: 4_000,
            road_tech_level: 4,
            low_energy_threshold: 550,
            high_energy_capacity: 800,
            extensions_per_level: vec![0, 0, 5, 10, 20, 30, 40, 50, 60],
            miner_bodies: BodyTiers {
                low: vec![Work, Work, Carry, Move],
                medium: vec![Work, Work, Work, Work, Carry, Move, Move],
                high: vec![Work, Work, Work, Work, Work, Carry, Carry, Move, Move, Move],
            },
            builder_bodies: BodyTiers {
                low: vec![Work, Carry, Carry, Move, Move],
                medium: vec![Work, Work, Carry, Carry, Carry, Move, Move, Move],
                high: vec![
                    Work, Work, Work, Carry, Carry, Carry, Carry, Move, Move, Move, Move,
                ],
            },
        }
    }
}

impl ColonyConfig {
    /// Parses a configuration from TOML, filling omitted keys with defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.critical_downgrade_ticks == 0 {
            return Err(ConfigError::Invalid(
                "critical_downgrade_ticks must be positive".into(),
            ));
        }
        if self.relaxed_downgrade_ticks < self.critical_downgrade_ticks {
            return Err(ConfigError::Invalid(format!(
                "relaxed_downgrade_ticks ({}) should be >= critical_downgrade_ticks ({})",
                self.relaxed_downgrade_ticks, self.critical_downgrade_ticks
            )));
        }
        if self.extensions_per_level.is_empty() {
            return Err(ConfigError::Invalid(
                "extensions_per_level needs at least one entry".into(),
            ));
        }
        self.miner_bodies.validate("miner")?;
        self.builder_bodies.validate("builder")
    }

    /// Extension quota for a controller level; levels past the table reuse its last entry.
    #[must_use]
    pub fn extension_quota(&self, controller_level: u8) -> u32 {
        let last = self.extensions_per_level.len().saturating_sub(1);
        let index = usize::from(controller_level).min(last);
        self.extensions_per_level.get(index).copied().unwrap_or(0)
    }
}
