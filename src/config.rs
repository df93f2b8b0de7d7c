use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ConfigError;

/// How a sack shared by several defenders is divided between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SackCreditPolicy {
    /// 1/n to each of n defenders, summing to exactly one sack.
    Split,
    /// 0.5 to every co-credited defender, 1.0 to a lone defender.
    Half,
}

impl std::str::FromStr for SackCreditPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "split" | "equal" => Ok(SackCreditPolicy::Split),
            "half" => Ok(SackCreditPolicy::Half),
            other => Err(format!("expected 'split' or 'half', got '{}'", other)),
        }
    }
}

/// Fantasy scoring weights. `reception_points` only applies to the PPR total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FantasyScoring {
    pub passing_yd_per_point: f64,
    pub passing_td_points: f64,
    pub interception_points: f64,
    pub rushing_yd_per_point: f64,
    pub receiving_yd_per_point: f64,
    pub rushing_td_points: f64,
    pub receiving_td_points: f64,
    pub fumble_lost_points: f64,
    pub special_teams_td_points: f64,
    pub two_point_conversion_points: f64,
    pub reception_points: f64,
}

impl Default for FantasyScoring {
    fn default() -> Self {
        Self {
            passing_yd_per_point: 25.0,
            passing_td_points: 4.0,
            interception_points: -2.0,
            rushing_yd_per_point: 10.0,
            receiving_yd_per_point: 10.0,
            rushing_td_points: 6.0,
            receiving_td_points: 6.0,
            fumble_lost_points: -2.0,
            special_teams_td_points: 6.0,
            two_point_conversion_points: 2.0,
            reception_points: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sack_credit: SackCreditPolicy,
    pub scrambles_as_dropbacks: bool,
    pub scoring: FantasyScoring,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sack_credit: SackCreditPolicy::Split,
            scrambles_as_dropbacks: true,
            scoring: FantasyScoring::default(),
        }
    }
}

impl EngineConfig {
    /// Read overrides from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("SACK_CREDIT_POLICY") {
            config.sack_credit = value.parse::<SackCreditPolicy>().map_err(|reason| ConfigError::InvalidValue {
                key: "SACK_CREDIT_POLICY",
                value: value.clone(),
                reason,
            })?;
        }

        if let Some(value) = lookup("SCRAMBLES_AS_DROPBACKS") {
            config.scrambles_as_dropbacks =
                parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                    key: "SCRAMBLES_AS_DROPBACKS",
                    value: value.clone(),
                    reason: "expected true or false".to_string(),
                })?;
        }

        if let Some(value) = lookup("FANTASY_PPR_RECEPTION_POINTS") {
            config.scoring.reception_points =
                value.trim().parse::<f64>().map_err(|e| {
                    ConfigError::InvalidValue {
                        key: "FANTASY_PPR_RECEPTION_POINTS",
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
        }

        tracing::debug!(?config, "Engine configuration loaded");
        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
