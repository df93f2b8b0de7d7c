use thiserror::Error;

/// Failures that stop a single game from producing any rows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Play-event stream for game {0} is absent")]
    MissingPlayStream(String),

    #[error("Play-event stream for game {game_id} is unreadable: all {rejected} events were rejected")]
    NoValidPlays { game_id: String, rejected: usize },
}

/// Data-quality issues reported alongside a game's rows. None of these abort the game.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineWarning {
    #[error("Skipped play {play_id} in game {game_id}: {reason}")]
    MalformedPlayEvent {
        game_id: String,
        play_id: u32,
        reason: String,
    },

    #[error("Share '{field}' for player {player_id} set null: numerator {numerator} with team total {denominator:?}")]
    InconsistentShareDenominator {
        player_id: String,
        field: &'static str,
        numerator: i32,
        denominator: Option<i32>,
    },

    #[error("Replaced existing {table} row for ({entity_id}, {game_id})")]
    DuplicateGameRow {
        table: &'static str,
        entity_id: String,
        game_id: String,
    },

    #[error("Player {player_id} credited for several teams {teams:?}; using {kept}")]
    PlayerTeamConflict {
        player_id: String,
        teams: Vec<String>,
        kept: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
