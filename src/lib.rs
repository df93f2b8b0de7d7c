pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::EngineConfig;
pub use error::{EngineError, EngineWarning};
pub use services::{aggregate_game, StatsEngine};
