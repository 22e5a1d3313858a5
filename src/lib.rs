pub mod adapters;
#[cfg(feature = "cli")]
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, toml_config::TomlConfig, CliConfig};

pub use core::{
    calculator::PapCalculator,
    etl::CalculationEngine,
    pipeline::{CalculationInput, PapPipeline},
    scenarios::ScenarioProjector,
};
pub use domain::rates::RateTable;
pub use utils::error::{PapError, Result};
