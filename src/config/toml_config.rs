use crate::adapters::http::DEFAULT_ENDPOINT;
use crate::config::parse_label;
use crate::core::pipeline::CalculationInput;
use crate::core::ConfigProvider;
use crate::domain::model::{Component, RateOverrides, ServiceQuantities, ServiceSelection};
use crate::domain::outcome::AdditionalParameters;
use crate::domain::rates::RateTable;
use crate::domain::report::ConsultRequest;
use crate::utils::error::{PapError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub run: RunConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub municipality: MunicipalityConfig,
    #[serde(default)]
    pub services: BTreeMap<String, u32>,
    #[serde(default)]
    pub implantation: BTreeMap<String, u32>,
    /// `[overrides.<component>]` tables, e.g. `[overrides.fixed]`.
    #[serde(default)]
    pub overrides: BTreeMap<String, BTreeMap<String, Decimal>>,
    pub projection: Option<AdditionalParameters>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub ibge_code: String,
    pub competencia: String,
    #[serde(default)]
    pub offline: bool,
    pub timeout_seconds: Option<u64>,
    /// `config.json` with the rate tables; the built-in copy when absent.
    pub rates_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MunicipalityConfig {
    pub quality: Option<String>,
    pub bond: Option<String>,
    pub emulti_quality: Option<String>,
    pub population: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    #[serde(default = "default_formats")]
    pub output_formats: Vec<String>,
    #[serde(default)]
    pub bundle: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_formats() -> Vec<String> {
    vec!["csv".to_string(), "json".to_string()]
}

impl TomlConfig {
    /// Loads a run file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PapError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses a run file, after environment substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PapError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are kept as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PapError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("run.name", &self.run.name)?;
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_path("output.output_path", &self.output.output_path)?;
        validation::validate_output_formats("output.output_formats", &self.output.output_formats)?;

        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_positive_number("source.timeout_seconds", timeout, 1)?;
        }
        if let Some(rates_file) = &self.source.rates_file {
            validation::validate_path("source.rates_file", rates_file)?;
        }
        if let Some(population) = self.municipality.population {
            validation::validate_range(
                "municipality.population",
                population,
                validation::MIN_POPULATION,
                validation::MAX_POPULATION,
            )?;
        }

        self.request().validate()
    }

    pub fn rates(&self) -> Result<RateTable> {
        match &self.source.rates_file {
            Some(path) => RateTable::from_file(path),
            None => RateTable::builtin(),
        }
    }

    pub fn calculation_input(&self) -> Result<CalculationInput> {
        let mut overrides = RateOverrides::new();
        for (component, services) in &self.overrides {
            let component: Component = component.parse()?;
            for (service, value) in services {
                overrides.set(component, service, *value);
            }
        }

        let selection = ServiceSelection {
            quantities: self
                .services
                .iter()
                .map(|(service, quantity)| (service.clone(), *quantity))
                .collect::<ServiceQuantities>(),
            implantation: self
                .implantation
                .iter()
                .map(|(service, quantity)| (service.clone(), *quantity))
                .collect::<ServiceQuantities>(),
            overrides,
        };

        Ok(CalculationInput {
            selection,
            quality_label: parse_label(self.municipality.quality.as_deref())?,
            bond_label: parse_label(self.municipality.bond.as_deref())?,
            emulti_quality_label: parse_label(self.municipality.emulti_quality.as_deref())?,
            population: self.municipality.population,
            additional: self.projection.clone(),
        })
    }

    /// One line per setting, for the startup banner.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Execução: {}", self.run.name),
            format!(
                "Município (IBGE): {} | Competência: {}",
                self.source.ibge_code, self.source.competencia
            ),
            format!(
                "Fonte: {}",
                if self.source.offline {
                    "data.json (offline)"
                } else {
                    self.source.endpoint.as_str()
                }
            ),
        ];

        for (service, quantity) in &self.services {
            lines.push(format!("  {}: {}", service, quantity));
        }
        for (service, quantity) in &self.implantation {
            lines.push(format!("  {} (implantação): {}", service, quantity));
        }
        for (component, services) in &self.overrides {
            for (service, value) in services {
                lines.push(format!("  valor editado {}:{} = {}", component, service, value));
            }
        }

        lines.push(format!(
            "Saída: {} [{}]{}",
            self.output.output_path,
            self.output.output_formats.join(", "),
            if self.output.bundle { " + zip" } else { "" }
        ));
        lines
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn request(&self) -> ConsultRequest {
        ConsultRequest::new(self.source.ibge_code.as_str(), self.source.competencia.as_str())
    }

    fn use_cache(&self) -> bool {
        self.source.offline
    }

    fn output_formats(&self) -> &[String] {
        &self.output.output_formats
    }

    fn bundle_output(&self) -> bool {
        self.output.bundle
    }

    fn request_timeout_seconds(&self) -> Option<u64> {
        self.source.timeout_seconds
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
