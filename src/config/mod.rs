pub mod cli;
pub mod toml_config;

use crate::adapters::http::DEFAULT_ENDPOINT;
use crate::core::pipeline::CalculationInput;
use crate::core::ConfigProvider;
use crate::domain::labels::QualityLabel;
use crate::domain::model::{Component, RateOverrides, ServiceQuantities, ServiceSelection};
use crate::domain::outcome::AdditionalParameters;
use crate::domain::report::ConsultRequest;
use crate::utils::currency::parse_currency;
use crate::utils::error::{PapError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "calculadora-pap")]
#[command(about = "Calcula os incentivos federais da Atenção Primária (PAP) de um município")]
pub struct CliConfig {
    /// Código IBGE do município (6 ou 7 dígitos)
    #[arg(long)]
    pub ibge: String,

    /// Competência no formato AAAAMM
    #[arg(long)]
    pub competencia: String,

    /// Quantidades por serviço, ex.: "eSF=3,eAP 30h=1"
    #[arg(long, value_delimiter = ',')]
    pub services: Vec<String>,

    /// Novas equipes em implantação, ex.: "eSF=1"
    #[arg(long, value_delimiter = ',')]
    pub implantation: Vec<String>,

    /// Valor editado, repetível, ex.: "fixed:eSF=R$ 18.000,00"
    #[arg(long = "override")]
    pub overrides: Vec<String>,

    #[arg(long)]
    pub quality: Option<String>,

    #[arg(long)]
    pub bond: Option<String>,

    #[arg(long)]
    pub emulti_quality: Option<String>,

    /// Substitui a população informada pela API
    #[arg(long)]
    pub population: Option<u64>,

    /// Recurso adicional mensal, repetível, ex.: "esf_eap=30000"
    #[arg(long)]
    pub additional: Vec<String>,

    /// Arquivo config.json com as tabelas de valores
    #[arg(long)]
    pub rates: Option<String>,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub api_endpoint: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "csv,json")]
    pub formats: Vec<String>,

    #[arg(long, help = "Agrupa os arquivos em calculadora_pap.zip")]
    pub bundle: bool,

    #[arg(long, help = "Usa o data.json salvo em vez de consultar a API")]
    pub offline: bool,

    #[arg(long, help = "Apenas consulta a API e mostra os dados do município")]
    pub consult_only: bool,

    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// Splits `"code=value"` at the last `=`, so codes may contain spaces and dots.
pub fn parse_assignment<'a>(field: &str, raw: &'a str) -> Result<(&'a str, &'a str)> {
    raw.rsplit_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .ok_or_else(|| PapError::InvalidConfigValueError {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "Use o formato codigo=valor".to_string(),
        })
}

pub fn parse_quantities(field: &str, entries: &[String]) -> Result<ServiceQuantities> {
    let mut quantities = ServiceQuantities::new();
    for entry in entries {
        let (service, raw_quantity) = parse_assignment(field, entry)?;
        let quantity = raw_quantity
            .parse::<u32>()
            .map_err(|e| PapError::InvalidConfigValueError {
                field: field.to_string(),
                value: entry.clone(),
                reason: format!("Quantidade inválida: {}", e),
            })?;
        quantities.set(service, quantity);
    }
    Ok(quantities)
}

/// Entries of the form `component:code=value`; the value may be `R$ 1.234,56` or plain digits.
pub fn parse_overrides(entries: &[String]) -> Result<RateOverrides> {
    let mut overrides = RateOverrides::new();
    for entry in entries {
        let (target, raw_value) = parse_assignment("override", entry)?;
        let (component, service) =
            target
                .split_once(':')
                .ok_or_else(|| PapError::InvalidConfigValueError {
                    field: "override".to_string(),
                    value: entry.clone(),
                    reason: "Use o formato componente:codigo=valor".to_string(),
                })?;
        let component: Component = component.parse()?;
        overrides.set(component, service.trim(), parse_currency(raw_value)?);
    }
    Ok(overrides)
}

pub fn parse_additional(entries: &[String]) -> Result<Option<AdditionalParameters>> {
    if entries.is_empty() {
        return Ok(None);
    }

    let mut additional = AdditionalParameters::default();
    for entry in entries {
        let (name, raw_value) = parse_assignment("additional", entry)?;
        let value: Decimal = parse_currency(raw_value)?;
        match name {
            "esf_eap" => additional.esf_eap = value,
            "oral_health" => additional.oral_health = value,
            "acs" => additional.acs = value,
            "strategic" => additional.strategic = value,
            other => {
                return Err(PapError::InvalidConfigValueError {
                    field: "additional".to_string(),
                    value: other.to_string(),
                    reason: "Use esf_eap, oral_health, acs ou strategic".to_string(),
                })
            }
        }
    }
    Ok(Some(additional))
}

pub fn parse_label(raw: Option<&str>) -> Result<Option<QualityLabel>> {
    raw.map(str::parse::<QualityLabel>).transpose()
}

impl CliConfig {
    pub fn calculation_input(&self) -> Result<CalculationInput> {
        let selection = ServiceSelection {
            quantities: parse_quantities("services", &self.services)?,
            implantation: parse_quantities("implantation", &self.implantation)?,
            overrides: parse_overrides(&self.overrides)?,
        };

        Ok(CalculationInput {
            selection,
            quality_label: parse_label(self.quality.as_deref())?,
            bond_label: parse_label(self.bond.as_deref())?,
            emulti_quality_label: parse_label(self.emulti_quality.as_deref())?,
            population: self.population,
            additional: parse_additional(&self.additional)?,
        })
    }
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn request(&self) -> ConsultRequest {
        ConsultRequest::new(self.ibge.as_str(), self.competencia.as_str())
    }

    fn use_cache(&self) -> bool {
        self.offline
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn bundle_output(&self) -> bool {
        self.bundle
    }

    fn request_timeout_seconds(&self) -> Option<u64> {
        self.timeout
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_output_formats("formats", &self.formats)?;
        if let Some(timeout) = self.timeout {
            validation::validate_positive_number("timeout", timeout, 1)?;
        }
        self.request().validate()
    }
}
