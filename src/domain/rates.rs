//! Static rate tables loaded from `config.json`.

use crate::domain::labels::{EquityStratum, QualityLabel};
use crate::utils::currency::{currency_to_decimal, NO_CALCULATION};
use crate::utils::error::{PapError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

const BUILTIN_CONFIG: &str = include_str!("../../config.json");

pub const ESF_EAP_TEAMS: [&str; 3] = ["eSF", "eAP 30h", "eAP 20h"];
pub const EMULTI_TEAMS: [&str; 3] = ["eMULTI Ampl.", "eMULTI Compl.", "eMULTI Estrat."];
pub const CORE_TEAMS: [&str; 6] = [
    "eSF",
    "eAP 30h",
    "eAP 20h",
    "eMULTI Ampl.",
    "eMULTI Compl.",
    "eMULTI Estrat.",
];
pub const ORAL_HEALTH_CATEGORY: &str = "Saúde Bucal";
/// Row name of the per-capita component; also the override key for its annual rate.
pub const PER_CAPITA_SERVICE: &str = "Per capita";

const DEFAULT_PER_CAPITA_ANNUAL: Decimal = dec!(5.95);

/// `implantacao_values` names the eMulti teams differently from the catalog.
pub fn implantation_alias(code: &str) -> Option<&'static str> {
    match code {
        "eMULTI Ampl." => Some("eMulti Ampliada"),
        "eMULTI Compl." => Some("eMulti Complementar"),
        "eMULTI Estrat." => Some("eMulti Estratégica"),
        _ => None,
    }
}

pub fn is_emulti(code: &str) -> bool {
    EMULTI_TEAMS.contains(&code)
}

pub fn is_esf_eap(code: &str) -> bool {
    ESF_EAP_TEAMS.contains(&code)
}

pub type LabelRates = BTreeMap<QualityLabel, Decimal>;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInfo {
    /// `None` when the table marks the service as `Sem cálculo`.
    pub value: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawServiceInfo {
    valor: Option<serde_json::Value>,
    descricao: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRateConfig {
    data: Option<BTreeMap<String, RawServiceInfo>>,
    quality_values: Option<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    vinculo_values: Option<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    fixed_component_values: Option<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    implantacao_values: Option<BTreeMap<String, serde_json::Value>>,
    updated_categories: Option<BTreeMap<String, Vec<String>>>,
    per_capita_annual: Option<serde_json::Value>,
}

/// Read-only rate tables keyed by service code.
#[derive(Debug, Clone)]
pub struct RateTable {
    catalog: BTreeMap<String, ServiceInfo>,
    quality: BTreeMap<String, LabelRates>,
    bond: BTreeMap<String, LabelRates>,
    fixed: BTreeMap<EquityStratum, BTreeMap<String, Decimal>>,
    implantation: BTreeMap<String, Decimal>,
    categories: BTreeMap<String, Vec<String>>,
    per_capita_annual: Decimal,
}

fn value_to_decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .unwrap_or_else(|_| {
                tracing::warn!("⚠️ Valor numérico inválido na tabela: {}", n);
                Decimal::ZERO
            }),
        serde_json::Value::String(s) => currency_to_decimal(s),
        other => {
            tracing::warn!("⚠️ Valor inesperado na tabela: {}", other);
            Decimal::ZERO
        }
    }
}

fn label_rates(
    section: &str,
    raw: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
) -> BTreeMap<String, LabelRates> {
    raw.into_iter()
        .map(|(service, levels)| {
            let rates = levels
                .iter()
                .filter_map(|(label, value)| match label.parse::<QualityLabel>() {
                    Ok(label) => Some((label, value_to_decimal(value))),
                    Err(_) => {
                        tracing::warn!(
                            "⚠️ {}: classificação '{}' ignorada para {}",
                            section,
                            label,
                            service
                        );
                        None
                    }
                })
                .collect();
            (service, rates)
        })
        .collect()
}

fn builtin_bond_values() -> BTreeMap<String, LabelRates> {
    let rows: [(&str, [Decimal; 4]); 3] = [
        ("eSF", [dec!(2000), dec!(4000), dec!(6000), dec!(8000)]),
        ("eAP 30h", [dec!(1000), dec!(2000), dec!(3000), dec!(4000)]),
        ("eAP 20h", [dec!(750), dec!(1500), dec!(2250), dec!(3000)]),
    ];

    rows.into_iter()
        .map(|(service, values)| {
            let rates = QualityLabel::ALL.into_iter().zip(values).collect();
            (service.to_string(), rates)
        })
        .collect()
}

impl RateTable {
    /// Tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CONFIG)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| PapError::ConfigError {
            message: format!(
                "Arquivo de configuração não encontrado: {} ({})",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawRateConfig =
            serde_json::from_str(content).map_err(|e| PapError::ConfigValidationError {
                field: "config.json".to_string(),
                message: format!("Erro ao decodificar JSON: {}", e),
            })?;

        let missing = |field: &str| PapError::MissingConfigError {
            field: field.to_string(),
        };

        let data = raw.data.ok_or_else(|| missing("data"))?;
        let quality_values = raw.quality_values.ok_or_else(|| missing("quality_values"))?;
        let fixed_values = raw
            .fixed_component_values
            .ok_or_else(|| missing("fixed_component_values"))?;

        let catalog = data
            .into_iter()
            .map(|(service, info)| {
                let value = match &info.valor {
                    None => None,
                    Some(serde_json::Value::String(s)) if s.trim() == NO_CALCULATION => None,
                    Some(v) => Some(value_to_decimal(v)),
                };
                (
                    service,
                    ServiceInfo {
                        value,
                        description: info.descricao,
                    },
                )
            })
            .collect();

        let mut fixed = BTreeMap::new();
        for (stratum, services) in fixed_values {
            let stratum = stratum
                .trim()
                .trim_start_matches("ESTRATO ")
                .parse::<u8>()
                .ok()
                .and_then(|n| EquityStratum::try_from(n).ok())
                .ok_or_else(|| PapError::InvalidConfigValueError {
                    field: "fixed_component_values".to_string(),
                    value: stratum.clone(),
                    reason: "Estrato deve ser 1, 2, 3 ou 4".to_string(),
                })?;
            let rates = services
                .iter()
                .map(|(service, value)| (service.clone(), value_to_decimal(value)))
                .collect();
            fixed.insert(stratum, rates);
        }

        let bond = match raw.vinculo_values {
            Some(values) => label_rates("vinculo_values", values),
            None => builtin_bond_values(),
        };

        let implantation = raw
            .implantacao_values
            .unwrap_or_default()
            .iter()
            .map(|(service, value)| (service.clone(), value_to_decimal(value)))
            .collect();

        let per_capita_annual = raw
            .per_capita_annual
            .as_ref()
            .map(value_to_decimal)
            .unwrap_or(DEFAULT_PER_CAPITA_ANNUAL);

        let table = Self {
            catalog,
            quality: label_rates("quality_values", quality_values),
            bond,
            fixed,
            implantation,
            categories: raw.updated_categories.unwrap_or_default(),
            per_capita_annual,
        };

        tracing::debug!(
            "Rate tables loaded: {} services, {} quality rows, {} strata",
            table.catalog.len(),
            table.quality.len(),
            table.fixed.len()
        );

        Ok(table)
    }

    pub fn catalog(&self) -> &BTreeMap<String, ServiceInfo> {
        &self.catalog
    }

    pub fn service_info(&self, code: &str) -> Option<&ServiceInfo> {
        self.catalog.get(code)
    }

    /// Catalog `valor`; `None` for unknown services and `Sem cálculo`.
    pub fn catalog_value(&self, code: &str) -> Option<Decimal> {
        self.catalog.get(code).and_then(|info| info.value)
    }

    pub fn fixed_rate(&self, code: &str, stratum: EquityStratum) -> Option<Decimal> {
        self.fixed
            .get(&stratum)
            .and_then(|services| services.get(code))
            .copied()
    }

    pub fn quality_table(&self) -> &BTreeMap<String, LabelRates> {
        &self.quality
    }

    pub fn bond_table(&self) -> &BTreeMap<String, LabelRates> {
        &self.bond
    }

    pub fn quality_rate(&self, code: &str, label: QualityLabel) -> Option<Decimal> {
        self.quality.get(code).and_then(|r| r.get(&label)).copied()
    }

    pub fn bond_rate(&self, code: &str, label: QualityLabel) -> Option<Decimal> {
        self.bond.get(code).and_then(|r| r.get(&label)).copied()
    }

    pub fn implantation_rate(&self, code: &str) -> Option<Decimal> {
        self.implantation.get(code).copied().or_else(|| {
            implantation_alias(code).and_then(|alias| self.implantation.get(alias).copied())
        })
    }

    pub fn category(&self, name: &str) -> &[String] {
        self.categories
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_oral_health(&self, code: &str) -> bool {
        self.category(ORAL_HEALTH_CATEGORY)
            .iter()
            .any(|service| service == code)
    }

    pub fn per_capita_annual(&self) -> Decimal {
        self.per_capita_annual
    }

    pub fn is_known(&self, code: &str) -> bool {
        self.catalog.contains_key(code)
            || self.quality.contains_key(code)
            || self.bond.contains_key(code)
            || self.fixed.values().any(|services| services.contains_key(code))
            || self.categories.values().any(|list| list.iter().any(|s| s == code))
    }

    /// Every service code the tables mention.
    pub fn known_services(&self) -> BTreeSet<&str> {
        let mut codes: BTreeSet<&str> = self.catalog.keys().map(String::as_str).collect();
        codes.extend(self.quality.keys().map(String::as_str));
        codes.extend(self.bond.keys().map(String::as_str));
        for services in self.fixed.values() {
            codes.extend(services.keys().map(String::as_str));
        }
        for list in self.categories.values() {
            codes.extend(list.iter().map(String::as_str));
        }
        codes
    }
}
