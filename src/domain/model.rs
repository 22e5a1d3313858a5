use crate::domain::labels::{EquityStratum, QualityLabel};
use crate::utils::currency::{format_currency, round_cents};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Municipality data for one calculation run, taken from the payment report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityContext {
    pub uf: String,
    pub municipio: String,
    pub competencia: String,
    pub population: u64,
    pub stratum: EquityStratum,
    pub quality_label: QualityLabel,
    pub bond_label: QualityLabel,
    /// eMulti teams are classified separately by the ministry.
    pub emulti_quality_label: Option<QualityLabel>,
}

impl MunicipalityContext {
    /// Context taken from the first payment record of `report`.
    pub fn from_report(
        report: &crate::domain::report::PaymentReport,
        request: &crate::domain::report::ConsultRequest,
    ) -> crate::utils::error::Result<Self> {
        report.municipality_context(request)
    }

    pub fn quality_label_for(&self, service: &str) -> QualityLabel {
        if crate::domain::rates::is_emulti(service) {
            self.emulti_quality_label.unwrap_or(self.quality_label)
        } else {
            self.quality_label
        }
    }

    /// Same municipality with every classification set to `label`.
    pub fn with_all_labels(&self, label: QualityLabel) -> Self {
        Self {
            quality_label: label,
            bond_label: label,
            emulti_quality_label: self.emulti_quality_label.map(|_| label),
            ..self.clone()
        }
    }
}

/// Service code to team/unit count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceQuantities(BTreeMap<String, u32>);

impl ServiceQuantities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: &str, quantity: u32) -> Self {
        self.set(service, quantity);
        self
    }

    pub fn set(&mut self, service: &str, quantity: u32) {
        self.0.insert(service.to_string(), quantity);
    }

    pub fn get(&self, service: &str) -> u32 {
        self.0.get(service).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|q| u64::from(*q)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl FromIterator<(String, u32)> for ServiceQuantities {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Fixed,
    Bond,
    Quality,
    Implementation,
    OralHealth,
    PerCapita,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Fixed,
        Component::Bond,
        Component::Quality,
        Component::Implementation,
        Component::OralHealth,
        Component::PerCapita,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Component::Fixed => "Componente Fixo",
            Component::Bond => "Vínculo e Acompanhamento Territorial",
            Component::Quality => "Qualidade",
            Component::Implementation => "Implantação e Manutenção",
            Component::OralHealth => "Saúde Bucal",
            Component::PerCapita => "Per Capita",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Component::Fixed => "fixed",
            Component::Bond => "bond",
            Component::Quality => "quality",
            Component::Implementation => "implementation",
            Component::OralHealth => "oral_health",
            Component::PerCapita => "per_capita",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl std::str::FromStr for Component {
    type Err = crate::utils::error::PapError;

    fn from_str(s: &str) -> crate::utils::error::Result<Self> {
        Component::ALL
            .into_iter()
            .find(|c| c.key() == s.trim())
            .ok_or_else(|| crate::utils::error::PapError::InvalidConfigValueError {
                field: "component".to_string(),
                value: s.to_string(),
                reason: "Use fixed, bond, quality, implementation, oral_health ou per_capita"
                    .to_string(),
            })
    }
}

/// User-entered unit values, scoped per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateOverrides(BTreeMap<Component, BTreeMap<String, Decimal>>);

impl RateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, component: Component, service: &str, value: Decimal) -> Self {
        self.set(component, service, value);
        self
    }

    pub fn set(&mut self, component: Component, service: &str, value: Decimal) {
        self.0
            .entry(component)
            .or_default()
            .insert(service.to_string(), value);
    }

    pub fn get(&self, component: Component, service: &str) -> Option<Decimal> {
        self.0.get(&component).and_then(|m| m.get(service)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Component, &str, Decimal)> {
        self.0.iter().flat_map(|(component, services)| {
            services
                .iter()
                .map(move |(service, value)| (*component, service.as_str(), *value))
        })
    }
}

/// Quantities entered by the user plus optional overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSelection {
    pub quantities: ServiceQuantities,
    /// New teams being implanted this period; only counted for teams with custeio.
    #[serde(default)]
    pub implantation: ServiceQuantities,
    #[serde(default)]
    pub overrides: RateOverrides,
}

impl ServiceSelection {
    pub fn new(quantities: ServiceQuantities) -> Self {
        Self {
            quantities,
            ..Default::default()
        }
    }

    pub fn has_services(&self) -> bool {
        !self.quantities.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRow {
    pub service: String,
    pub label: Option<QualityLabel>,
    pub unit_value: Decimal,
    pub quantity: u64,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub component: Component,
    pub rows: Vec<ComponentRow>,
    pub subtotal: Decimal,
}

impl ComponentBreakdown {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            rows: Vec::new(),
            subtotal: Decimal::ZERO,
        }
    }

    pub fn push(
        &mut self,
        service: impl Into<String>,
        label: Option<QualityLabel>,
        unit_value: Decimal,
        quantity: u64,
    ) {
        let total = unit_value * Decimal::from(quantity);
        self.push_row(ComponentRow {
            service: service.into(),
            label,
            unit_value,
            quantity,
            total,
        });
    }

    /// For rows whose total is not `unit_value * quantity` (per capita).
    pub fn push_row(&mut self, row: ComponentRow) {
        self.subtotal += row.total;
        self.rows.push(row);
    }

    /// Rounds the subtotal to cents once every row is in.
    pub fn finish(mut self) -> Self {
        self.subtotal = round_cents(self.subtotal);
        self
    }

    pub fn row(&self, service: &str) -> Option<&ComponentRow> {
        self.rows.iter().find(|r| r.service == service)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub fixed: ComponentBreakdown,
    pub bond: ComponentBreakdown,
    pub quality: ComponentBreakdown,
    pub implementation: ComponentBreakdown,
    pub oral_health: ComponentBreakdown,
    pub per_capita: ComponentBreakdown,
    pub total: Decimal,
    /// Fixed, implantation, quality and bond values of eSF/eAP teams.
    pub esf_eap_subtotal: Decimal,
    /// Fixed, implantation and quality values of eMulti teams.
    pub emulti_subtotal: Decimal,
    pub warnings: Vec<String>,
}

impl CalculationResult {
    pub fn components(&self) -> [&ComponentBreakdown; 6] {
        [
            &self.fixed,
            &self.bond,
            &self.quality,
            &self.implementation,
            &self.oral_health,
            &self.per_capita,
        ]
    }

    pub fn component(&self, component: Component) -> &ComponentBreakdown {
        match component {
            Component::Fixed => &self.fixed,
            Component::Bond => &self.bond,
            Component::Quality => &self.quality,
            Component::Implementation => &self.implementation,
            Component::OralHealth => &self.oral_health,
            Component::PerCapita => &self.per_capita,
        }
    }

    pub fn annual_total(&self) -> Decimal {
        self.total * Decimal::from(12)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .components()
            .iter()
            .map(|c| format!("{:<40} {:>20}", c.component.title(), format_currency(c.subtotal)))
            .collect();
        lines.push(format!("{:<40} {:>20}", "Total Mensal", format_currency(self.total)));
        lines.push(format!(
            "{:<40} {:>20}",
            "Total Anual",
            format_currency(self.annual_total())
        ));
        lines
    }
}
