use crate::domain::labels::QualityLabel;
use crate::domain::model::{CalculationResult, MunicipalityContext};
use crate::domain::report::ReportedValues;
use crate::utils::currency::format_currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub label: QualityLabel,
    pub bond: Decimal,
    pub quality: Decimal,
    pub scenario_total: Decimal,
    pub monthly_difference: Decimal,
    pub annual_difference: Decimal,
    pub variation_percent: Decimal,
}

/// Current total against the four classification scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub baseline_total: Decimal,
    pub rows: Vec<ScenarioRow>,
}

impl ScenarioComparison {
    pub fn row(&self, label: QualityLabel) -> Option<&ScenarioRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

/// Worst (Regular) against best (Ótimo) performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAnalysis {
    pub worst_total: Decimal,
    pub best_total: Decimal,
    pub monthly_spread: Decimal,
    pub spread_percent: Decimal,
    pub annual_spread: Decimal,
}

/// Extra monthly resources the municipality expects to add.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalParameters {
    #[serde(default)]
    pub esf_eap: Decimal,
    #[serde(default)]
    pub oral_health: Decimal,
    #[serde(default)]
    pub acs: Decimal,
    #[serde(default)]
    pub strategic: Decimal,
}

impl AdditionalParameters {
    pub fn total(&self) -> Decimal {
        self.esf_eap + self.oral_health + self.acs + self.strategic
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionStep {
    pub months: u32,
    pub percent: u32,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProjection {
    pub additional_total: Decimal,
    pub regular_scenario_total: Decimal,
    pub monthly_increase: Decimal,
    pub annual_increase: Decimal,
    pub is_reduction: bool,
    pub schedule: Vec<ProjectionStep>,
}

/// Everything one run produces; serialized as `resultado.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    pub context: MunicipalityContext,
    pub result: CalculationResult,
    pub scenarios: ScenarioComparison,
    pub analysis: ScenarioAnalysis,
    pub projection: Option<ResourceProjection>,
    pub reported: ReportedValues,
    pub warnings: Vec<String>,
}

impl CalculationOutcome {
    /// Console report of the run.
    pub fn summary_lines(&self) -> Vec<String> {
        let context = &self.context;
        let mut lines = vec![
            format!(
                "{} - {} | Competência {} | População {} | {}",
                context.municipio, context.uf, context.competencia, context.population, context.stratum
            ),
            format!(
                "Qualidade: {} | Vínculo: {}{}",
                context.quality_label,
                context.bond_label,
                context
                    .emulti_quality_label
                    .map(|label| format!(" | Qualidade eMulti: {}", label))
                    .unwrap_or_default()
            ),
            String::new(),
        ];

        lines.extend(self.result.summary_lines());

        lines.push(String::new());
        lines.push(format!(
            "{:<12} {:>18} {:>18} {:>18} {:>9}",
            "Cenário", "Total", "Dif. mensal", "Dif. anual", "Var. %"
        ));
        for row in &self.scenarios.rows {
            lines.push(format!(
                "{:<12} {:>18} {:>18} {:>18} {:>9}",
                row.label.as_str(),
                format_currency(row.scenario_total),
                format_currency(row.monthly_difference),
                format_currency(row.annual_difference),
                format!("{:.2}", row.variation_percent)
            ));
        }
        lines.push(format!(
            "Regular → Ótimo: {} por mês ({:.2}%), {} por ano",
            format_currency(self.analysis.monthly_spread),
            self.analysis.spread_percent,
            format_currency(self.analysis.annual_spread)
        ));

        if let Some(projection) = &self.projection {
            lines.push(String::new());
            lines.push(format!(
                "Recursos adicionais {} contra cenário Regular {}: {} {} por mês",
                format_currency(projection.additional_total),
                format_currency(projection.regular_scenario_total),
                if projection.is_reduction { "redução de" } else { "aumento de" },
                format_currency(projection.monthly_increase.abs())
            ));
            for step in &projection.schedule {
                lines.push(format!(
                    "  {:>2} meses ({:>3}%): {}",
                    step.months,
                    step.percent,
                    format_currency(step.value)
                ));
            }
        }

        if !self.reported.teams.is_empty() {
            lines.push(String::new());
            lines.push("Valores pagos na competência:".to_string());
            for team in &self.reported.teams {
                lines.push(format!(
                    "  {} ({}): {}",
                    team.team,
                    team.quantity,
                    format_currency(team.total)
                ));
            }
            lines.push(format!(
                "  Repasse efetivo total: {}",
                format_currency(self.reported.effective_transfer_total)
            ));
        }

        for warning in &self.warnings {
            lines.push(format!("⚠️ {}", warning));
        }

        lines
    }
}
