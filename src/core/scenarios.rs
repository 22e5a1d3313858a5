use crate::core::calculator::PapCalculator;
use crate::domain::labels::QualityLabel;
use crate::domain::model::{CalculationResult, MunicipalityContext, ServiceSelection};
use crate::domain::outcome::{ScenarioAnalysis, ScenarioComparison, ScenarioRow};
use crate::utils::currency::round_cents;
use rust_decimal::Decimal;

fn percent_of(part: Decimal, base: Decimal) -> Decimal {
    if base.is_zero() {
        Decimal::ZERO
    } else {
        (part / base * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// Re-prices bond and quality under each classification, keeping every other
/// component of the current result.
pub struct ScenarioProjector<'a> {
    calculator: &'a PapCalculator<'a>,
}

impl<'a> ScenarioProjector<'a> {
    pub fn new(calculator: &'a PapCalculator<'a>) -> Self {
        Self { calculator }
    }

    pub fn scenario(
        &self,
        selection: &ServiceSelection,
        context: &MunicipalityContext,
        current: &CalculationResult,
        label: QualityLabel,
    ) -> ScenarioRow {
        let scenario_context = context.with_all_labels(label);
        // Rate warnings were already reported by the current result
        let mut discarded = Vec::new();

        let bond = self
            .calculator
            .bond_component(selection, label, &mut discarded)
            .subtotal;
        let quality = self
            .calculator
            .quality_component(selection, &scenario_context, &mut discarded)
            .subtotal;

        let scenario_total =
            current.total - current.bond.subtotal - current.quality.subtotal + bond + quality;
        let monthly_difference = scenario_total - current.total;

        ScenarioRow {
            label,
            bond,
            quality,
            scenario_total,
            monthly_difference,
            annual_difference: monthly_difference * Decimal::from(12),
            variation_percent: percent_of(monthly_difference, current.total),
        }
    }

    pub fn project(
        &self,
        selection: &ServiceSelection,
        context: &MunicipalityContext,
        current: &CalculationResult,
    ) -> ScenarioComparison {
        let rows = QualityLabel::ALL
            .into_iter()
            .map(|label| self.scenario(selection, context, current, label))
            .collect();

        ScenarioComparison {
            baseline_total: current.total,
            rows,
        }
    }
}

/// Spread between the worst and the best classification.
pub fn analyze(comparison: &ScenarioComparison) -> ScenarioAnalysis {
    let total_for = |label| {
        comparison
            .row(label)
            .map(|row| row.scenario_total)
            .unwrap_or(comparison.baseline_total)
    };

    let worst_total = total_for(QualityLabel::Regular);
    let best_total = total_for(QualityLabel::Otimo);
    let monthly_spread = best_total - worst_total;

    ScenarioAnalysis {
        worst_total,
        best_total,
        monthly_spread,
        spread_percent: percent_of(monthly_spread, worst_total),
        annual_spread: round_cents(monthly_spread * Decimal::from(12)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::EquityStratum;
    use crate::domain::model::ServiceQuantities;
    use crate::domain::rates::RateTable;
    use rust_decimal_macros::dec;

    fn context(label: QualityLabel) -> MunicipalityContext {
        MunicipalityContext {
            uf: "BA".to_string(),
            municipio: "Ilhéus".to_string(),
            competencia: "202503".to_string(),
            population: 10000,
            stratum: EquityStratum::Two,
            quality_label: label,
            bond_label: label,
            emulti_quality_label: None,
        }
    }

    #[test]
    fn test_current_label_scenario_has_no_difference() {
        let rates = RateTable::builtin().unwrap();
        let calculator = PapCalculator::new(&rates);
        let projector = ScenarioProjector::new(&calculator);
        let selection = ServiceSelection::new(
            ServiceQuantities::new()
                .with("eSF", 3)
                .with("eMULTI Compl.", 1)
                .with("eSB Modalidade I", 2),
        );
        let ctx = context(QualityLabel::Suficiente);
        let current = calculator.calculate(&selection, &ctx);

        let comparison = projector.project(&selection, &ctx, &current);

        assert_eq!(comparison.rows.len(), 4);
        let same = comparison.row(QualityLabel::Suficiente).unwrap();
        assert_eq!(same.scenario_total, current.total);
        assert_eq!(same.monthly_difference, Decimal::ZERO);
        assert_eq!(same.variation_percent, Decimal::ZERO);
    }

    #[test]
    fn test_scenarios_for_single_esf() {
        let rates = RateTable::builtin().unwrap();
        let calculator = PapCalculator::new(&rates);
        let projector = ScenarioProjector::new(&calculator);
        let selection = ServiceSelection::new(ServiceQuantities::new().with("eSF", 1));
        let ctx = context(QualityLabel::Bom);
        let current = calculator.calculate(&selection, &ctx);

        let comparison = projector.project(&selection, &ctx, &current);

        let otimo = comparison.row(QualityLabel::Otimo).unwrap();
        assert_eq!(otimo.bond, dec!(8000));
        assert_eq!(otimo.quality, dec!(8000));
        assert_eq!(otimo.monthly_difference, dec!(4000));
        assert_eq!(otimo.annual_difference, dec!(48000));

        let regular = comparison.row(QualityLabel::Regular).unwrap();
        assert_eq!(regular.monthly_difference, dec!(-8000));

        let analysis = analyze(&comparison);
        assert_eq!(analysis.monthly_spread, dec!(12000));
        assert_eq!(analysis.annual_spread, dec!(144000));
        assert_eq!(analysis.best_total - analysis.worst_total, dec!(12000));
    }

    #[test]
    fn test_zero_baseline_has_zero_variation() {
        let comparison = ScenarioComparison {
            baseline_total: Decimal::ZERO,
            rows: vec![ScenarioRow {
                label: QualityLabel::Regular,
                bond: Decimal::ZERO,
                quality: Decimal::ZERO,
                scenario_total: Decimal::ZERO,
                monthly_difference: Decimal::ZERO,
                annual_difference: Decimal::ZERO,
                variation_percent: Decimal::ZERO,
            }],
        };

        let analysis = analyze(&comparison);
        assert_eq!(analysis.spread_percent, Decimal::ZERO);
        assert_eq!(percent_of(dec!(10), Decimal::ZERO), Decimal::ZERO);
    }
}
