use crate::domain::labels::QualityLabel;
use crate::domain::outcome::{
    AdditionalParameters, ProjectionStep, ResourceProjection, ScenarioComparison,
};
use crate::utils::currency::round_cents;
use rust_decimal::Decimal;

/// Quarterly steps, 3 to 30 months.
pub const PROJECTION_PERIODS: [u32; 10] = [3, 6, 9, 12, 15, 18, 21, 24, 27, 30];

/// Compares the additional resources against the Regular scenario and spreads
/// the annual difference over the projection periods. A reduction is
/// scheduled by its absolute value and flagged in `is_reduction`.
pub fn project_resources(
    additional: &AdditionalParameters,
    comparison: &ScenarioComparison,
) -> ResourceProjection {
    let regular_scenario_total = comparison
        .row(QualityLabel::Regular)
        .map(|row| row.scenario_total)
        .unwrap_or(comparison.baseline_total);

    let additional_total = additional.total();
    let monthly_increase = additional_total - regular_scenario_total;
    let annual_increase = monthly_increase * Decimal::from(12);
    let base = annual_increase.abs();

    let schedule = PROJECTION_PERIODS
        .into_iter()
        .map(|months| {
            let percent = months / 3 * 10;
            ProjectionStep {
                months,
                percent,
                value: round_cents(base * Decimal::from(percent) / Decimal::ONE_HUNDRED),
            }
        })
        .collect();

    ResourceProjection {
        additional_total,
        regular_scenario_total,
        monthly_increase,
        annual_increase,
        is_reduction: annual_increase < Decimal::ZERO,
        schedule,
    }
}
