use calculadora_pap::core::projection::project_resources;
use calculadora_pap::core::scenarios::analyze;
use calculadora_pap::domain::labels::{EquityStratum, QualityLabel};
use calculadora_pap::domain::model::{MunicipalityContext, ServiceQuantities, ServiceSelection};
use calculadora_pap::domain::outcome::AdditionalParameters;
use calculadora_pap::utils::currency::format_currency;
use calculadora_pap::{PapCalculator, RateTable, ScenarioProjector};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn context(population: u64, stratum: EquityStratum, label: QualityLabel) -> MunicipalityContext {
    MunicipalityContext {
        uf: "PE".to_string(),
        municipio: "Recife".to_string(),
        competencia: "202502".to_string(),
        population,
        stratum,
        quality_label: label,
        bond_label: label,
        emulti_quality_label: None,
    }
}

fn mixed_selection() -> ServiceSelection {
    let mut selection = ServiceSelection::new(
        ServiceQuantities::new()
            .with("eSF", 12)
            .with("eAP 30h", 2)
            .with("eAP 20h", 1)
            .with("eMULTI Estrat.", 1)
            .with("eSB Modalidade II", 3)
            .with("LRPD Faixa II", 1)
            .with("ACS", 40)
            .with("Academia da Saúde", 2),
    );
    selection.implantation = ServiceQuantities::new().with("eAP 20h", 1);
    selection
}

#[test]
fn test_reference_municipality() {
    let rates = RateTable::builtin().unwrap();
    let calculator = PapCalculator::new(&rates);
    let selection = ServiceSelection::new(ServiceQuantities::new().with("eSF", 1));

    let result = calculator.calculate(
        &selection,
        &context(10000, EquityStratum::Two, QualityLabel::Bom),
    );

    assert_eq!(format_currency(result.fixed.subtotal), "R$ 16.000,00");
    assert_eq!(format_currency(result.quality.subtotal), "R$ 6.000,00");
    assert_eq!(format_currency(result.per_capita.subtotal), "R$ 4.958,33");
}

#[test]
fn test_total_is_sum_of_subtotals_for_every_stratum_and_label() {
    let rates = RateTable::builtin().unwrap();
    let calculator = PapCalculator::new(&rates);
    let selection = mixed_selection();

    for stratum in EquityStratum::ALL {
        for label in QualityLabel::ALL {
            let result = calculator.calculate(&selection, &context(41234, stratum, label));
            let sum: Decimal = result.components().iter().map(|c| c.subtotal).sum();
            assert_eq!(result.total, sum, "{} {}", stratum, label);
            assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        }
    }
}

#[test]
fn test_fixed_component_decreases_with_stratum() {
    let rates = RateTable::builtin().unwrap();
    let calculator = PapCalculator::new(&rates);
    let selection = mixed_selection();

    let fixed: Vec<Decimal> = EquityStratum::ALL
        .into_iter()
        .map(|stratum| {
            calculator
                .calculate(&selection, &context(41234, stratum, QualityLabel::Bom))
                .fixed
                .subtotal
        })
        .collect();

    assert!(fixed.windows(2).all(|pair| pair[0] > pair[1]));
}

#[test]
fn test_scenarios_only_move_bond_and_quality() {
    let rates = RateTable::builtin().unwrap();
    let calculator = PapCalculator::new(&rates);
    let projector = ScenarioProjector::new(&calculator);
    let selection = mixed_selection();
    let ctx = context(41234, EquityStratum::Three, QualityLabel::Suficiente);

    let current = calculator.calculate(&selection, &ctx);
    let comparison = projector.project(&selection, &ctx, &current);

    let rest = current.total - current.bond.subtotal - current.quality.subtotal;
    for row in &comparison.rows {
        assert_eq!(row.scenario_total, rest + row.bond + row.quality);

        let direct = calculator.calculate(&selection, &ctx.with_all_labels(row.label));
        assert_eq!(row.scenario_total, direct.total, "{}", row.label);
    }

    let totals: Vec<Decimal> = comparison.rows.iter().map(|r| r.scenario_total).collect();
    assert!(totals.windows(2).all(|pair| pair[0] < pair[1]));

    let analysis = analyze(&comparison);
    assert_eq!(analysis.annual_spread, analysis.monthly_spread * dec!(12));
}

#[test]
fn test_projection_against_regular_scenario() {
    let rates = RateTable::builtin().unwrap();
    let calculator = PapCalculator::new(&rates);
    let projector = ScenarioProjector::new(&calculator);
    let selection = ServiceSelection::new(ServiceQuantities::new().with("eSF", 1));
    let ctx = context(3000, EquityStratum::One, QualityLabel::Bom);

    let current = calculator.calculate(&selection, &ctx);
    let comparison = projector.project(&selection, &ctx, &current);
    let regular = comparison.row(QualityLabel::Regular).unwrap().scenario_total;

    let additional = AdditionalParameters {
        esf_eap: regular + dec!(1000),
        ..Default::default()
    };
    let projection = project_resources(&additional, &comparison);

    assert_eq!(projection.regular_scenario_total, regular);
    assert_eq!(projection.monthly_increase, dec!(1000));
    assert_eq!(projection.schedule.last().unwrap().value, dec!(12000));
}
