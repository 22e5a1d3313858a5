//! Component reducers for the PAP incentive.
//!
//! Every reducer walks its own slice of the rate tables, skips services with
//! quantity 0 and resolves the unit value with the user override first and
//! the table second. A value that cannot be resolved counts as zero and is
//! reported in `CalculationResult::warnings`.

use crate::domain::labels::QualityLabel;
use crate::domain::model::{
    CalculationResult, Component, ComponentBreakdown, ComponentRow, MunicipalityContext,
    ServiceSelection,
};
use crate::domain::rates::{
    is_emulti, is_esf_eap, RateTable, CORE_TEAMS, ORAL_HEALTH_CATEGORY, PER_CAPITA_SERVICE,
};
use crate::utils::currency::round_cents;
use rust_decimal::Decimal;

const IMPLANTATION_SUFFIX: &str = " (Implantação)";

pub struct PapCalculator<'a> {
    rates: &'a RateTable,
}

impl<'a> PapCalculator<'a> {
    pub fn new(rates: &'a RateTable) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RateTable {
        self.rates
    }

    fn resolve(
        &self,
        selection: &ServiceSelection,
        component: Component,
        service: &str,
        lookup: Option<Decimal>,
        warnings: &mut Vec<String>,
    ) -> Decimal {
        if let Some(value) = selection.overrides.get(component, service) {
            return value;
        }

        lookup.unwrap_or_else(|| {
            let message = format!(
                "Valor de {} não encontrado para {}; considerado R$ 0,00",
                component.title(),
                service
            );
            tracing::warn!("⚠️ {}", message);
            warnings.push(message);
            Decimal::ZERO
        })
    }

    /// Custeio of eSF/eAP (by stratum) and eMulti (catalog value).
    pub fn fixed_component(
        &self,
        selection: &ServiceSelection,
        context: &MunicipalityContext,
        warnings: &mut Vec<String>,
    ) -> ComponentBreakdown {
        let mut breakdown = ComponentBreakdown::new(Component::Fixed);

        for service in CORE_TEAMS {
            let quantity = selection.quantities.get(service);
            if quantity == 0 {
                continue;
            }

            let lookup = if is_esf_eap(service) {
                self.rates.fixed_rate(service, context.stratum)
            } else {
                self.rates.catalog_value(service)
            };
            let unit = self.resolve(selection, Component::Fixed, service, lookup, warnings);
            breakdown.push(service, None, unit, u64::from(quantity));
        }

        breakdown.finish()
    }

    pub fn bond_component(
        &self,
        selection: &ServiceSelection,
        label: QualityLabel,
        warnings: &mut Vec<String>,
    ) -> ComponentBreakdown {
        let mut breakdown = ComponentBreakdown::new(Component::Bond);

        for service in self.rates.bond_table().keys() {
            let quantity = selection.quantities.get(service);
            if quantity == 0 {
                continue;
            }

            let lookup = self.rates.bond_rate(service, label);
            let unit = self.resolve(selection, Component::Bond, service, lookup, warnings);
            breakdown.push(service.as_str(), Some(label), unit, u64::from(quantity));
        }

        breakdown.finish()
    }

    pub fn quality_component(
        &self,
        selection: &ServiceSelection,
        context: &MunicipalityContext,
        warnings: &mut Vec<String>,
    ) -> ComponentBreakdown {
        let mut breakdown = ComponentBreakdown::new(Component::Quality);

        for service in self.rates.quality_table().keys() {
            let quantity = selection.quantities.get(service);
            if quantity == 0 {
                continue;
            }

            let label = context.quality_label_for(service);
            let lookup = self.rates.quality_rate(service, label);
            let unit = self.resolve(selection, Component::Quality, service, lookup, warnings);
            breakdown.push(service.as_str(), Some(label), unit, u64::from(quantity));
        }

        breakdown.finish()
    }

    /// Implantation of new core teams plus implantation/maintenance of the
    /// other programs in the catalog.
    pub fn implementation_component(
        &self,
        selection: &ServiceSelection,
        warnings: &mut Vec<String>,
    ) -> ComponentBreakdown {
        let mut breakdown = ComponentBreakdown::new(Component::Implementation);

        for service in CORE_TEAMS {
            let new_teams = selection.implantation.get(service);
            if new_teams == 0 {
                continue;
            }
            if selection.quantities.get(service) == 0 {
                let message = format!(
                    "Implantação de {} ignorada: nenhuma equipe em custeio",
                    service
                );
                tracing::warn!("⚠️ {}", message);
                warnings.push(message);
                continue;
            }

            let lookup = self.rates.implantation_rate(service);
            let unit = self.resolve(selection, Component::Implementation, service, lookup, warnings);
            breakdown.push(
                format!("{}{}", service, IMPLANTATION_SUFFIX),
                None,
                unit,
                u64::from(new_teams),
            );
        }

        for (service, info) in self.rates.catalog() {
            if self.rates.quality_table().contains_key(service)
                || self.rates.is_oral_health(service)
                || CORE_TEAMS.contains(&service.as_str())
            {
                continue;
            }
            // Sem cálculo
            let Some(table_value) = info.value else {
                continue;
            };

            let quantity = selection.quantities.get(service);
            if quantity == 0 {
                continue;
            }

            let unit = self.resolve(
                selection,
                Component::Implementation,
                service,
                Some(table_value),
                warnings,
            );
            breakdown.push(service.as_str(), None, unit, u64::from(quantity));
        }

        breakdown.finish()
    }

    pub fn oral_health_component(
        &self,
        selection: &ServiceSelection,
        warnings: &mut Vec<String>,
    ) -> ComponentBreakdown {
        let mut breakdown = ComponentBreakdown::new(Component::OralHealth);

        for service in self.rates.category(ORAL_HEALTH_CATEGORY) {
            let quantity = selection.quantities.get(service);
            if quantity == 0 {
                continue;
            }

            let lookup = self
                .rates
                .service_info(service)
                .map(|info| info.value.unwrap_or(Decimal::ZERO));
            let unit = self.resolve(selection, Component::OralHealth, service, lookup, warnings);
            breakdown.push(service.as_str(), None, unit, u64::from(quantity));
        }

        breakdown.finish()
    }

    /// Annual value per inhabitant divided into twelve monthly transfers.
    pub fn per_capita_component(
        &self,
        selection: &ServiceSelection,
        population: u64,
    ) -> ComponentBreakdown {
        let mut breakdown = ComponentBreakdown::new(Component::PerCapita);

        let annual = selection
            .overrides
            .get(Component::PerCapita, PER_CAPITA_SERVICE)
            .unwrap_or_else(|| self.rates.per_capita_annual());

        breakdown.push_row(ComponentRow {
            service: PER_CAPITA_SERVICE.to_string(),
            label: None,
            unit_value: annual,
            quantity: population,
            total: annual * Decimal::from(population) / Decimal::from(12),
        });

        breakdown.finish()
    }

    pub fn calculate(
        &self,
        selection: &ServiceSelection,
        context: &MunicipalityContext,
    ) -> CalculationResult {
        let mut warnings = Vec::new();

        let fixed = self.fixed_component(selection, context, &mut warnings);
        let bond = self.bond_component(selection, context.bond_label, &mut warnings);
        let quality = self.quality_component(selection, context, &mut warnings);
        let implementation = self.implementation_component(selection, &mut warnings);
        let oral_health = self.oral_health_component(selection, &mut warnings);
        let per_capita = self.per_capita_component(selection, context.population);

        let total = fixed.subtotal
            + bond.subtotal
            + quality.subtotal
            + implementation.subtotal
            + oral_health.subtotal
            + per_capita.subtotal;

        let esf_eap_subtotal =
            team_subtotal(&[&fixed, &implementation, &quality, &bond], is_esf_eap);
        let emulti_subtotal = team_subtotal(&[&fixed, &implementation, &quality], is_emulti);

        tracing::debug!(
            "Calculated {} / {}: total {}",
            context.municipio,
            context.competencia,
            total
        );

        CalculationResult {
            fixed,
            bond,
            quality,
            implementation,
            oral_health,
            per_capita,
            total,
            esf_eap_subtotal,
            emulti_subtotal,
            warnings,
        }
    }
}

fn team_subtotal(parts: &[&ComponentBreakdown], matches: fn(&str) -> bool) -> Decimal {
    let sum: Decimal = parts
        .iter()
        .flat_map(|part| part.rows.iter())
        .filter(|row| {
            let base = row
                .service
                .strip_suffix(IMPLANTATION_SUFFIX)
                .unwrap_or(row.service.as_str());
            matches(base)
        })
        .map(|row| row.total)
        .sum();
    round_cents(sum)
}
