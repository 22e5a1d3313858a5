use crate::domain::model::{Component, MunicipalityContext, ServiceSelection};
use crate::domain::outcome::AdditionalParameters;
use crate::domain::rates::{RateTable, PER_CAPITA_SERVICE};
use crate::utils::error::{PapError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use url::Url;

pub const MAX_SERVICE_QUANTITY: u32 = 1000;
pub const MAX_SERVICE_VALUE: Decimal = dec!(1000000);
pub const MIN_POPULATION: u64 = 1;
pub const MAX_POPULATION: u64 = 20_000_000;
pub const SUPPORTED_FORMATS: [&str; 2] = ["csv", "json"];

const MIN_PEOPLE_PER_ESF: u64 = 2000;
const MAX_PEOPLE_PER_ESF: u64 = 3500;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL não pode ser vazia".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(PapError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Esquema de URL não suportado: {}", scheme),
            }),
        },
        Err(e) => Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("URL inválida: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Caminho não pode ser vazio".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Caminho contém bytes nulos".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Valor deve ser no mínimo {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_output_formats(field_name: &str, formats: &[String]) -> Result<()> {
    if formats.is_empty() {
        return Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: String::new(),
            reason: "Informe ao menos um formato de saída".to_string(),
        });
    }

    for format in formats {
        if !SUPPORTED_FORMATS.contains(&format.as_str()) {
            return Err(PapError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!(
                    "Formato não suportado. Formatos aceitos: {}",
                    SUPPORTED_FORMATS.join(", ")
                ),
            });
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Valor não pode ser vazio".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(PapError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Valor deve estar entre {} e {}", min, max),
        });
    }
    Ok(())
}

fn validation_error(message: String) -> PapError {
    PapError::ValidationError { message }
}

/// Quantities, implantation counts and overrides entered for one run.
pub fn validate_selection(rates: &RateTable, selection: &ServiceSelection) -> Result<()> {
    for (service, quantity) in selection
        .quantities
        .iter()
        .chain(selection.implantation.iter())
    {
        if !rates.is_known(service) {
            return Err(validation_error(format!("Serviço desconhecido: {}", service)));
        }
        if quantity > MAX_SERVICE_QUANTITY {
            return Err(validation_error(format!(
                "Quantidade muito alta para {}: {} (máximo {})",
                service, quantity, MAX_SERVICE_QUANTITY
            )));
        }
    }

    for (component, service, value) in selection.overrides.iter() {
        let per_capita = component == Component::PerCapita && service == PER_CAPITA_SERVICE;
        if !per_capita && !rates.is_known(service) {
            return Err(validation_error(format!(
                "Serviço desconhecido em valores editados ({}): {}",
                component.key(),
                service
            )));
        }
        if value < Decimal::ZERO {
            return Err(validation_error(format!(
                "Valor negativo para {} ({}): {}",
                service,
                component.key(),
                value
            )));
        }
        if value > MAX_SERVICE_VALUE {
            return Err(validation_error(format!(
                "Valor muito alto para {} ({}): {}",
                service,
                component.key(),
                value
            )));
        }
    }

    if !selection.quantities.iter().any(|(_, quantity)| quantity > 0) {
        return Err(validation_error(
            "Nenhum serviço selecionado: informe ao menos uma quantidade maior que zero"
                .to_string(),
        ));
    }

    Ok(())
}

pub fn validate_context(context: &MunicipalityContext) -> Result<()> {
    if context.population < MIN_POPULATION {
        return Err(validation_error(format!(
            "População muito baixa para {}: {}",
            context.municipio, context.population
        )));
    }
    if context.population > MAX_POPULATION {
        return Err(validation_error(format!(
            "População muito alta para {}: {}",
            context.municipio, context.population
        )));
    }
    Ok(())
}

pub fn validate_additional(parameters: &AdditionalParameters) -> Result<()> {
    let fields = [
        ("esf_eap", parameters.esf_eap),
        ("oral_health", parameters.oral_health),
        ("acs", parameters.acs),
        ("strategic", parameters.strategic),
    ];

    for (name, value) in fields {
        if value < Decimal::ZERO || value > MAX_SERVICE_VALUE {
            return Err(validation_error(format!(
                "Valor adicional fora do intervalo para {}: {} (0 a {})",
                name, value, MAX_SERVICE_VALUE
            )));
        }
    }
    Ok(())
}

/// Advisory checks; a run still proceeds when these fail.
pub fn business_rule_warnings(
    selection: &ServiceSelection,
    context: &MunicipalityContext,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let esf = u64::from(selection.quantities.get("eSF"));
    let eap = u64::from(selection.quantities.get("eAP 30h"))
        + u64::from(selection.quantities.get("eAP 20h"));

    if esf > 0 && eap > esf {
        warnings.push(format!(
            "Número de eAP ({}) maior que o de eSF ({})",
            eap, esf
        ));
    }

    if esf > 0 && context.population > 0 {
        let per_team = context.population / esf;
        if per_team < MIN_PEOPLE_PER_ESF {
            warnings.push(format!(
                "Muitas eSF para a população: cada eSF atende {} pessoas (mínimo recomendado: 2.000)",
                per_team
            ));
        } else if per_team > MAX_PEOPLE_PER_ESF {
            warnings.push(format!(
                "Poucas eSF para a população: cada eSF atende {} pessoas (máximo recomendado: 3.500)",
                per_team
            ));
        }
    }

    for warning in &warnings {
        tracing::warn!("⚠️ {}", warning);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::{EquityStratum, QualityLabel};
    use crate::domain::model::{RateOverrides, ServiceQuantities};

    fn context(population: u64) -> MunicipalityContext {
        MunicipalityContext {
            uf: "SP".to_string(),
            municipio: "Campinas".to_string(),
            competencia: "202501".to_string(),
            population,
            stratum: EquityStratum::One,
            quality_label: QualityLabel::Bom,
            bond_label: QualityLabel::Bom,
            emulti_quality_label: None,
        }
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_endpoint", "https://relatorioaps-prd.saude.gov.br").is_ok());
        assert!(validate_url("api_endpoint", "http://localhost:8080").is_ok());
        assert!(validate_url("api_endpoint", "").is_err());
        assert!(validate_url("api_endpoint", "invalid-url").is_err());
        assert!(validate_url("api_endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("timeout_seconds", 5, 1).is_ok());
        assert!(validate_positive_number("timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_output_formats() {
        let formats = vec!["csv".to_string(), "json".to_string()];
        assert!(validate_output_formats("formats", &formats).is_ok());
        assert!(validate_output_formats("formats", &["xlsx".to_string()]).is_err());
        assert!(validate_output_formats("formats", &[]).is_err());
    }

    #[test]
    fn test_validate_selection_limits() {
        let rates = RateTable::builtin().unwrap();

        let ok = ServiceSelection::new(ServiceQuantities::new().with("eSF", 1000));
        assert!(validate_selection(&rates, &ok).is_ok());

        let too_many = ServiceSelection::new(ServiceQuantities::new().with("eSF", 1001));
        assert!(validate_selection(&rates, &too_many).is_err());

        let unknown = ServiceSelection::new(ServiceQuantities::new().with("eXYZ", 1));
        let err = validate_selection(&rates, &unknown).unwrap_err();
        assert!(err.to_string().contains("eXYZ"));

        let empty = ServiceSelection::new(ServiceQuantities::new().with("eSF", 0));
        assert!(validate_selection(&rates, &empty).is_err());
    }

    #[test]
    fn test_validate_selection_overrides() {
        let rates = RateTable::builtin().unwrap();
        let mut selection = ServiceSelection::new(ServiceQuantities::new().with("ACS", 4));

        selection.overrides = RateOverrides::new()
            .with(Component::Implementation, "ACS", dec!(1000000))
            .with(Component::PerCapita, PER_CAPITA_SERVICE, dec!(7));
        assert!(validate_selection(&rates, &selection).is_ok());

        selection.overrides = RateOverrides::new().with(Component::Fixed, "eSF", dec!(1000000.01));
        assert!(validate_selection(&rates, &selection).is_err());

        selection.overrides = RateOverrides::new().with(Component::Fixed, "eSF", dec!(-1));
        assert!(validate_selection(&rates, &selection).is_err());
    }

    #[test]
    fn test_validate_context_population() {
        assert!(validate_context(&context(1)).is_ok());
        assert!(validate_context(&context(20_000_000)).is_ok());
        assert!(validate_context(&context(0)).is_err());
        assert!(validate_context(&context(20_000_001)).is_err());
    }

    #[test]
    fn test_business_rule_warnings() {
        let balanced = ServiceSelection::new(ServiceQuantities::new().with("eSF", 4).with("eAP 30h", 1));
        assert!(business_rule_warnings(&balanced, &context(10000)).is_empty());

        let eap_heavy = ServiceSelection::new(
            ServiceQuantities::new()
                .with("eSF", 1)
                .with("eAP 30h", 1)
                .with("eAP 20h", 1),
        );
        let warnings = business_rule_warnings(&eap_heavy, &context(3000));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("eAP (2)"));

        let crowded = ServiceSelection::new(ServiceQuantities::new().with("eSF", 10));
        assert!(business_rule_warnings(&crowded, &context(10000))[0].contains("Muitas eSF"));

        let sparse = ServiceSelection::new(ServiceQuantities::new().with("eSF", 1));
        assert!(business_rule_warnings(&sparse, &context(10000))[0].contains("Poucas eSF"));
    }

    #[test]
    fn test_validate_additional() {
        let mut parameters = AdditionalParameters {
            esf_eap: dec!(5000),
            ..Default::default()
        };
        assert!(validate_additional(&parameters).is_ok());

        parameters.acs = dec!(-10);
        assert!(validate_additional(&parameters).is_err());
    }
}
