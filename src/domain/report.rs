//! Typed view over the `financiamento/pagamento` response.

use crate::domain::labels::{EquityStratum, QualityLabel};
use crate::domain::model::MunicipalityContext;
use crate::utils::currency::parse_currency;
use crate::utils::error::{PapError, Result};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Municipality and period to query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultRequest {
    /// IBGE municipality code, 6 or 7 digits (the 7th is the check digit).
    pub ibge_code: String,
    /// Competência in `AAAAMM` form.
    pub competencia: String,
}

impl ConsultRequest {
    pub fn new(ibge_code: impl Into<String>, competencia: impl Into<String>) -> Self {
        Self {
            ibge_code: ibge_code.into().trim().to_string(),
            competencia: competencia.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let code = &self.ibge_code;
        if !(code.len() == 6 || code.len() == 7) || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(PapError::InvalidConfigValueError {
                field: "ibge_code".to_string(),
                value: code.clone(),
                reason: "Código IBGE deve ter 6 ou 7 dígitos".to_string(),
            });
        }

        self.period().map(|_| ())
    }

    /// First day of the competência month.
    pub fn period(&self) -> Result<NaiveDate> {
        let invalid = |reason: &str| PapError::InvalidConfigValueError {
            field: "competencia".to_string(),
            value: self.competencia.clone(),
            reason: reason.to_string(),
        };

        let raw = &self.competencia;
        if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("Competência deve estar no formato AAAAMM"));
        }

        let year: i32 = raw[..4].parse().map_err(|_| invalid("Ano inválido"))?;
        let month: u32 = raw[4..].parse().map_err(|_| invalid("Mês inválido"))?;
        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid("Mês deve estar entre 01 e 12"))
    }

    pub fn co_uf(&self) -> &str {
        &self.ibge_code[..2.min(self.ibge_code.len())]
    }

    pub fn co_municipio(&self) -> &str {
        &self.ibge_code[..6.min(self.ibge_code.len())]
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("unidadeGeografica", "MUNICIPIO".to_string()),
            ("coUf", self.co_uf().to_string()),
            ("coMunicipio", self.co_municipio().to_string()),
            ("nuParcelaInicio", self.competencia.clone()),
            ("nuParcelaFim", self.competencia.clone()),
            ("tipoRelatorio", "COMPLETO".to_string()),
        ]
    }
}

/// Accepts a number, a numeric string (`"2022"`, `"6000.00"`, `"R$ 6.000,00"`)
/// or null. Anything else is logged and read as absent.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => {
            let trimmed = s.trim();
            let parsed = trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .or_else(|| {
                    parse_currency(trimmed)
                        .ok()
                        .and_then(|decimal| decimal.to_f64())
                });
            if parsed.is_none() {
                tracing::warn!("⚠️ Valor numérico inválido no relatório: {:?}", s);
            }
            parsed
        }
        other => {
            tracing::warn!("⚠️ Valor numérico inválido no relatório: {}", other);
            None
        }
    })
}

/// Codes and periods come as numbers or strings depending on the endpoint.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(
            n.as_u64()
                .map(|v| v.to_string())
                .unwrap_or_else(|| n.to_string()),
        ),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub sg_uf: Option<String>,
    pub no_municipio: Option<String>,
    pub ds_plano_orcamentario: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_integral: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_ajuste: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_desconto: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_efetivo_repasse: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_implantacao: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_total_implantacao: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub sg_uf: Option<String>,
    pub no_municipio: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub qt_populacao: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub nu_ano_ref_populacao_ibge: Option<f64>,
    pub ds_faixa_indice_equidade_esf_eap: Option<String>,
    pub ds_classificacao_qualidade_esf_eap: Option<String>,
    pub ds_classificacao_vinculo_esf_eap: Option<String>,
    pub ds_classificacao_qualidade_emulti: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub qt_esf_homologado: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_qualidade_esf: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub qt_emulti_pagas: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_pagamento_emulti_qualidade: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub qt_sb_pagamento_modalidade_i: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_pagamento_esb40h_qualidade: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub qt_acs_direto_pgto: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vl_total_acs_direto: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReport {
    #[serde(default)]
    pub resumos_planos_orcamentarios: Vec<BudgetSummary>,
    #[serde(default)]
    pub pagamentos: Vec<PaymentRecord>,
}

/// Quality value actually paid to one team family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedTeamValue {
    pub team: String,
    pub quantity: u64,
    pub unit_value: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedValues {
    pub teams: Vec<ReportedTeamValue>,
    /// Sum of team quality values; ACS is listed but not part of it.
    pub quality_total: Decimal,
    pub effective_transfer_total: Decimal,
}

fn to_decimal(value: Option<f64>) -> Decimal {
    value
        .and_then(|v| Decimal::try_from(v).ok())
        .unwrap_or(Decimal::ZERO)
}

impl PaymentReport {
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn first_payment(&self) -> Option<&PaymentRecord> {
        self.pagamentos.first()
    }

    pub fn is_empty(&self) -> bool {
        self.pagamentos.is_empty() && self.resumos_planos_orcamentarios.is_empty()
    }

    pub fn population(&self) -> Option<u64> {
        self.first_payment()
            .and_then(|p| p.qt_populacao)
            .filter(|p| *p > 0.0)
            .map(|p| p.round() as u64)
    }

    /// Builds the calculation context from the first payment entry.
    ///
    /// A missing IED stops the run; unknown classifications fall back to `Bom`.
    pub fn municipality_context(&self, request: &ConsultRequest) -> Result<MunicipalityContext> {
        let payment = self.first_payment().ok_or_else(|| PapError::ProcessingError {
            message: "Nenhum dado de pagamento encontrado para os parâmetros informados"
                .to_string(),
        })?;

        let stratum =
            EquityStratum::from_ied(payment.ds_faixa_indice_equidade_esf_eap.as_deref())?;

        let label = |raw: &Option<String>| {
            raw.as_deref()
                .map(QualityLabel::normalize_or_default)
                .unwrap_or(QualityLabel::Bom)
        };

        let summary = self.resumos_planos_orcamentarios.first();
        let uf = payment
            .sg_uf
            .clone()
            .or_else(|| summary.and_then(|s| s.sg_uf.clone()))
            .unwrap_or_else(|| "Não informado".to_string());
        let municipio = payment
            .no_municipio
            .clone()
            .or_else(|| summary.and_then(|s| s.no_municipio.clone()))
            .unwrap_or_else(|| "Não informado".to_string());

        Ok(MunicipalityContext {
            uf,
            municipio,
            competencia: request.competencia.clone(),
            population: self.population().unwrap_or(0),
            stratum,
            quality_label: label(&payment.ds_classificacao_qualidade_esf_eap),
            bond_label: label(&payment.ds_classificacao_vinculo_esf_eap),
            emulti_quality_label: payment
                .ds_classificacao_qualidade_emulti
                .as_deref()
                .and_then(|raw| raw.parse().ok()),
        })
    }

    /// Differences between the municipality/period held by the report and the
    /// request it is being used for. Only checked where the report carries
    /// `coMunicipio`/`coIbge` or `nuParcela`.
    pub fn request_mismatches(&self, request: &ConsultRequest) -> Vec<String> {
        let Some(payment) = self.first_payment() else {
            return Vec::new();
        };
        let mut mismatches = Vec::new();

        let code = ["coMunicipio", "coIbge"]
            .iter()
            .find_map(|key| payment.extra.get(*key).and_then(value_text));
        if let Some(code) = code {
            let cached = &code[..6.min(code.len())];
            if cached != request.co_municipio() {
                mismatches.push(format!(
                    "Dados em cache são do município {} ({}), não de {}",
                    cached,
                    payment.no_municipio.as_deref().unwrap_or("Não informado"),
                    request.co_municipio()
                ));
            }
        }

        if let Some(period) = payment.extra.get("nuParcela").and_then(value_text) {
            if period != request.competencia {
                mismatches.push(format!(
                    "Dados em cache são da competência {}, não de {}",
                    period, request.competencia
                ));
            }
        }

        mismatches
    }

    /// Quality values paid per team family plus the total effective transfer.
    pub fn reported_values(&self) -> ReportedValues {
        let mut values = ReportedValues {
            effective_transfer_total: self
                .resumos_planos_orcamentarios
                .iter()
                .map(|s| to_decimal(s.vl_efetivo_repasse))
                .sum(),
            ..Default::default()
        };

        let Some(payment) = self.first_payment() else {
            return values;
        };

        let families = [
            (
                "eSF - Equipes de Saúde da Família",
                payment.qt_esf_homologado,
                payment.vl_qualidade_esf,
                true,
            ),
            (
                "eMulti - Equipes Multiprofissionais",
                payment.qt_emulti_pagas,
                payment.vl_pagamento_emulti_qualidade,
                true,
            ),
            (
                "eSB - Saúde Bucal",
                payment.qt_sb_pagamento_modalidade_i,
                payment.vl_pagamento_esb40h_qualidade,
                true,
            ),
            (
                "ACS - Agentes Comunitários de Saúde",
                payment.qt_acs_direto_pgto,
                payment.vl_total_acs_direto,
                false,
            ),
        ];

        for (team, quantity, total, counts_as_quality) in families {
            let quantity = quantity.unwrap_or(0.0).max(0.0).round() as u64;
            let total = to_decimal(total);
            if quantity == 0 || (!counts_as_quality && total.is_zero()) {
                continue;
            }

            values.teams.push(ReportedTeamValue {
                team: team.to_string(),
                quantity,
                unit_value: total / Decimal::from(quantity),
                total,
            });
            if counts_as_quality {
                values.quality_total += total;
            }
        }

        values
    }
}
