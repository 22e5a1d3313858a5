use crate::utils::error::{PapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Performance classification used by both the quality and the bond
/// (vínculo e acompanhamento territorial) components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityLabel {
    Regular,
    Suficiente,
    Bom,
    #[serde(rename = "Ótimo")]
    Otimo,
}

impl QualityLabel {
    /// Worst to best; the scenario table is built in this order.
    pub const ALL: [QualityLabel; 4] = [
        QualityLabel::Regular,
        QualityLabel::Suficiente,
        QualityLabel::Bom,
        QualityLabel::Otimo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Regular => "Regular",
            QualityLabel::Suficiente => "Suficiente",
            QualityLabel::Bom => "Bom",
            QualityLabel::Otimo => "Ótimo",
        }
    }

    /// Parses API/user text, falling back to `Bom` with a warning.
    pub fn normalize_or_default(raw: &str) -> QualityLabel {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ Classificação '{}' não reconhecida. Usando 'Bom' como padrão.", raw);
            QualityLabel::Bom
        })
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLabel {
    type Err = PapError;

    fn from_str(s: &str) -> Result<Self> {
        let folded: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'ó' | 'ò' | 'ô' | 'õ' => 'o',
                other => other,
            })
            .collect();

        match folded.as_str() {
            "regular" => Ok(QualityLabel::Regular),
            "suficiente" => Ok(QualityLabel::Suficiente),
            "bom" => Ok(QualityLabel::Bom),
            "otimo" => Ok(QualityLabel::Otimo),
            _ => Err(PapError::InvalidConfigValueError {
                field: "classificacao".to_string(),
                value: s.to_string(),
                reason: "Deve ser uma de: Regular, Suficiente, Bom, Ótimo".to_string(),
            }),
        }
    }
}

/// Equity and sizing stratum derived from the IED label (`ESTRATO 1`..`ESTRATO 4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EquityStratum {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl EquityStratum {
    pub const ALL: [EquityStratum; 4] = [
        EquityStratum::One,
        EquityStratum::Two,
        EquityStratum::Three,
        EquityStratum::Four,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Extracts the stratum from `dsFaixaIndiceEquidadeEsfEap`.
    pub fn from_ied(ied: Option<&str>) -> Result<Self> {
        let raw = ied.unwrap_or_default();
        raw.trim()
            .strip_prefix("ESTRATO ")
            .and_then(|n| n.trim().parse::<u8>().ok())
            .and_then(|n| EquityStratum::try_from(n).ok())
            .ok_or_else(|| PapError::MissingStratum {
                value: raw.to_string(),
            })
    }
}

impl TryFrom<u8> for EquityStratum {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(EquityStratum::One),
            2 => Ok(EquityStratum::Two),
            3 => Ok(EquityStratum::Three),
            4 => Ok(EquityStratum::Four),
            other => Err(format!("estrato fora do intervalo 1..4: {}", other)),
        }
    }
}

impl From<EquityStratum> for u8 {
    fn from(value: EquityStratum) -> Self {
        value.number()
    }
}

impl fmt::Display for EquityStratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ESTRATO {}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_label_parsing_is_lenient() {
        assert_eq!("Ótimo".parse::<QualityLabel>().unwrap(), QualityLabel::Otimo);
        assert_eq!("OTIMO".parse::<QualityLabel>().unwrap(), QualityLabel::Otimo);
        assert_eq!(" bom ".parse::<QualityLabel>().unwrap(), QualityLabel::Bom);
        assert_eq!("SUFICIENTE".parse::<QualityLabel>().unwrap(), QualityLabel::Suficiente);
        assert!("Excelente".parse::<QualityLabel>().is_err());
    }

    #[test]
    fn test_normalize_or_default_falls_back_to_bom() {
        assert_eq!(QualityLabel::normalize_or_default("Inválido"), QualityLabel::Bom);
        assert_eq!(QualityLabel::normalize_or_default("regular"), QualityLabel::Regular);
    }

    #[test]
    fn test_label_order_is_worst_to_best() {
        assert!(QualityLabel::Regular < QualityLabel::Otimo);
        assert_eq!(QualityLabel::ALL[0], QualityLabel::Regular);
        assert_eq!(QualityLabel::ALL[3].to_string(), "Ótimo");
    }

    #[test]
    fn test_stratum_from_ied() {
        assert_eq!(EquityStratum::from_ied(Some("ESTRATO 3")).unwrap(), EquityStratum::Three);
        assert_eq!(EquityStratum::from_ied(Some("ESTRATO 1")).unwrap().number(), 1);
        assert!(EquityStratum::from_ied(Some("INVALID")).is_err());
        assert!(EquityStratum::from_ied(Some("ESTRATO 7")).is_err());
        assert!(EquityStratum::from_ied(None).is_err());
    }
}
