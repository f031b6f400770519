//! Size-curve and color-count enumerations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A size-run label describing which sizes a batch spans.
///
/// The set is closed: imports and forms reject anything outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Curva {
    #[serde(rename = "XS-S-M-L-XL")]
    XsToXl,
    #[serde(rename = "XS-S-M-L")]
    XsToL,
    #[serde(rename = "S-M-L-XL")]
    SToXl,
    #[serde(rename = "S-M-L")]
    SToL,
    #[serde(rename = "XL-XXL-XXXL")]
    XlToXxxl,
    #[serde(rename = "XL-XXL-3XL")]
    XlTo3xl,
    #[serde(rename = "28-30-32-34-36")]
    Waist28To36,
    #[serde(rename = "28-30-32-34-36-40")]
    Waist28To40,
    #[serde(rename = "06-08-10-12")]
    Kids06To12,
    #[serde(rename = "06-08-10-12-14")]
    Kids06To14,
    #[serde(rename = "14-16-18-20")]
    Kids14To20,
    #[serde(rename = "14-16-18-20-22")]
    Kids14To22,
    #[serde(rename = "ONE-SIZE")]
    OneSize,
}

impl Curva {
    pub const ALL: [Curva; 13] = [
        Curva::XsToXl,
        Curva::XsToL,
        Curva::SToXl,
        Curva::SToL,
        Curva::XlToXxxl,
        Curva::XlTo3xl,
        Curva::Waist28To36,
        Curva::Waist28To40,
        Curva::Kids06To12,
        Curva::Kids06To14,
        Curva::Kids14To20,
        Curva::Kids14To22,
        Curva::OneSize,
    ];

    /// Stored label
    pub fn as_str(&self) -> &'static str {
        match self {
            Curva::XsToXl => "XS-S-M-L-XL",
            Curva::XsToL => "XS-S-M-L",
            Curva::SToXl => "S-M-L-XL",
            Curva::SToL => "S-M-L",
            Curva::XlToXxxl => "XL-XXL-XXXL",
            Curva::XlTo3xl => "XL-XXL-3XL",
            Curva::Waist28To36 => "28-30-32-34-36",
            Curva::Waist28To40 => "28-30-32-34-36-40",
            Curva::Kids06To12 => "06-08-10-12",
            Curva::Kids06To14 => "06-08-10-12-14",
            Curva::Kids14To20 => "14-16-18-20",
            Curva::Kids14To22 => "14-16-18-20-22",
            Curva::OneSize => "ONE-SIZE",
        }
    }

    /// Label shown in selection lists
    pub fn display_label(&self) -> &'static str {
        match self {
            Curva::OneSize => "Talla Única",
            other => other.as_str(),
        }
    }

    /// Number of sizes in the run
    pub fn size_count(&self) -> usize {
        match self {
            Curva::OneSize => 1,
            other => other.as_str().split('-').count(),
        }
    }
}

impl std::fmt::Display for Curva {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Curva {
    type Err = SizingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        if normalized == "TALLA ÚNICA" || normalized == "TALLA UNICA" {
            return Ok(Curva::OneSize);
        }
        Curva::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| SizingError::UnknownCurva(s.trim().to_string()))
    }
}

/// How many colors a batch is produced in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorCount {
    #[serde(rename = "1 color")]
    One,
    #[serde(rename = "2 colores")]
    Two,
}

impl ColorCount {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorCount::One => "1 color",
            ColorCount::Two => "2 colores",
        }
    }
}

impl std::fmt::Display for ColorCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ColorCount {
    type Err = SizingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "1 color" => Ok(ColorCount::One),
            "2" | "2 colores" | "2 colors" => Ok(ColorCount::Two),
            _ => Err(SizingError::UnknownColorCount(s.trim().to_string())),
        }
    }
}

/// Errors raised when a label is outside the closed sets
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SizingError {
    #[error("unknown curva '{0}'")]
    UnknownCurva(String),

    #[error("unknown color count '{0}'")]
    UnknownColorCount(String),
}
