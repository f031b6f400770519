//! Size distribution lookup and the auto-calculated quantity fields
//!
//! Each (color count, curva) pair with a table entry has a fixed per-size
//! breakdown. A miss is not an error: the caller falls back to manual entry.

use serde::{Deserialize, Serialize};

use crate::models::{ColorCount, Curva};

/// A fixed per-size breakdown and the total it sums to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributionEntry {
    pub distribution: &'static str,
    pub total: u32,
}

const fn entry(distribution: &'static str, total: u32) -> DistributionEntry {
    DistributionEntry {
        distribution,
        total,
    }
}

/// Look up the breakdown for a curva produced in `colors` colors.
///
/// `XS-S-M-L` and `06-08-10-12` have no entry.
pub fn lookup(curva: Curva, colors: ColorCount) -> Option<DistributionEntry> {
    match colors {
        ColorCount::One => match curva {
            Curva::XsToXl => Some(entry("3-4-4-4-3", 18)),
            Curva::SToXl => Some(entry("5-4-4-5", 18)),
            Curva::SToL => Some(entry("6-6-6", 18)),
            Curva::XlToXxxl => Some(entry("6-6-6", 18)),
            Curva::XlTo3xl => Some(entry("6-6-6", 18)),
            Curva::Waist28To36 => Some(entry("3-4-4-4-3", 18)),
            Curva::Waist28To40 => Some(entry("3-3-3-3-3-3", 18)),
            Curva::Kids06To14 => Some(entry("3-4-4-4-3", 18)),
            Curva::Kids14To20 => Some(entry("5-4-4-5", 18)),
            Curva::Kids14To22 => Some(entry("3-4-4-4-3", 18)),
            Curva::OneSize => Some(entry("50", 50)),
            Curva::XsToL | Curva::Kids06To12 => None,
        },
        ColorCount::Two => match curva {
            Curva::XsToXl => Some(entry("2-4-8-4-2", 20)),
            Curva::SToXl => Some(entry("4-6-6-4", 20)),
            Curva::SToL => Some(entry("6-8-6", 20)),
            Curva::XlToXxxl => Some(entry("6-8-6", 20)),
            Curva::XlTo3xl => Some(entry("6-8-6", 20)),
            Curva::Waist28To36 => Some(entry("2-4-8-4-2", 20)),
            Curva::Waist28To40 => Some(entry("2-4-4-4-4-2", 20)),
            Curva::Kids06To14 => Some(entry("2-4-8-4-2", 20)),
            Curva::Kids14To20 => Some(entry("4-6-6-4", 20)),
            Curva::Kids14To22 => Some(entry("2-4-8-4-2", 20)),
            Curva::OneSize => Some(entry("50-50", 100)),
            Curva::XsToL | Curva::Kids06To12 => None,
        },
    }
}

/// Lookup that tolerates unset selections
pub fn calculate_distribution(
    curva: Option<Curva>,
    colors: Option<ColorCount>,
) -> Option<DistributionEntry> {
    lookup(curva?, colors?)
}

/// Split a dash-separated distribution into per-size counts
pub fn distribution_components(distribution: &str) -> Option<Vec<u32>> {
    let trimmed = distribution.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .split('-')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

/// Sum of a dash-separated distribution
pub fn distribution_sum(distribution: &str) -> Option<u32> {
    distribution_components(distribution).map(|parts| parts.iter().sum())
}

/// Join one or two color names the way they are stored
pub fn combine_colors(
    colors: Option<ColorCount>,
    color: Option<&str>,
    second_color: Option<&str>,
) -> Option<String> {
    let first = color.map(str::trim).filter(|c| !c.is_empty());
    let second = second_color.map(str::trim).filter(|c| !c.is_empty());
    match (colors, first, second) {
        (Some(ColorCount::Two), Some(a), Some(b)) => Some(format!("{}, {}", a, b)),
        (_, Some(a), _) => Some(a.to_string()),
        _ => None,
    }
}

/// Quantity and distribution as edited on a reference form.
///
/// Recomputed by an explicit call whenever the curva or color-count
/// selection changes. While `auto_calculated` is set both fields are
/// derived and manual edits are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityFields {
    pub cantidad: Option<u32>,
    pub distribucion: Option<String>,
    pub auto_calculated: bool,
}

impl QuantityFields {
    pub fn manual(cantidad: Option<u32>, distribucion: Option<String>) -> Self {
        Self {
            cantidad,
            distribucion,
            auto_calculated: false,
        }
    }

    /// Change handler for the curva / color-count selections.
    ///
    /// A table hit overwrites both fields. A miss only drops the flag,
    /// leaving whatever values were there.
    pub fn on_selection_changed(&mut self, curva: Option<Curva>, colors: Option<ColorCount>) {
        match calculate_distribution(curva, colors) {
            Some(entry) => {
                self.cantidad = Some(entry.total);
                self.distribucion = Some(entry.distribution.to_string());
                self.auto_calculated = true;
            }
            None => self.auto_calculated = false,
        }
    }

    /// Returns `false` when the field is derived and the edit was ignored
    pub fn set_manual_cantidad(&mut self, cantidad: Option<u32>) -> bool {
        if self.auto_calculated {
            return false;
        }
        self.cantidad = cantidad;
        true
    }

    /// Returns `false` when the field is derived and the edit was ignored
    pub fn set_manual_distribucion(&mut self, distribucion: Option<String>) -> bool {
        if self.auto_calculated {
            return false;
        }
        self.distribucion = distribucion;
        true
    }
}
