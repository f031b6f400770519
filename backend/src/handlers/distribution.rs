//! Distribution table lookup handler

use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};
use shared::distribution::{calculate_distribution, DistributionEntry};
use shared::models::{ColorCount, Curva};

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct DistributionQuery {
    pub curva: Option<String>,
    pub cantidad_colores: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    pub curva: Option<Curva>,
    pub cantidad_colores: Option<ColorCount>,
    /// `None` when the pair has no table entry; quantity is then typed by hand
    pub entry: Option<DistributionEntry>,
}

/// Look up the per-size breakdown for a curva and color count
pub async fn lookup_distribution(
    Query(query): Query<DistributionQuery>,
) -> AppResult<Json<DistributionResponse>> {
    let curva = query
        .curva
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Curva>)
        .transpose()
        .map_err(|e| AppError::invalid_field("curva", &e.to_string()))?;
    let cantidad_colores = query
        .cantidad_colores
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ColorCount>)
        .transpose()
        .map_err(|e| AppError::invalid_field("cantidad_colores", &e.to_string()))?;

    Ok(Json(DistributionResponse {
        curva,
        cantidad_colores,
        entry: calculate_distribution(curva, cantidad_colores),
    }))
}
