//! Export rows
//!
//! Columns carry the importer's canonical headers, so an exported file can be
//! imported again as-is. The two derived columns are ignored on the way back.

use serde::{Deserialize, Serialize};

use crate::dates::{format_iso, CalendarDate};
use crate::views::ListingRow;

/// Header row of an export file
pub const EXPORT_HEADERS: [&str; 12] = [
    "referencia",
    "curva",
    "cantidad",
    "cantidad_colores",
    "distribucion",
    "color",
    "ubicacion",
    "ingreso_a_bodega",
    "lanzamiento_capsula",
    "imagen_url",
    "fecha_desbloqueo",
    "estado",
];

/// One flat, text-only export line. Field order matches [`EXPORT_HEADERS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub referencia: String,
    pub curva: String,
    pub cantidad: i32,
    pub cantidad_colores: Option<String>,
    pub distribucion: Option<String>,
    pub color: Option<String>,
    pub ubicacion: Option<String>,
    pub ingreso_a_bodega: Option<String>,
    pub lanzamiento_capsula: Option<String>,
    pub imagen_url: Option<String>,
    pub fecha_desbloqueo: Option<String>,
    pub estado: String,
}

impl From<&ListingRow> for ExportRow {
    fn from(row: &ListingRow) -> Self {
        let r = &row.reference;
        Self {
            referencia: r.referencia.clone(),
            curva: r.curva.as_str().to_string(),
            cantidad: r.cantidad,
            cantidad_colores: r.cantidad_colores.map(|c| c.as_str().to_string()),
            distribucion: r.distribucion.clone(),
            color: r.color.clone(),
            ubicacion: r.ubicacion.clone(),
            ingreso_a_bodega: r.ingreso_a_bodega.map(format_iso),
            lanzamiento_capsula: r.lanzamiento_capsula.map(format_iso),
            imagen_url: r.imagen_url.clone(),
            fecha_desbloqueo: row.fecha_desbloqueo.map(format_iso),
            estado: row.estado.clone(),
        }
    }
}

pub fn export_rows(rows: &[ListingRow]) -> Vec<ExportRow> {
    rows.iter().map(ExportRow::from).collect()
}

/// Download name for an export made on `today`
pub fn export_file_name(today: CalendarDate) -> String {
    format!("referencias_{}.csv", format_iso(today))
}
