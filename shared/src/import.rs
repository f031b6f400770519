//! Bulk import: header mapping and all-or-nothing row validation
//!
//! Rows arrive as raw text cells. Every row is checked before anything is
//! returned, so a single bad row rejects the whole file and the error lists
//! every problem found.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::dates::parse_calendar_date;
use crate::distribution::QuantityFields;
use crate::models::{ColorCount, Curva, NewReference};

/// Stored fields a column can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportField {
    Referencia,
    Curva,
    Cantidad,
    CantidadColores,
    Distribucion,
    Color,
    Ubicacion,
    IngresoABodega,
    LanzamientoCapsula,
    ImagenUrl,
}

impl ImportField {
    pub const ALL: [ImportField; 10] = [
        ImportField::Referencia,
        ImportField::Curva,
        ImportField::Cantidad,
        ImportField::CantidadColores,
        ImportField::Distribucion,
        ImportField::Color,
        ImportField::Ubicacion,
        ImportField::IngresoABodega,
        ImportField::LanzamientoCapsula,
        ImportField::ImagenUrl,
    ];

    /// Canonical column name, also used as the export header
    pub fn header(&self) -> &'static str {
        match self {
            ImportField::Referencia => "referencia",
            ImportField::Curva => "curva",
            ImportField::Cantidad => "cantidad",
            ImportField::CantidadColores => "cantidad_colores",
            ImportField::Distribucion => "distribucion",
            ImportField::Color => "color",
            ImportField::Ubicacion => "ubicacion",
            ImportField::IngresoABodega => "ingreso_a_bodega",
            ImportField::LanzamientoCapsula => "lanzamiento_capsula",
            ImportField::ImagenUrl => "imagen_url",
        }
    }

    /// Match a header cell. Case, accents, spaces and hyphens are ignored.
    pub fn from_header(header: &str) -> Option<Self> {
        let key = normalize_header(header);
        let field = match key.as_str() {
            "referencia" | "reference" | "ref" => ImportField::Referencia,
            "curva" | "size_curve" => ImportField::Curva,
            "cantidad" | "quantity" => ImportField::Cantidad,
            "cantidad_colores" | "cantidad_de_colores" | "colores" => ImportField::CantidadColores,
            "distribucion" => ImportField::Distribucion,
            "color" => ImportField::Color,
            "ubicacion" | "location" => ImportField::Ubicacion,
            "ingreso_a_bodega" | "fecha_ingreso" | "ingreso" => ImportField::IngresoABodega,
            "lanzamiento_capsula" | "fecha_lanzamiento" | "lanzamiento" => {
                ImportField::LanzamientoCapsula
            }
            "imagen_url" | "imagen" => ImportField::ImagenUrl,
            _ => return None,
        };
        Some(field)
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        other => other,
    }
}

fn normalize_header(header: &str) -> String {
    let mut key = String::with_capacity(header.len());
    for c in header.trim().trim_start_matches('\u{feff}').chars() {
        let c = fold_accent(c.to_lowercase().next().unwrap_or(c));
        if c.is_whitespace() || c == '-' || c == '_' {
            if !key.is_empty() && !key.ends_with('_') {
                key.push('_');
            }
        } else {
            key.push(c);
        }
    }
    key.trim_end_matches('_').to_string()
}

/// Column positions resolved from a header row
#[derive(Debug, Clone)]
pub struct HeaderMap {
    columns: Vec<Option<ImportField>>,
}

impl HeaderMap {
    /// Resolve headers. Unknown columns (derived ones from an export, for
    /// instance) are skipped; `referencia` and `curva` must be present.
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self, ImportError> {
        let columns: Vec<Option<ImportField>> =
            headers.into_iter().map(ImportField::from_header).collect();

        let missing: Vec<ImportIssue> = [ImportField::Referencia, ImportField::Curva]
            .into_iter()
            .filter(|required| !columns.contains(&Some(*required)))
            .map(|field| ImportIssue::MissingColumn {
                column: field.header(),
            })
            .collect();

        if missing.is_empty() {
            Ok(Self { columns })
        } else {
            Err(ImportError { issues: missing })
        }
    }

    /// Map one record. `row_number` is 1-based and counts the header row.
    pub fn row<'a>(&self, row_number: usize, cells: impl IntoIterator<Item = &'a str>) -> ImportRow {
        let mut mapped = HashMap::new();
        for (field, cell) in self.columns.iter().zip(cells) {
            if let Some(field) = field {
                mapped.entry(*field).or_insert_with(|| cell.to_string());
            }
        }
        ImportRow {
            row_number,
            cells: mapped,
        }
    }
}

/// One data row with its raw cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    pub row_number: usize,
    pub cells: HashMap<ImportField, String>,
}

impl ImportRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: HashMap::new(),
        }
    }

    pub fn with(mut self, field: ImportField, value: impl Into<String>) -> Self {
        self.cells.insert(field, value.into());
        self
    }

    /// Trimmed cell, `None` when absent or blank
    pub fn get(&self, field: ImportField) -> Option<&str> {
        self.cells
            .get(&field)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

/// A single problem found while validating a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportIssue {
    MissingColumn { column: &'static str },
    BlankReferencia { row: usize },
    InvalidCurva { row: usize, value: String },
    InvalidColorCount { row: usize, value: String },
    InvalidCantidad { row: usize, value: String },
    MissingCantidad { row: usize },
    DuplicateInFile { referencia: String, rows: Vec<usize> },
    AlreadyExists { row: usize, referencia: String },
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportIssue::MissingColumn { column } => write!(f, "missing column '{}'", column),
            ImportIssue::BlankReferencia { row } => write!(f, "row {}: referencia is blank", row),
            ImportIssue::InvalidCurva { row, value } => {
                write!(f, "row {}: invalid curva '{}'", row, value)
            }
            ImportIssue::InvalidColorCount { row, value } => {
                write!(f, "row {}: invalid cantidad_colores '{}'", row, value)
            }
            ImportIssue::InvalidCantidad { row, value } => {
                write!(f, "row {}: invalid cantidad '{}'", row, value)
            }
            ImportIssue::MissingCantidad { row } => write!(
                f,
                "row {}: cantidad is required when no distribution applies",
                row
            ),
            ImportIssue::DuplicateInFile { referencia, rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(
                    f,
                    "referencia '{}' appears more than once (rows {})",
                    referencia,
                    rows.join(", ")
                )
            }
            ImportIssue::AlreadyExists { row, referencia } => {
                write!(f, "row {}: referencia '{}' already exists", row, referencia)
            }
        }
    }
}

/// Every issue that blocked an import
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("import rejected: {}", join_issues(.issues))]
pub struct ImportError {
    pub issues: Vec<ImportIssue>,
}

fn join_issues(issues: &[ImportIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_cantidad(raw: &str) -> Option<i32> {
    if let Ok(n) = raw.parse::<i32>() {
        return (n >= 1).then_some(n);
    }
    // Spreadsheets sometimes hand integers over as "18.0"
    let f = raw.replace(',', ".").parse::<f64>().ok()?;
    (f.fract() == 0.0 && f >= 1.0 && f <= f64::from(i32::MAX)).then_some(f as i32)
}

/// Validate every row against the closed curva set, in-file duplicates and
/// the referencias already stored. Blank rows are skipped. Rows whose curva
/// and color count have a table entry take quantity and distribution from it.
///
/// Returns the rows ready to write, or every issue found.
pub fn validate_import(
    rows: &[ImportRow],
    existing: &HashSet<String>,
) -> Result<Vec<NewReference>, ImportError> {
    let mut issues = Vec::new();
    let mut accepted = Vec::with_capacity(rows.len());
    let mut seen: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for row in rows.iter().filter(|r| !r.is_blank()) {
        let referencia = row.get(ImportField::Referencia).map(str::to_string);
        match &referencia {
            Some(code) => {
                seen.entry(code.clone()).or_default().push(row.row_number);
                if existing.contains(code) {
                    issues.push(ImportIssue::AlreadyExists {
                        row: row.row_number,
                        referencia: code.clone(),
                    });
                }
            }
            None => issues.push(ImportIssue::BlankReferencia {
                row: row.row_number,
            }),
        }

        let raw_curva = row.get(ImportField::Curva).unwrap_or_default();
        let curva = match raw_curva.parse::<Curva>() {
            Ok(curva) => Some(curva),
            Err(_) => {
                issues.push(ImportIssue::InvalidCurva {
                    row: row.row_number,
                    value: raw_curva.to_string(),
                });
                None
            }
        };

        let colors = match row.get(ImportField::CantidadColores) {
            None => None,
            Some(raw) => match raw.parse::<ColorCount>() {
                Ok(colors) => Some(colors),
                Err(_) => {
                    issues.push(ImportIssue::InvalidColorCount {
                        row: row.row_number,
                        value: raw.to_string(),
                    });
                    None
                }
            },
        };

        // A table hit fixes both fields, whatever the file says
        let mut quantity =
            QuantityFields::manual(None, row.get(ImportField::Distribucion).map(str::to_string));
        quantity.on_selection_changed(curva, colors);
        let cantidad = if quantity.auto_calculated {
            quantity.cantidad.and_then(|n| i32::try_from(n).ok())
        } else {
            match row.get(ImportField::Cantidad) {
                Some(raw) => match parse_cantidad(raw) {
                    Some(n) => Some(n),
                    None => {
                        issues.push(ImportIssue::InvalidCantidad {
                            row: row.row_number,
                            value: raw.to_string(),
                        });
                        None
                    }
                },
                None => {
                    issues.push(ImportIssue::MissingCantidad {
                        row: row.row_number,
                    });
                    None
                }
            }
        };
        let distribucion = quantity.distribucion;

        if let (Some(referencia), Some(curva), Some(cantidad)) = (referencia, curva, cantidad) {
            accepted.push(NewReference {
                referencia,
                curva,
                cantidad,
                cantidad_colores: colors,
                distribucion,
                color: row.get(ImportField::Color).map(str::to_string),
                ubicacion: row.get(ImportField::Ubicacion).map(str::to_string),
                ingreso_a_bodega: row
                    .get(ImportField::IngresoABodega)
                    .and_then(parse_calendar_date),
                lanzamiento_capsula: row
                    .get(ImportField::LanzamientoCapsula)
                    .and_then(parse_calendar_date),
                imagen_url: row.get(ImportField::ImagenUrl).map(str::to_string),
            });
        }
    }

    for (referencia, rows) in seen {
        if rows.len() > 1 {
            issues.push(ImportIssue::DuplicateInFile { referencia, rows });
        }
    }

    if issues.is_empty() {
        Ok(accepted)
    } else {
        Err(ImportError { issues })
    }
}
