//! Reference (product batch) models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ColorCount, Curva};

/// A single inventory batch tracked from warehouse intake to unlock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Uuid,
    /// User-facing code, unique across the store
    pub referencia: String,
    pub curva: Curva,
    pub cantidad: i32,
    pub cantidad_colores: Option<ColorCount>,
    /// Dash-separated per-size unit counts (e.g. "3-4-4-4-3")
    pub distribucion: Option<String>,
    pub color: Option<String>,
    pub ubicacion: Option<String>,
    /// Warehouse intake date
    pub ingreso_a_bodega: Option<NaiveDate>,
    /// Capsule launch date
    pub lanzamiento_capsula: Option<NaiveDate>,
    pub imagen_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reference {
    /// Materialize a new reference with store-assigned identity and timestamps
    pub fn from_new(input: NewReference, id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            referencia: input.referencia.trim().to_string(),
            curva: input.curva,
            cantidad: input.cantidad,
            cantidad_colores: input.cantidad_colores,
            distribucion: input.distribucion,
            color: input.color,
            ubicacion: input.ubicacion,
            ingreso_a_bodega: input.ingreso_a_bodega,
            lanzamiento_capsula: input.lanzamiento_capsula,
            imagen_url: input.imagen_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place. `id` and `created_at` never change.
    pub fn apply_patch(&mut self, patch: &ReferencePatch, now: DateTime<Utc>) {
        if let Some(referencia) = &patch.referencia {
            self.referencia = referencia.trim().to_string();
        }
        if let Some(curva) = patch.curva {
            self.curva = curva;
        }
        if let Some(cantidad) = patch.cantidad {
            self.cantidad = cantidad;
        }
        if let Some(cantidad_colores) = patch.cantidad_colores {
            self.cantidad_colores = cantidad_colores;
        }
        if let Some(distribucion) = &patch.distribucion {
            self.distribucion = distribucion.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(ubicacion) = &patch.ubicacion {
            self.ubicacion = ubicacion.clone();
        }
        if let Some(ingreso) = patch.ingreso_a_bodega {
            self.ingreso_a_bodega = ingreso;
        }
        if let Some(lanzamiento) = patch.lanzamiento_capsula {
            self.lanzamiento_capsula = lanzamiento;
        }
        if let Some(imagen_url) = &patch.imagen_url {
            self.imagen_url = imagen_url.clone();
        }
        self.updated_at = now;
    }
}

/// Fields required to create a reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewReference {
    #[validate(length(min = 1, max = 100))]
    pub referencia: String,
    pub curva: Curva,
    #[validate(range(min = 1))]
    pub cantidad: i32,
    #[serde(default)]
    pub cantidad_colores: Option<ColorCount>,
    #[serde(default)]
    pub distribucion: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub ubicacion: Option<String>,
    #[serde(default)]
    pub ingreso_a_bodega: Option<NaiveDate>,
    #[serde(default)]
    pub lanzamiento_capsula: Option<NaiveDate>,
    #[serde(default)]
    pub imagen_url: Option<String>,
}

/// Partial update of a reference.
///
/// Outer `None` leaves a field untouched; for nullable fields `Some(None)`
/// clears it (JSON `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReferencePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub referencia: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curva: Option<Curva>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub cantidad: Option<i32>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub cantidad_colores: Option<Option<ColorCount>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub distribucion: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub ubicacion: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub ingreso_a_bodega: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub lanzamiento_capsula: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub imagen_url: Option<Option<String>>,
}

impl ReferencePatch {
    pub fn is_empty(&self) -> bool {
        *self == ReferencePatch::default()
    }
}

/// Distinguish an absent field from an explicit `null`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Kind of store mutation carried by a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A change notification from the store's subscription.
///
/// Delivery is at-least-once; consumers must fold these idempotently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub id: Uuid,
    /// Row image after the change; absent for deletes
    #[serde(default)]
    pub record: Option<Reference>,
}

impl ChangeEvent {
    pub fn insert(record: Reference) -> Self {
        Self {
            op: ChangeOp::Insert,
            id: record.id,
            record: Some(record),
        }
    }

    pub fn update(record: Reference) -> Self {
        Self {
            op: ChangeOp::Update,
            id: record.id,
            record: Some(record),
        }
    }

    pub fn delete(id: Uuid) -> Self {
        Self {
            op: ChangeOp::Delete,
            id,
            record: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Reference {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Reference::from_new(
            NewReference {
                referencia: "  ABC123 ".to_string(),
                curva: Curva::SToL,
                cantidad: 18,
                cantidad_colores: Some(ColorCount::One),
                distribucion: Some("6-6-6".to_string()),
                color: Some("Negro".to_string()),
                ubicacion: None,
                ingreso_a_bodega: None,
                lanzamiento_capsula: NaiveDate::from_ymd_opt(2024, 3, 1),
                imagen_url: None,
            },
            Uuid::new_v4(),
            now,
        )
    }

    #[test]
    fn test_from_new_trims_referencia() {
        assert_eq!(sample().referencia, "ABC123");
    }

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        let patch: ReferencePatch =
            serde_json::from_str(r#"{"color": null, "cantidad": 20}"#).unwrap();
        assert_eq!(patch.color, Some(None));
        assert_eq!(patch.cantidad, Some(20));
        assert_eq!(patch.lanzamiento_capsula, None);

        let mut reference = sample();
        let later = reference.updated_at + chrono::Duration::hours(1);
        reference.apply_patch(&patch, later);
        assert_eq!(reference.color, None);
        assert_eq!(reference.cantidad, 20);
        assert_eq!(reference.lanzamiento_capsula, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(reference.updated_at, later);
    }

    #[test]
    fn test_new_reference_validation() {
        let mut input = NewReference {
            referencia: String::new(),
            curva: Curva::SToL,
            cantidad: 0,
            cantidad_colores: None,
            distribucion: None,
            color: None,
            ubicacion: None,
            ingreso_a_bodega: None,
            lanzamiento_capsula: None,
            imagen_url: None,
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("referencia"));
        assert!(errors.field_errors().contains_key("cantidad"));

        input.referencia = "X1".to_string();
        input.cantidad = 1;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_change_event_json_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ChangeEvent::delete(id)).unwrap();
        assert_eq!(json["op"], "delete");
        assert!(json["record"].is_null());
    }
}
