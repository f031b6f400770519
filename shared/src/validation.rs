//! Validation utilities for GanttFlow references
//!
//! Field-level rules beyond what the `validator` derives on the input types
//! express. Each check returns a static message; [`check_new_reference`] and
//! [`check_patched_reference`] also name the offending field.

use crate::distribution::{distribution_sum, lookup};
use crate::models::{NewReference, Reference};

/// Longest accepted `referencia`
pub const MAX_REFERENCIA_LEN: usize = 100;

// ============================================================================
// Field Validations
// ============================================================================

/// Validate a reference code: non-blank, bounded, no control characters
pub fn validate_referencia(referencia: &str) -> Result<(), &'static str> {
    let trimmed = referencia.trim();
    if trimmed.is_empty() {
        return Err("Referencia is required");
    }
    if trimmed.chars().count() > MAX_REFERENCIA_LEN {
        return Err("Referencia must be at most 100 characters");
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Referencia cannot contain control characters");
    }
    Ok(())
}

/// Validate unit count
pub fn validate_cantidad(cantidad: i32) -> Result<(), &'static str> {
    if cantidad < 1 {
        return Err("Cantidad must be at least 1");
    }
    Ok(())
}

/// Validate an image URL (http or https only)
pub fn validate_image_url(url: &str) -> Result<(), &'static str> {
    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err("Image URL must start with http:// or https://");
    }
    if url.contains(char::is_whitespace) {
        return Err("Image URL cannot contain spaces");
    }
    Ok(())
}

// ============================================================================
// Distribution Validations
// ============================================================================

/// Validate that a numeric distribution adds up to `cantidad`.
///
/// Free-text distributions are accepted as-is.
pub fn validate_distribution_matches(distribucion: &str, cantidad: i32) -> Result<(), &'static str> {
    match distribution_sum(distribucion) {
        Some(total) if i64::from(total) != i64::from(cantidad) => {
            Err("Distribution does not add up to cantidad")
        }
        _ => Ok(()),
    }
}

/// Check a table-derived distribution against its quantity.
///
/// Only applies when the distribution is exactly the table entry for the
/// reference's curva and color count.
fn validate_auto_distribution(reference: &Reference) -> Result<(), &'static str> {
    let Some(colors) = reference.cantidad_colores else {
        return Ok(());
    };
    let Some(entry) = lookup(reference.curva, colors) else {
        return Ok(());
    };
    match reference.distribucion.as_deref() {
        Some(d) if d.trim() == entry.distribution => {
            validate_distribution_matches(d, reference.cantidad)
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Whole-record Checks
// ============================================================================

fn check_fields(reference: &Reference) -> Result<(), (&'static str, &'static str)> {
    validate_referencia(&reference.referencia).map_err(|m| ("referencia", m))?;
    validate_cantidad(reference.cantidad).map_err(|m| ("cantidad", m))?;
    if let Some(url) = reference.imagen_url.as_deref() {
        validate_image_url(url).map_err(|m| ("imagen_url", m))?;
    }
    validate_auto_distribution(reference).map_err(|m| ("distribucion", m))?;
    Ok(())
}

/// Validate a create request. Returns the offending field and message.
pub fn check_new_reference(input: &NewReference) -> Result<(), (&'static str, &'static str)> {
    validate_referencia(&input.referencia).map_err(|m| ("referencia", m))?;
    validate_cantidad(input.cantidad).map_err(|m| ("cantidad", m))?;
    if let Some(url) = input.imagen_url.as_deref() {
        validate_image_url(url).map_err(|m| ("imagen_url", m))?;
    }
    if let (Some(colors), Some(d)) = (input.cantidad_colores, input.distribucion.as_deref()) {
        if lookup(input.curva, colors).is_some_and(|e| e.distribution == d.trim()) {
            validate_distribution_matches(d, input.cantidad).map_err(|m| ("distribucion", m))?;
        }
    }
    Ok(())
}

/// Validate a reference after a patch was applied to it
pub fn check_patched_reference(reference: &Reference) -> Result<(), (&'static str, &'static str)> {
    check_fields(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColorCount, Curva};
    use chrono::Utc;
    use uuid::Uuid;

    fn input() -> NewReference {
        NewReference {
            referencia: "REF-1".to_string(),
            curva: Curva::XsToXl,
            cantidad: 18,
            cantidad_colores: Some(ColorCount::One),
            distribucion: Some("3-4-4-4-3".to_string()),
            color: None,
            ubicacion: None,
            ingreso_a_bodega: None,
            lanzamiento_capsula: None,
            imagen_url: None,
        }
    }

    #[test]
    fn test_validate_referencia() {
        assert!(validate_referencia("ABC123").is_ok());
        assert!(validate_referencia("   ").is_err());
        assert!(validate_referencia(&"x".repeat(101)).is_err());
        assert!(validate_referencia("AB\tC").is_err());
    }

    #[test]
    fn test_validate_cantidad() {
        assert!(validate_cantidad(1).is_ok());
        assert!(validate_cantidad(0).is_err());
        assert!(validate_cantidad(-5).is_err());
    }

    #[test]
    fn test_validate_image_url() {
        assert!(validate_image_url("https://cdn.example.com/a.png").is_ok());
        assert!(validate_image_url("ftp://example.com/a.png").is_err());
        assert!(validate_image_url("https://example.com/a b.png").is_err());
    }

    #[test]
    fn test_distribution_matches() {
        assert!(validate_distribution_matches("6-6-6", 18).is_ok());
        assert!(validate_distribution_matches("6-6-6", 20).is_err());
        assert!(validate_distribution_matches("por definir", 7).is_ok());
    }

    #[test]
    fn test_check_new_reference() {
        assert!(check_new_reference(&input()).is_ok());

        let mut wrong_total = input();
        wrong_total.cantidad = 25;
        assert_eq!(
            check_new_reference(&wrong_total).unwrap_err().0,
            "distribucion"
        );

        // A hand-typed distribution is not held to the quantity
        let mut manual = input();
        manual.distribucion = Some("5-5-5-5-5".to_string());
        manual.cantidad = 40;
        assert!(check_new_reference(&manual).is_ok());
    }

    #[test]
    fn test_check_patched_reference() {
        let mut reference = Reference::from_new(input(), Uuid::new_v4(), Utc::now());
        assert!(check_patched_reference(&reference).is_ok());
        reference.cantidad = 0;
        assert_eq!(check_patched_reference(&reference).unwrap_err().0, "cantidad");
    }
}
