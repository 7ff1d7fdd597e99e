use crate::utils::error::{Result, TitrationError};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(TitrationError::InvalidValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(TitrationError::InvalidValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u32, min_value: u32) -> Result<()> {
    if value < min_value {
        return Err(TitrationError::InvalidValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| TitrationError::MissingFieldError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TitrationError::InvalidValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
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
        return Err(TitrationError::InvalidValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("simulation.weeks", 8, 1).is_ok());
        assert!(validate_positive_number("simulation.weeks", 0, 1).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some(2.5);
        let missing: Option<f64> = None;
        assert_eq!(*validate_required_field("starting_dose", &present).unwrap(), 2.5);
        let err = validate_required_field("starting_dose", &missing).unwrap_err();
        assert!(matches!(err, TitrationError::MissingFieldError { .. }));
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("baseline.adherence", 0.95, 0.0, 1.0).is_ok());
        assert!(validate_range("baseline.adherence", 1.2, 0.0, 1.0).is_err());
        assert!(validate_non_empty_string("patient_id", "  ").is_err());
        assert!(validate_path("results_dir", "").is_err());
    }
}
