//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

fn parse_coordinate(value: &str, name: &str, bound: f64) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("{name} must be a number, got: '{value}'"))?;

    if !(-bound..=bound).contains(&parsed) {
        return Err(format!("{name} must be between -{bound} and {bound}, got: {value}"));
    }

    Ok(parsed)
}

/// Latitude in degrees, [-90, 90]
pub fn validate_latitude(value: &str) -> Result<f64, String> {
    parse_coordinate(value, "Latitude", 90.0)
}

/// Longitude in degrees, [-180, 180]
pub fn validate_longitude(value: &str) -> Result<f64, String> {
    parse_coordinate(value, "Longitude", 180.0)
}

/// Cuisine ids are slugs such as `pizza` or `fried-chicken`
pub fn validate_category_id(value: &str) -> Result<String, String> {
    let id = value.trim();

    if id.is_empty() {
        return Err("Category id cannot be empty".to_string());
    }

    if id.chars().any(char::is_whitespace) {
        return Err(format!("Category id cannot contain spaces: '{}'", value));
    }

    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_path_validation() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(validate_config_file_path(path).unwrap(), file.path());

        let dir = tempfile::TempDir::new().unwrap();
        let err = validate_config_file_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("not a file"));

        let missing = dir.path().join("missing.toml");
        let err = validate_config_file_path(missing.to_str().unwrap()).unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_coordinate_validation_valid() {
        for value in ["0", "90", "-90", "30.2599563"] {
            assert!(validate_latitude(value).is_ok(), "Latitude {} should be valid", value);
        }
        for value in ["180", "-180", "-97.7147446"] {
            assert!(validate_longitude(value).is_ok(), "Longitude {} should be valid", value);
        }
    }

    #[test]
    fn test_coordinate_validation_invalid() {
        for value in ["90.5", "-91", "north", "", "NaN"] {
            assert!(validate_latitude(value).is_err(), "Latitude '{}' should be invalid", value);
        }
        for value in ["180.1", "-200", "west"] {
            assert!(validate_longitude(value).is_err(), "Longitude '{}' should be invalid", value);
        }
    }

    #[test]
    fn test_category_id_validation() {
        assert_eq!(validate_category_id("pizza").unwrap(), "pizza");
        assert_eq!(validate_category_id(" burgers ").unwrap(), "burgers");

        for value in ["", "   ", "fried chicken"] {
            assert!(validate_category_id(value).is_err(), "Category '{}' should be invalid", value);
        }
    }
}
