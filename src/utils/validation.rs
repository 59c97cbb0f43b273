// file: src/utils/validation.rs
// description: input validation helpers for configuration and search parameters
// reference: input validation patterns

use crate::error::{Result, ServiceError};
use std::path::Path;

pub struct Validator;

impl Validator {
    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServiceError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    pub fn validate_port(port: u16) -> Result<()> {
        if port == 0 {
            return Err(ServiceError::Validation("Port cannot be 0".to_string()));
        }
        Ok(())
    }

    pub fn validate_chunk_size(size: usize) -> Result<()> {
        if size == 0 {
            return Err(ServiceError::Validation(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        if size > 10000 {
            return Err(ServiceError::Validation(
                "Chunk size too large (max 10000)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_ca_cert_file(path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(ServiceError::Validation(format!(
                "CA certificate is not a file: {}",
                path.display()
            )));
        }
        Ok(())
    }

    pub fn validate_not_blank(name: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ServiceError::Validation(format!("{} must not be empty", name)));
        }
        Ok(())
    }

    pub fn validate_latitude(latitude: f64) -> Result<()> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ServiceError::Validation(format!(
                "latitude must be between -90 and 90, got {}",
                latitude
            )));
        }
        Ok(())
    }

    pub fn validate_longitude(longitude: f64) -> Result<()> {
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ServiceError::Validation(format!(
                "longitude must be between -180 and 180, got {}",
                longitude
            )));
        }
        Ok(())
    }

    pub fn validate_non_negative(name: &str, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(ServiceError::Validation(format!(
                "{} must be a non-negative number, got {}",
                name, value
            )));
        }
        Ok(())
    }

    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((end, _)) => format!("{}...", &text[..end]),
            None => text.to_string(),
        }
    }
}
