use std::path::Path;

use anyhow::{anyhow, Result};

use crate::schema;

/// Validation utilities for preflight checks on the source and output layout
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the Signal profile directory layout before extraction
    pub fn validate_source_dir(dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(anyhow!(
                "The chosen directory does not exist! Please check your path and try again: {}",
                dir.display()
            ));
        }

        if !dir.join(schema::CONFIG_RELATIVE_PATH).is_file() {
            return Err(anyhow!(
                "The config.json file does not exist in {}. Please check that it exists and try again",
                dir.display()
            ));
        }

        if !dir.join(schema::STORE_RELATIVE_PATH).is_file() {
            return Err(anyhow!(
                "The db.sqlite file does not exist in {}/sql. Please check that it exists and try again",
                dir.display()
            ));
        }

        Ok(())
    }

    /// Ensure the output directory exists, creating it when missing
    pub fn prepare_output_dir(dir: &Path) -> Result<()> {
        if dir.is_file() {
            return Err(anyhow!(
                "The output path exists and is a file, not a directory: {}",
                dir.display()
            ));
        }
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow!("Cannot create output directory {}: {e}", dir.display()))?;
        Ok(())
    }

    /// Validate the shape of a hex-encoded store key
    pub fn validate_hex_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(anyhow!("Decryption key cannot be empty"));
        }

        if key.len() % 2 != 0 {
            return Err(anyhow!("Decryption key must have an even number of hex digits"));
        }

        if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Decryption key must be hex-encoded"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hex_key_valid() {
        assert!(InputValidator::validate_hex_key("deadBEEF00").is_ok());
    }

    #[test]
    fn test_validate_hex_key_empty() {
        assert!(InputValidator::validate_hex_key("").is_err());
    }

    #[test]
    fn test_validate_hex_key_odd_length() {
        assert!(InputValidator::validate_hex_key("abc").is_err());
    }

    #[test]
    fn test_validate_hex_key_non_hex() {
        assert!(InputValidator::validate_hex_key("zz11").is_err());
    }
}
