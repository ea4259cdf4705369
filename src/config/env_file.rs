//! The `.env` file handed to docker-compose: `IDENTIFIER` then `AMOUNT`, one per line.

use crate::utils::error::{HarvestError, Result};
use std::path::Path;

pub const IDENTIFIER_KEY: &str = "IDENTIFIER";
pub const AMOUNT_KEY: &str = "AMOUNT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    identifier: String,
    amount: String,
}

fn check_value(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(HarvestError::InvalidConfigValueError {
            field: field.to_string(),
            value: String::new(),
            reason: "Value cannot be empty".to_string(),
        });
    }
    if value.contains(['\n', '\r', '\0']) {
        return Err(HarvestError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.escape_debug().to_string(),
            reason: "Value must fit on a single line".to_string(),
        });
    }
    Ok(())
}

impl EnvFile {
    /// Values are kept verbatim.
    pub fn new(identifier: impl Into<String>, amount: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        let amount = amount.into();
        check_value(IDENTIFIER_KEY, &identifier)?;
        check_value(AMOUNT_KEY, &amount)?;
        Ok(Self { identifier, amount })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn render(&self) -> String {
        format!(
            "{}={}\n{}={}\n",
            IDENTIFIER_KEY, self.identifier, AMOUNT_KEY, self.amount
        )
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut identifier = None;
        let mut amount = None;

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| HarvestError::ValidationError {
                message: format!("line {}: expected KEY=VALUE, got '{}'", index + 1, line),
            })?;
            match key.trim() {
                IDENTIFIER_KEY => identifier = Some(value.to_string()),
                AMOUNT_KEY => amount = Some(value.to_string()),
                other => {
                    return Err(HarvestError::ValidationError {
                        message: format!("line {}: unknown key '{}'", index + 1, other),
                    })
                }
            }
        }

        let identifier = identifier.ok_or_else(|| HarvestError::MissingConfigError {
            field: IDENTIFIER_KEY.to_string(),
        })?;
        let amount = amount.ok_or_else(|| HarvestError::MissingConfigError {
            field: AMOUNT_KEY.to_string(),
        })?;
        Self::new(identifier, amount)
    }

    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}
