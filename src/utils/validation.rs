use crate::utils::error::{HarvestError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> HarvestError {
    HarvestError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    // `{id}` templates are checked with a concrete id in place.
    let candidate = url_str.replace("{id}", "1");
    match Url::parse(&candidate) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(field_name, url_str, format!("Invalid URL format: {}", e))),
    }
}

pub fn validate_proxy_url(field_name: &str, url_str: &str) -> Result<()> {
    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "socks5" | "socks5h" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported proxy scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(field_name, url_str, format!("Invalid URL format: {}", e))),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
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
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_base", "https://api.scratch.mit.edu").is_ok());
        assert!(validate_url("api_base", "http://localhost:8080").is_ok());
        assert!(validate_url("api_base", "").is_err());
        assert!(validate_url("api_base", "invalid-url").is_err());
        assert!(validate_url("api_base", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_url_accepts_id_template() {
        assert!(validate_url(
            "fallback_template",
            "https://projects.scratch.mit.edu/internalapi/project/{id}/get/"
        )
        .is_ok());
    }

    #[test]
    fn test_validate_proxy_url() {
        assert!(validate_proxy_url("proxy", "socks5h://tor_proxy:9050").is_ok());
        assert!(validate_proxy_url("proxy", "http://127.0.0.1:3128").is_ok());
        assert!(validate_proxy_url("proxy", "gopher://x").is_err());
    }

    #[test]
    fn test_validate_positive_number_and_range() {
        assert!(validate_positive_number("workers", 5, 1).is_ok());
        assert!(validate_positive_number("workers", 0, 1).is_err());
        assert!(validate_range("workers", 256usize, 1, 256).is_ok());
        assert!(validate_range("workers", 257usize, 1, 256).is_err());
    }
}
