use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("No URL provided")]
    Empty,
    #[error("URL exceeds {max} characters")]
    TooLong { max: usize },
    #[error("URL must not start with '-'")]
    OptionLike,
}

/// Trim and check a submitted URL. The extractor decides whether it is supported.
pub fn validate_url(raw: &str, max_len: usize) -> Result<&str, UrlValidationError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(UrlValidationError::Empty);
    }
    if url.chars().count() > max_len {
        return Err(UrlValidationError::TooLong { max: max_len });
    }
    if url.starts_with('-') {
        return Err(UrlValidationError::OptionLike);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_trims() {
        assert_eq!(
            validate_url("  https://example.com/watch?v=abc\n", 2048),
            Ok("https://example.com/watch?v=abc")
        );
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(validate_url("", 2048), Err(UrlValidationError::Empty));
        assert_eq!(validate_url("   ", 2048), Err(UrlValidationError::Empty));
        assert_eq!(UrlValidationError::Empty.to_string(), "No URL provided");
    }

    #[test]
    fn rejects_long_and_option_like() {
        let long = format!("https://example.com/{}", "a".repeat(50));
        assert_eq!(
            validate_url(&long, 20),
            Err(UrlValidationError::TooLong { max: 20 })
        );
        assert_eq!(
            validate_url("--exec=rm", 2048),
            Err(UrlValidationError::OptionLike)
        );
    }
}
