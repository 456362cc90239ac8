use anyhow::{bail, Result};

// ---------------------------------------------------------------------------
// Number locale
// ---------------------------------------------------------------------------

/// Decimal convention used for formula literals and numeric constants in the
/// exported workbook. Detected once at startup and passed explicitly to the
/// renderer, never sniffed from the OS inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberLocale {
    /// Point decimals, English spreadsheet literals ("FALSE").
    Point,
    /// Comma decimals, German spreadsheet literals ("FALSCH").
    Comma,
}

impl NumberLocale {
    /// Detect the convention from the process environment. German locales
    /// use comma decimals; everything else falls back to point.
    pub fn from_env() -> Self {
        let lang = std::env::var("LC_NUMERIC")
            .or_else(|_| std::env::var("LC_ALL"))
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_default();
        if lang.starts_with("de") {
            NumberLocale::Comma
        } else {
            NumberLocale::Point
        }
    }

    /// The spreadsheet literal for boolean false in this locale.
    pub fn false_literal(self) -> &'static str {
        match self {
            NumberLocale::Point => "FALSE",
            NumberLocale::Comma => "FALSCH",
        }
    }

    /// Render a point-decimal constant ("0.65") in this locale.
    pub fn decimal_literal(self, value: &str) -> String {
        match self {
            NumberLocale::Point => value.to_string(),
            NumberLocale::Comma => value.replace('.', ","),
        }
    }
}

// ---------------------------------------------------------------------------
// User input
// ---------------------------------------------------------------------------

/// Parse a user-entered decimal, accepting both comma and point separators.
pub fn parse_decimal(s: &str) -> Result<f64> {
    let normalized = s.trim().replace(',', ".");
    if normalized.is_empty() {
        bail!("empty number");
    }
    match normalized.parse::<f64>() {
        Ok(v) => Ok(v),
        Err(_) => bail!("'{}' is not a number", s.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_point_decimals() {
        assert_eq!(parse_decimal("0.01").unwrap(), 0.01);
        assert_eq!(parse_decimal("  1.5 ").unwrap(), 1.5);
    }

    #[test]
    fn parses_comma_decimals() {
        assert_eq!(parse_decimal("0,01").unwrap(), 0.01);
        assert_eq!(parse_decimal("0,2").unwrap(), 0.2);
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("   ").is_err());
    }

    #[test]
    fn locale_literals() {
        assert_eq!(NumberLocale::Point.false_literal(), "FALSE");
        assert_eq!(NumberLocale::Comma.false_literal(), "FALSCH");
        assert_eq!(NumberLocale::Point.decimal_literal("0.65"), "0.65");
        assert_eq!(NumberLocale::Comma.decimal_literal("0.65"), "0,65");
    }
}
