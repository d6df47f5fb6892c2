use thiserror::Error;

use crate::extract::Cell;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// A count cell that is neither an integer-valued number nor grouped digits.
    #[error("unsupported value type: {value:?} ({repr})")]
    UnsupportedValue { value: String, repr: &'static str },
}

/// Coerce a count cell into an integer.
///
/// - integers pass through
/// - numbers with no fractional part are truncated losslessly
/// - text has `,` grouping separators stripped before parsing
///
/// Everything else is an `UnsupportedValue`, never a silent zero.
pub fn normalize_count(cell: &Cell) -> Result<i64, NormalizeError> {
    let parsed = match cell {
        Cell::Integer(n) => Some(*n),
        Cell::Number(x) => integral(*x),
        Cell::Text(s) => parse_grouped(s),
        Cell::Empty => None,
    };
    parsed.ok_or_else(|| NormalizeError::UnsupportedValue {
        value: cell.to_string(),
        repr: cell.repr(),
    })
}

/// Non-failing probe with the same acceptance rule as `normalize_count`.
pub fn looks_like_count(cell: &Cell) -> bool {
    normalize_count(cell).is_ok()
}

fn integral(x: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict bound
    if x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

fn parse_grouped(s: &str) -> Option<i64> {
    let digits: String = s.trim().chars().filter(|&c| c != ',').collect();
    if digits.is_empty() {
        return None;
    }
    digits
        .parse::<i64>()
        .ok()
        .or_else(|| digits.parse::<f64>().ok().and_then(integral))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representations_agree() {
        let reprs = [
            Cell::Integer(1234),
            Cell::Number(1234.0),
            Cell::from("1,234"),
            Cell::from("1234"),
            Cell::from(" 1,234 "),
        ];
        for cell in &reprs {
            assert_eq!(normalize_count(cell), Ok(1234), "{:?}", cell);
        }
    }

    #[test]
    fn test_large_grouped_text() {
        assert_eq!(normalize_count(&Cell::from("1,234,567")), Ok(1_234_567));
        assert_eq!(normalize_count(&Cell::from("0")), Ok(0));
    }

    #[test]
    fn test_not_applicable_is_unsupported() {
        let err = normalize_count(&Cell::from("N/A")).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::UnsupportedValue {
                value: "N/A".into(),
                repr: "text"
            }
        );
        assert!(err.to_string().contains("N/A"));
    }

    #[test]
    fn test_rejects_empty_fraction_and_nan() {
        assert!(matches!(
            normalize_count(&Cell::Empty),
            Err(NormalizeError::UnsupportedValue { repr: "empty", .. })
        ));
        assert!(matches!(
            normalize_count(&Cell::Number(12.5)),
            Err(NormalizeError::UnsupportedValue { repr: "number", .. })
        ));
        assert!(normalize_count(&Cell::Number(f64::NAN)).is_err());
        assert!(normalize_count(&Cell::from(",")).is_err());
    }

    #[test]
    fn test_looks_like_count() {
        assert!(looks_like_count(&Cell::from("3,001")));
        assert!(!looks_like_count(&Cell::from("Issuances")));
        assert!(!looks_like_count(&Cell::Empty));
    }
}
