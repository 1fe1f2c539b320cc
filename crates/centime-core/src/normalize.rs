//! Field normalizers: raw statement strings to amounts, dates, and
//! clean labels
//!
//! Pure functions, tolerant of the locale variants seen across the
//! supported banks (EU decimal commas, parenthesized negatives, mixed
//! date orders).

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Parse a monetary amount, tolerating locale variants
///
/// - `(1234.56)` denotes a negative amount
/// - currency symbols and whitespace are stripped
/// - a comma after the last period means EU style (comma decimal,
///   periods as thousands grouping); otherwise periods are decimal and
///   commas are grouping
///
/// Unparseable input yields `0.0` so the caller can treat the row as
/// carrying no usable amount.
pub fn parse_amount(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let (body, parenthesized) = match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && !"€$£¥+".contains(*c))
        .collect();

    let last_comma = cleaned.rfind(',');
    let last_period = cleaned.rfind('.');

    let normalized = match (last_comma, last_period) {
        // EU style: comma is the decimal separator
        (Some(comma), period) if period.map_or(true, |p| comma > p) => {
            cleaned.replace('.', "").replace(',', ".")
        }
        // US/plain style: strip grouping commas
        _ => cleaned.replace(',', ""),
    };

    let value: f64 = match normalized.parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };

    if parenthesized {
        -value.abs()
    } else {
        value
    }
}

/// Parse a date string, trying ISO, then EU day-first, then US
///
/// The US form is only accepted when the first numeric group is <= 12;
/// larger values are rejected rather than silently misread. A day-first
/// reading wins whenever both orders are plausible, which matches the
/// locale of the supported banks but can misinterpret genuinely US-
/// formatted dates with both components <= 12.
pub fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // ISO prefix match: YYYY-MM-DD optionally followed by a time part
    if let Some(prefix) = s.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    // EU day-first with explicit separators
    for fmt in ["%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // US month-first, guarded: only when the leading group could be a month
    let first_group: Option<u32> = s
        .split(['/', '-'])
        .next()
        .and_then(|g| g.trim().parse().ok());
    if matches!(first_group, Some(n) if n <= 12) {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
            return Some(date);
        }
    }

    // Last resort: other separators and two-digit years
    for fmt in ["%d.%m.%Y", "%Y/%m/%d", "%d/%m/%y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    None
}

fn noise_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(PAIEMENT PAR CARTE|ACHAT CB|CARTE|CB|PRLV SEPA|PRLV|VIR SEPA RECU|VIR SEPA|VIR|VIREMENT|RETRAIT DAB|RETRAIT|DIRECT DEBIT|CARD PAYMENT|STANDING ORDER|POS)\b[\s:./-]*",
        )
        .expect("valid noise prefix regex")
    })
}

fn trailing_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[\s-]*(?:REF[.:\s]*|N[O°][.:\s]*)?\d{6,}\s*$")
            .expect("valid trailing reference regex")
    })
}

/// Strip bank boilerplate from a transaction label
///
/// Removes card/transfer/direct-debit prefixes and trailing reference
/// numbers, then collapses internal whitespace.
pub fn clean_label(s: &str) -> String {
    let stripped = noise_prefix_re().replace(s.trim(), "");
    let stripped = trailing_reference_re().replace(&stripped, "");
    let collapsed: Vec<&str> = stripped.split_whitespace().collect();
    collapsed.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_eu_grouping() {
        assert_eq!(parse_amount("1.234,56"), 1234.56);
    }

    #[test]
    fn test_parse_amount_parenthesized_eu() {
        assert_eq!(parse_amount("(12,50)"), -12.50);
    }

    #[test]
    fn test_parse_amount_currency_suffix() {
        assert_eq!(parse_amount("12,50 €"), 12.50);
    }

    #[test]
    fn test_parse_amount_us_style() {
        assert_eq!(parse_amount("$1,234.56"), 1234.56);
        assert_eq!(parse_amount("-123.45"), -123.45);
        assert_eq!(parse_amount("(100.00)"), -100.00);
    }

    #[test]
    fn test_parse_amount_unparseable_is_zero() {
        assert_eq!(parse_amount("n/a"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("--"), 0.0);
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(
            parse_flexible_date("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        // ISO prefix with trailing time component
        assert_eq!(
            parse_flexible_date("2024-03-05T10:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn test_parse_date_eu_day_first() {
        assert_eq!(
            parse_flexible_date("05/03/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_flexible_date("05-03-2024"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn test_parse_date_day_first_when_month_impossible() {
        // 13 cannot be a month, so this must read day-first
        assert_eq!(
            parse_flexible_date("13/02/2024"),
            NaiveDate::from_ymd_opt(2024, 2, 13)
        );
    }

    #[test]
    fn test_parse_date_us_fallback() {
        // Day-first fails (month 25 invalid), US order accepted
        assert_eq!(
            parse_flexible_date("12/25/2024"),
            NaiveDate::from_ymd_opt(2024, 12, 25)
        );
    }

    #[test]
    fn test_parse_date_unparseable() {
        assert_eq!(parse_flexible_date("not a date"), None);
        assert_eq!(parse_flexible_date(""), None);
    }

    #[test]
    fn test_clean_label_strips_card_prefix() {
        assert_eq!(clean_label("CARTE 05/03 NETFLIX.COM"), "05/03 NETFLIX.COM");
        assert_eq!(clean_label("PRLV SEPA EDF CLIENTS"), "EDF CLIENTS");
    }

    #[test]
    fn test_clean_label_strips_trailing_reference() {
        assert_eq!(clean_label("EDF CLIENTS REF 123456789"), "EDF CLIENTS");
        assert_eq!(clean_label("SALAIRE ACME 20240301001"), "SALAIRE ACME");
    }

    #[test]
    fn test_clean_label_collapses_whitespace() {
        assert_eq!(clean_label("  SPOTIFY   AB  "), "SPOTIFY AB");
    }
}
