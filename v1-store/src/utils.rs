use chrono::{NaiveDate, Utc};

/// Today's date in UTC, the date stamped on new and updated records
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Human-readable date, e.g. "Oct 19, 2026"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Loose `local@domain.tld` check: no whitespace, one `@`, and a dot inside
/// the domain with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
