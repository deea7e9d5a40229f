//! Dutch (nl-NL) display formatting for amounts and dates.

use chrono::{Datelike, NaiveDate};

pub const DEFAULT_CURRENCY: &str = "EUR";

const NBSP: char = '\u{a0}';

const MONTHS: [&str; 12] = [
    "januari",
    "februari",
    "maart",
    "april",
    "mei",
    "juni",
    "juli",
    "augustus",
    "september",
    "oktober",
    "november",
    "december",
];

fn currency_symbol(code: &str) -> String {
    match code.trim().to_ascii_uppercase().as_str() {
        "EUR" => "€".to_string(),
        "USD" => "US$".to_string(),
        "GBP" => "£".to_string(),
        other => other.to_string(),
    }
}

/// `€ 1.234,56`: symbol, no-break space, `.` grouping, `,` decimals.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let symbol = currency_symbol(currency);

    if amount.is_nan() {
        return format!("{symbol}{NBSP}NaN");
    }
    if amount.is_infinite() {
        let sign = if amount < 0.0 { "-" } else { "" };
        return format!("{symbol}{NBSP}{sign}∞");
    }

    let cents = (amount.abs() * 100.0).round() as u128;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };

    format!(
        "{symbol}{NBSP}{sign}{},{:02}",
        group_thousands(cents / 100),
        cents % 100
    )
}

pub fn format_eur(amount: f64) -> String {
    format_currency(amount, DEFAULT_CURRENCY)
}

fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Long form, e.g. `19 oktober 2026`.
pub fn format_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Short numeric form, e.g. `19-10-2026`.
pub fn format_date_short(date: NaiveDate) -> String {
    format!("{:02}-{:02}-{}", date.day(), date.month(), date.year())
}
