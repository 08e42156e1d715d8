//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, TimeZone};

/// Parse a CMS timestamp such as `2021-03-25T19:25:28+0000`
pub fn parse_cms_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}

/// Locale used for month names
fn locale(language: &str) -> Locale {
    let language = language.to_ascii_lowercase().replace('_', "-");
    match language.as_str() {
        "pt-pt" => Locale::pt_PT,
        l if l.starts_with("pt") => Locale::pt_BR,
        l if l.starts_with("es") => Locale::es_ES,
        l if l.starts_with("fr") => Locale::fr_FR,
        l if l.starts_with("de") => Locale::de_DE,
        _ => Locale::en_US,
    }
}

/// Format a date using date-fns tokens (`dd MMM yyyy` -> `25 mar 2021` in pt-BR)
///
/// # Examples
/// ```ignore
/// format_date(&date, "d 'de' MMMM 'de' yyyy", "pt-BR") // -> "5 de março de 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, language: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    // Convert date-fns format to chrono format
    let chrono_format = date_fns_to_chrono_format(format);
    date.format_localized(&chrono_format, locale(language)).to_string()
}

/// Translate date-fns tokens (`yyyy`, `MMM`, `dd`, ...) into strftime
/// specifiers. Text inside single quotes is kept literally.
fn date_fns_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut result = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let specifier = match (c, run) {
            ('y', 2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', _) => Some("%d"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('m', _) => Some("%M"),
            ('s', _) => Some("%S"),
            _ => None,
        };

        match specifier {
            Some(item) => result.push_str(item),
            None => (0..run).for_each(|_| push_literal(&mut result, c)),
        }
        i += run;
    }

    result
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
