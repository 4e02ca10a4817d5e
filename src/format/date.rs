//! Excel date/time format codes translated to chrono format strings

use crate::error::FormatError;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Year(usize),
    // Month or minute, decided once neighbours are known
    M(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    AmPm,
}

/// Parsed date/time format code
#[derive(Debug, Clone, PartialEq)]
pub struct DatePattern {
    strftime: String,
}

impl DatePattern {
    pub fn parse(pattern: &str) -> Result<Self, FormatError> {
        let tokens = tokenize(pattern)?;
        let twelve_hour = tokens.contains(&Token::AmPm);

        let mut strftime = String::with_capacity(pattern.len() * 2);
        let mut fields = 0;
        for (i, token) in tokens.iter().enumerate() {
            let directive = match token {
                Token::Literal(text) => {
                    strftime.push_str(&text.replace('%', "%%"));
                    continue;
                }
                Token::Year(n) if *n <= 2 => "%y",
                Token::Year(_) => "%Y",
                Token::M(n) if *n <= 2 && is_minute(&tokens, i) => {
                    if *n == 1 {
                        "%-M"
                    } else {
                        "%M"
                    }
                }
                Token::M(1) => "%-m",
                Token::M(2) => "%m",
                Token::M(3) => "%b",
                Token::M(_) => "%B",
                Token::Day(1) => "%-d",
                Token::Day(2) => "%d",
                Token::Day(3) => "%a",
                Token::Day(_) => "%A",
                Token::Hour(1) if twelve_hour => "%-I",
                Token::Hour(_) if twelve_hour => "%I",
                Token::Hour(1) => "%-H",
                Token::Hour(_) => "%H",
                Token::Second(1) => "%-S",
                Token::Second(_) => "%S",
                Token::AmPm => "%p",
            };
            strftime.push_str(directive);
            fields += 1;
        }

        if fields == 0 {
            return Err(FormatError::NoDateField(pattern.to_string()));
        }
        Ok(DatePattern { strftime })
    }

    pub fn format(&self, value: &NaiveDateTime) -> Result<String, FormatError> {
        let mut out = String::new();
        write!(out, "{}", value.format(&self.strftime))
            .map_err(|_| FormatError::Render(self.strftime.clone()))?;
        Ok(out)
    }
}

/// `m`/`mm` right after an hour or right before a second field means minutes
fn is_minute(tokens: &[Token], at: usize) -> bool {
    let prev = tokens[..at]
        .iter()
        .rev()
        .find(|t| !matches!(t, Token::Literal(_)));
    let next = tokens[at + 1..]
        .iter()
        .find(|t| !matches!(t, Token::Literal(_)));
    matches!(prev, Some(Token::Hour(_))) || matches!(next, Some(Token::Second(_)))
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, FormatError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let lower = c.to_ascii_lowercase();
        match lower {
            'y' | 'm' | 'd' | 'h' | 's' => {
                let mut n = 1;
                while i + n < chars.len() && chars[i + n].to_ascii_lowercase() == lower {
                    n += 1;
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(match lower {
                    'y' => Token::Year(n),
                    'm' => Token::M(n),
                    'd' => Token::Day(n),
                    'h' => Token::Hour(n),
                    _ => Token::Second(n),
                });
                i += n;
            }
            'a' if starts_with_ignore_case(&chars[i..], "am/pm") || starts_with_ignore_case(&chars[i..], "a/p") => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::AmPm);
                i += if starts_with_ignore_case(&chars[i..], "am/pm") { 5 } else { 3 };
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    literal.push(chars[i]);
                    i += 1;
                }
                if i == chars.len() {
                    return Err(FormatError::Render(pattern.to_string()));
                }
                i += 1;
            }
            '\\' => {
                let next = chars
                    .get(i + 1)
                    .ok_or_else(|| FormatError::Render(pattern.to_string()))?;
                literal.push(*next);
                i += 2;
            }
            '[' => {
                // Locale and color tags
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                if i == chars.len() {
                    return Err(FormatError::Render(pattern.to_string()));
                }
                i += 1;
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn starts_with_ignore_case(chars: &[char], needle: &str) -> bool {
    let n = needle.chars().count();
    chars.len() >= n
        && chars
            .iter()
            .zip(needle.chars())
            .all(|(a, b)| a.to_ascii_lowercase() == b)
}

/// True when a format code formats dates rather than numbers
pub fn is_date_pattern(pattern: &str) -> bool {
    let Ok(tokens) = tokenize(pattern) else {
        return false;
    };
    let has_digit_placeholder = tokens.iter().any(|t| match t {
        Token::Literal(text) => text.contains(|c| matches!(c, '0' | '#')),
        _ => false,
    });
    tokens.iter().any(|t| match t {
        Token::Literal(_) => false,
        Token::M(_) => !has_digit_placeholder,
        _ => true,
    })
}

/// Excel serial day number (1900 date system)
pub fn excel_serial(value: &NaiveDateTime) -> f64 {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(0.0, |epoch| {
            (*value - epoch).num_milliseconds() as f64 / 86_400_000.0
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    fn fmt(pattern: &str, value: &NaiveDateTime) -> String {
        DatePattern::parse(pattern).unwrap().format(value).unwrap()
    }

    #[test]
    fn test_dates() {
        let d = at(2011, 9, 17, 0, 0, 0);
        assert_eq!(fmt("mm/dd/yyyy", &d), "09/17/2011");
        assert_eq!(fmt("yyyy-mm-dd", &d), "2011-09-17");
        assert_eq!(fmt("d mmm yy", &d), "17 Sep 11");
        assert_eq!(fmt("dddd, mmmm d", &d), "Saturday, September 17");
    }

    #[test]
    fn test_times_and_minutes() {
        let t = at(2011, 9, 7, 14, 5, 9);
        assert_eq!(fmt("hh:mm:ss", &t), "14:05:09");
        assert_eq!(fmt("h:mm AM/PM", &t), "2:05 PM");
        assert_eq!(fmt("m/d/yyyy h:mm", &t), "9/7/2011 14:05");
    }

    #[test]
    fn test_literals_are_escaped() {
        let d = at(2011, 9, 17, 0, 0, 0);
        assert_eq!(fmt("yyyy\"%\"", &d), "2011%");
        assert_eq!(fmt("[$-409]yyyy", &d), "2011");
    }

    #[test]
    fn test_pattern_without_fields() {
        assert!(matches!(
            DatePattern::parse("---"),
            Err(FormatError::NoDateField(_))
        ));
    }

    #[test]
    fn test_unterminated_literals_are_rejected() {
        for pattern in ["yyyy\"-", "[$-409yyyy", "yyyy\\"] {
            assert!(
                matches!(DatePattern::parse(pattern), Err(FormatError::Render(_))),
                "{pattern}"
            );
            assert!(!is_date_pattern(pattern));
        }
    }

    #[test]
    fn test_pattern_classification() {
        assert!(is_date_pattern("mm/dd/yyyy"));
        assert!(is_date_pattern("h:mm"));
        assert!(!is_date_pattern("#0.00"));
        assert!(!is_date_pattern("0.00%"));
        assert!(!is_date_pattern("#,##0 \"items\""));
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(excel_serial(&at(1900, 3, 1, 0, 0, 0)), 61.0);
        assert_eq!(excel_serial(&at(2011, 9, 17, 12, 0, 0)), 40803.5);
    }
}
