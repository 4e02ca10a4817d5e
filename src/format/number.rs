//! Excel number format codes rendered to display strings
//!
//! Supports digit placeholders (`0`, `#`, `?`), thousands grouping, trailing
//! comma scaling, percent, quoted/escaped literals and up to three `;`
//! separated sections (positive, negative, zero). Scientific and fraction
//! formats are rejected so callers fall back to natural text.

use crate::error::FormatError;

#[derive(Debug, Clone, PartialEq)]
struct Section {
    prefix: String,
    suffix: String,
    min_int: usize,
    grouping: bool,
    scale_thousands: u32,
    min_frac: usize,
    max_frac: usize,
    percent: bool,
}

/// Parsed number format code
#[derive(Debug, Clone, PartialEq)]
pub struct NumberPattern {
    sections: Vec<Section>,
}

#[derive(PartialEq)]
enum State {
    Prefix,
    Core,
    Suffix,
}

impl NumberPattern {
    pub fn parse(pattern: &str) -> Result<Self, FormatError> {
        let sections = split_sections(pattern)
            .into_iter()
            .enumerate()
            .map(|(i, s)| parse_section(s, pattern, i > 0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NumberPattern { sections })
    }

    pub fn format(&self, value: f64) -> Result<String, FormatError> {
        if !value.is_finite() {
            return Err(FormatError::Mismatch {
                pattern: String::new(),
                kind: "non-finite",
            });
        }
        let (section, signed) = if value < 0.0 && self.sections.len() > 1 {
            (&self.sections[1], false)
        } else if value == 0.0 && self.sections.len() > 2 {
            (&self.sections[2], false)
        } else {
            (&self.sections[0], true)
        };
        let magnitude = if signed { value } else { value.abs() };
        Ok(section.format(magnitude))
    }
}

fn split_sections(pattern: &str) -> Vec<&str> {
    let mut sections = Vec::with_capacity(3);
    let mut in_quote = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quote = !in_quote,
            ';' if !in_quote => {
                sections.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    sections.push(&pattern[start..]);
    sections
}

fn parse_section(section: &str, pattern: &str, literal_only_ok: bool) -> Result<Section, FormatError> {
    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut core = String::new();
    let mut percent = false;
    let mut state = State::Prefix;
    let mut chars = section.chars();

    // Literals land before or after the numeric core.
    fn literal(state: &mut State, prefix: &mut String, suffix: &mut String, text: &str) {
        if *state == State::Core {
            *state = State::Suffix;
        }
        if *state == State::Prefix {
            prefix.push_str(text);
        } else {
            suffix.push_str(text);
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let mut quoted = String::new();
                let mut closed = false;
                for q in chars.by_ref() {
                    if q == '"' {
                        closed = true;
                        break;
                    }
                    quoted.push(q);
                }
                if !closed {
                    return Err(FormatError::Render(pattern.to_string()));
                }
                literal(&mut state, &mut prefix, &mut suffix, &quoted);
            }
            '\\' => {
                let next = chars
                    .next()
                    .ok_or_else(|| FormatError::Render(pattern.to_string()))?;
                literal(&mut state, &mut prefix, &mut suffix, next.encode_utf8(&mut [0; 4]));
            }
            '_' => {
                chars
                    .next()
                    .ok_or_else(|| FormatError::Render(pattern.to_string()))?;
                literal(&mut state, &mut prefix, &mut suffix, " ");
            }
            '*' => {
                chars
                    .next()
                    .ok_or_else(|| FormatError::Render(pattern.to_string()))?;
            }
            '[' => {
                // Colors and conditions carry no text, but must be closed
                if !chars.by_ref().any(|q| q == ']') {
                    return Err(FormatError::Render(pattern.to_string()));
                }
            }
            '0' | '#' | '?' | '.' | ',' if state != State::Suffix => {
                core.push(c);
                state = State::Core;
            }
            'E' | 'e' | '/' if state == State::Core => {
                return Err(FormatError::Render(pattern.to_string()));
            }
            '%' => {
                percent = true;
                literal(&mut state, &mut prefix, &mut suffix, "%");
            }
            other => literal(&mut state, &mut prefix, &mut suffix, other.encode_utf8(&mut [0; 4])),
        }
    }

    if !core.contains(|c| matches!(c, '0' | '#' | '?')) {
        if !literal_only_ok {
            return Err(FormatError::NoDigitPlaceholder(pattern.to_string()));
        }
        core.clear();
    }

    let mut parts = core.splitn(3, '.');
    let int_part = parts.next().unwrap_or_default();
    let frac_part = parts.next();
    if parts.next().is_some() {
        return Err(FormatError::Render(pattern.to_string()));
    }

    let trimmed = int_part.trim_end_matches(',');
    let scale_thousands = if frac_part.is_none() {
        (int_part.len() - trimmed.len()) as u32
    } else {
        0
    };
    let frac_part = frac_part.unwrap_or_default();

    Ok(Section {
        prefix,
        suffix,
        min_int: trimmed.chars().filter(|&c| c == '0').count(),
        grouping: trimmed.contains(','),
        scale_thousands,
        min_frac: frac_part.chars().filter(|&c| c == '0').count(),
        max_frac: frac_part
            .chars()
            .filter(|&c| matches!(c, '0' | '#' | '?'))
            .count(),
        percent,
    })
}

impl Section {
    fn format(&self, value: f64) -> String {
        let mut v = value;
        if self.percent {
            v *= 100.0;
        }
        for _ in 0..self.scale_thousands {
            v /= 1000.0;
        }

        // Half away from zero, as spreadsheets round.
        let factor = 10f64.powi(self.max_frac as i32);
        let rounded = format!("{:.*}", self.max_frac, (v.abs() * factor).round() / factor);
        let (int_digits, frac_digits) = match rounded.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rounded.as_str(), ""),
        };

        let mut frac = frac_digits.to_string();
        while frac.len() > self.min_frac && frac.ends_with('0') {
            frac.pop();
        }

        let mut int = if int_digits == "0" && self.min_int == 0 {
            String::new()
        } else {
            int_digits.to_string()
        };
        while int.len() < self.min_int {
            int.insert(0, '0');
        }
        if self.grouping {
            int = group_thousands(&int);
        }

        let is_zero = int_digits.bytes().all(|b| b == b'0') && frac_digits.bytes().all(|b| b == b'0');
        let mut out = String::with_capacity(self.prefix.len() + int.len() + frac.len() + 4);
        if v < 0.0 && !is_zero {
            out.push('-');
        }
        out.push_str(&self.prefix);
        out.push_str(&int);
        if !frac.is_empty() {
            out.push('.');
            out.push_str(&frac);
        }
        out.push_str(&self.suffix);
        out
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
