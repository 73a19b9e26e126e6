//! Built-in transformers.
//!
//! All of them are registered by [`TransformRegistry::with_contrib`] under
//! `contrib.transformers.<name>`:
//!
//! | name                   | params                                   |
//! |------------------------|------------------------------------------|
//! | `trim_string`          | `strip` (default `" "`)                  |
//! | `convert_case`         | `case`: `upper` (default) or `lower`     |
//! | `normalize_email`      |                                          |
//! | `decode_html_entities` |                                          |
//! | `pad_string`           | `length`, `pad_char`, `align`            |
//! | `iso_date_parser`      |                                          |
//! | `anydate_parser`       | `dayfirst`, `yearfirst`                  |
//! | `anydatetime_parser`   | `dayfirst`, `yearfirst`                  |
//! | `from_unixtime`        | `silent`                                 |
//!
//! Parameters may be given as strings or as native YAML/JSON values.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::transform_registry::{TransformError, TransformParams, TransformRegistry};

/// Name prefix of every built-in transformer.
pub const CONTRIB_PREFIX: &str = "contrib.transformers.";

type Builtin = fn(&[String], &TransformParams) -> Result<Vec<String>, TransformError>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("trim_string", trim_string),
    ("convert_case", convert_case),
    ("normalize_email", normalize_email),
    ("decode_html_entities", decode_html_entities),
    ("pad_string", pad_string),
    ("iso_date_parser", iso_date_parser),
    ("anydate_parser", anydate_parser),
    ("anydatetime_parser", anydatetime_parser),
    ("from_unixtime", from_unixtime),
];

/// Register every built-in transformer into `registry`.
pub fn register_all(registry: &mut TransformRegistry) {
    for (name, func) in BUILTINS {
        registry.register(format!("{}{}", CONTRIB_PREFIX, name), Box::new(*func));
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-z._+-]+@[0-9a-z._+-]+\.[0-9a-z._+-]{2,}$").expect("valid email regex")
});

static EMAIL_NAME_JUNK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.|\+.+$)").expect("valid email name regex"));

static TIME_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:T|\s+)(\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?$").expect("valid time regex")
});

static DATE_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s./,-]+").expect("valid date separator regex"));

/// Strip any of the `strip` characters from both ends of each value
pub fn trim_string(
    values: &[String],
    params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    let strip = param_string(params, "strip").unwrap_or_else(|| " ".to_string());

    Ok(values
        .iter()
        .map(|v| v.trim_matches(|c: char| strip.contains(c)).to_string())
        .collect())
}

/// Convert each value to upper or lower case
pub fn convert_case(
    values: &[String],
    params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    let case = param_string(params, "case").unwrap_or_else(|| "upper".to_string());

    match case.as_str() {
        "upper" => Ok(values.iter().map(|v| v.to_uppercase()).collect()),
        "lower" => Ok(values.iter().map(|v| v.to_lowercase()).collect()),
        other => Err(TransformError::InvalidArgs(format!(
            "invalid case '{}', expecting 'upper' or 'lower'",
            other
        ))),
    }
}

/// Strip dot and plus syntax from the user name of email-shaped values
///
/// `foo.bar@gmail.com` becomes `foobar@gmail.com` and `foo+bar@gmail.com`
/// becomes `foo@gmail.com`. Anything that is not an email is left alone.
pub fn normalize_email(
    values: &[String],
    _params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    Ok(values.iter().map(|v| normalize_one_email(v)).collect())
}

fn normalize_one_email(value: &str) -> String {
    if !EMAIL_RE.is_match(value) {
        return value.to_string();
    }

    match value.split_once('@') {
        Some((name, domain)) => {
            let name = EMAIL_NAME_JUNK_RE.replace_all(name, "");
            format!("{}@{}", name, domain).to_lowercase()
        }
        None => value.to_string(),
    }
}

/// Decode named and numeric HTML character references
///
/// Covers the whole HTML5 named set; unknown references are left as they are.
pub fn decode_html_entities(
    values: &[String],
    _params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    Ok(values
        .iter()
        .map(|v| html_escape::decode_html_entities(v).into_owned())
        .collect())
}

/// Pad each value to `length` characters with `pad_char`
pub fn pad_string(
    values: &[String],
    params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    let length = param_usize(params, "length")?
        .ok_or_else(|| TransformError::InvalidArgs("missing 'length'".to_string()))?;
    let pad_char = match param_string(params, "pad_char") {
        None => ' ',
        Some(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(TransformError::InvalidArgs(format!(
                        "pad_char must be a single character, got '{}'",
                        s
                    )))
                }
            }
        }
    };
    let align = param_string(params, "align").unwrap_or_else(|| "left".to_string());
    if align != "left" && align != "right" {
        return Err(TransformError::InvalidArgs(format!(
            "invalid align '{}', expecting 'left' or 'right'",
            align
        )));
    }

    Ok(values
        .iter()
        .map(|v| {
            let missing = length.saturating_sub(v.chars().count());
            let padding: String = std::iter::repeat(pad_char).take(missing).collect();
            if align == "left" {
                format!("{}{}", v, padding)
            } else {
                format!("{}{}", padding, v)
            }
        })
        .collect())
}

/// Turn `DD.MM.YYYY` shaped values into `YYYY-MM-DD`
///
/// There is no validation of the digits; parts that are not all digits are
/// replaced by `-`.
pub fn iso_date_parser(
    values: &[String],
    _params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    Ok(values
        .iter()
        .map(|v| {
            v.split('.')
                .rev()
                .map(|part| {
                    if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
                        part
                    } else {
                        "-"
                    }
                })
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect())
}

/// Parse numeric dates in any common order into `YYYY-MM-DD`
///
/// Ambiguous three-part dates are read month first unless `dayfirst` or
/// `yearfirst` is set; a four digit part is always the year.
pub fn anydate_parser(
    values: &[String],
    params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    let dayfirst = param_bool(params, "dayfirst", false)?;
    let yearfirst = param_bool(params, "yearfirst", false)?;

    values
        .iter()
        .map(|v| {
            parse_any_date(v, dayfirst, yearfirst)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .ok_or_else(|| {
                    TransformError::ExecutionError(format!("unable to parse date '{}'", v))
                })
        })
        .collect()
}

fn parse_any_date(value: &str, dayfirst: bool, yearfirst: bool) -> Option<NaiveDate> {
    let value = value.trim();
    if let Some(prefix) = value.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    let parts: Vec<&str> = DATE_SEPARATOR_RE
        .split(value)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 || !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    let nums: Vec<u32> = parts.iter().map(|p| p.parse().ok()).collect::<Option<_>>()?;

    let (year, mut month, mut day) = if parts[0].len() == 4 {
        if dayfirst {
            (nums[0], nums[2], nums[1])
        } else {
            (nums[0], nums[1], nums[2])
        }
    } else if parts[2].len() == 4 || !yearfirst {
        if dayfirst {
            (nums[2], nums[1], nums[0])
        } else {
            (nums[2], nums[0], nums[1])
        }
    } else if dayfirst {
        (nums[0], nums[2], nums[1])
    } else {
        (nums[0], nums[1], nums[2])
    };

    if month > 12 && day <= 12 {
        std::mem::swap(&mut month, &mut day);
    }

    NaiveDate::from_ymd_opt(expand_year(year) as i32, month, day)
}

/// Parse a numeric date with an optional trailing time into `YYYY-MM-DD HH:MM:SS`
///
/// The date part follows the same rules as `anydate_parser`. A missing time
/// is midnight; fractional seconds are dropped.
pub fn anydatetime_parser(
    values: &[String],
    params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    let dayfirst = param_bool(params, "dayfirst", false)?;
    let yearfirst = param_bool(params, "yearfirst", false)?;

    values
        .iter()
        .map(|v| {
            parse_any_datetime(v, dayfirst, yearfirst)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .ok_or_else(|| {
                    TransformError::ExecutionError(format!("unable to parse datetime '{}'", v))
                })
        })
        .collect()
}

fn parse_any_datetime(value: &str, dayfirst: bool, yearfirst: bool) -> Option<NaiveDateTime> {
    let value = value.trim();

    let (date_part, time) = match TIME_SUFFIX_RE.captures(value) {
        Some(caps) => {
            let number = |i: usize| caps.get(i).map_or(Some(0), |m| m.as_str().parse::<u32>().ok());
            let time = NaiveTime::from_hms_opt(number(1)?, number(2)?, number(3)?)?;
            (&value[..caps.get(0)?.start()], time)
        }
        None => (value, NaiveTime::from_hms_opt(0, 0, 0)?),
    };

    parse_any_date(date_part, dayfirst, yearfirst).map(|date| date.and_time(time))
}

/// Two digit years land within fifty years of the current year
fn expand_year(year: u32) -> u32 {
    if year >= 100 {
        return year;
    }
    let current = Utc::now().year() as u32;
    let century = current - current % 100;
    let mut full = century + year;
    if full >= current + 50 {
        full -= 100;
    } else if full < current.saturating_sub(50) {
        full += 100;
    }
    full
}

/// Convert unix timestamps (seconds) to `YYYY-MM-DD HH:MM:SS` in UTC
///
/// With `silent` set, values that are not timestamps are dropped instead of
/// failing the transform.
pub fn from_unixtime(
    values: &[String],
    params: &TransformParams,
) -> Result<Vec<String>, TransformError> {
    let silent = param_bool(params, "silent", false)?;
    let mut result = Vec::with_capacity(values.len());

    for value in values {
        let parsed = value
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        match parsed {
            Some(dt) => result.push(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None if silent => {}
            None => {
                return Err(TransformError::ExecutionError(format!(
                    "invalid unix timestamp '{}'",
                    value
                )))
            }
        }
    }

    Ok(result)
}

fn param_string(params: &TransformParams, name: &str) -> Option<String> {
    match params.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn param_usize(params: &TransformParams, name: &str) -> Result<Option<usize>, TransformError> {
    let Some(value) = params.get(name) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| TransformError::InvalidArgs(format!("'{}' must be a non-negative integer", name)))
}

fn param_bool(params: &TransformParams, name: &str, default: bool) -> Result<bool, TransformError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(TransformError::InvalidArgs(format!("'{}' must be a boolean", name))),
        },
        Some(_) => Err(TransformError::InvalidArgs(format!("'{}' must be a boolean", name))),
    }
}
