//! Structured-comment hint parser
//!
//! A small mini-language embedded in doc strings. Scanning starts at the
//! `@var` marker; each following line may carry one annotation of the
//! form `name`, `name(scalar)`, `name(key = value, ...)`, or
//! `name scalar`. Scalars: numbers (integral floats collapse to
//! integers), `true`/`false`, quoted strings, `[v, v]` lists, and bare
//! strings. A bare annotation with no argument parses as `true`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;

// No whitespace between the name and the argument list: a space hands
// the rest of the line to the trailing bare-scalar group instead.
static ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w:]+)(?:\(([^)]*)\))?(?:[ \t]+(\S.*))?").expect("annotation regex")
});

static PARAMETER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*=\s*("[^"]*"|'[^']*'|\[[^\]]*\]|[^,)]+)"#).expect("parameter regex")
});

/// Extract `(name, value)` hints from a doc string, in order.
///
/// Without a `@var` marker the doc carries no hints.
pub fn parse_hints(doc: &str) -> Vec<(String, Json)> {
    let Some(marker) = doc.find("@var") else {
        return Vec::new();
    };

    let mut hints = Vec::new();
    for line in doc[marker + "@var".len()..].lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = ANNOTATION_RE.captures(line) else {
            continue;
        };
        let name = caps[1].to_string();
        let value = if let Some(args) = caps.get(2) {
            parse_args(args.as_str())
        } else if let Some(rest) = caps.get(3) {
            parse_scalar(rest.as_str())
        } else {
            Json::Bool(true)
        };
        hints.push((name, value));
    }
    hints
}

fn parse_args(args: &str) -> Json {
    let pairs: Vec<(String, Json)> = PARAMETER_RE
        .captures_iter(args)
        .map(|caps| (caps[1].to_string(), parse_scalar(&caps[2])))
        .collect();
    if !pairs.is_empty() {
        return Json::Object(pairs.into_iter().collect());
    }

    let args = args.trim();
    if args.is_empty() {
        Json::Bool(true)
    } else {
        parse_scalar(args)
    }
}

/// Scalar grammar shared by argument lists and bare values.
pub fn parse_scalar(raw: &str) -> Json {
    let raw = raw.trim();

    if raw.starts_with('[') && raw.ends_with(']') {
        let inner = &raw[1..raw.len() - 1];
        let items = inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(parse_scalar)
            .collect();
        return Json::Array(items);
    }

    if (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
        || (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
    {
        return Json::String(raw[1..raw.len() - 1].to_string());
    }

    if raw.eq_ignore_ascii_case("true") {
        return Json::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Json::Bool(false);
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Json::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        // Integral floats collapse to integers.
        if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
            return Json::from(float as i64);
        }
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Json::Number(number);
        }
    }

    Json::String(raw.to_string())
}
