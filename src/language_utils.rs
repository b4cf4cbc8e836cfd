use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Language utilities for ISO language code handling
///
/// Detected codes come back from a language model as free-form text, the
/// speech endpoint expects ISO 639-1 codes and Tesseract expects ISO 639-3
/// names. These helpers move between the three.
/// Language code type
#[derive(Debug, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

static CODE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[a-z]{2,3}(?:[-_][a-z]{2,4})?\b").expect("static regex is valid")
});

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminology(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = bibliographic_to_terminology(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or(part2t))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Language name for user-facing messages, falling back to the raw code
pub fn describe_language(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// Reduce a free-form model answer to a bare language code
///
/// Looks at whole code-shaped words only, so `"Spanish (es)"` and
/// `"The language is: es"` both become `es`. The last ISO 639-1 word wins,
/// then the last three-letter code that maps to one (`spa` becomes `es`).
/// When nothing is a known code the first code-shaped word is returned as is,
/// and `None` when there is no such word at all.
pub fn sanitize_detected_code(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let words: Vec<&str> = CODE_TOKEN
        .find_iter(&lowered)
        .map(|m| primary_subtag(m.as_str()))
        .collect();

    let part1 = words
        .iter()
        .rev()
        .find(|w| matches!(validate_language_code(w), Ok(LanguageCodeType::Part1)));
    if let Some(code) = part1 {
        return Some(code.to_string());
    }

    words
        .iter()
        .rev()
        .find_map(|w| normalize_to_part1_or_part2t(w).ok())
        .or_else(|| words.first().map(|w| w.to_string()))
}

fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

/// Check whether a detected code is in a supported list
///
/// Case and spacing are ignored, and ISO 639-1/639-2 spellings of the same
/// language match each other.
pub fn is_supported(code: &str, supported: &[String]) -> bool {
    let code = code.trim().to_lowercase();
    supported
        .iter()
        .any(|s| s.trim().eq_ignore_ascii_case(&code) || language_codes_match(s, &code))
}

/// Build the `+`-joined language argument Tesseract expects (`spa+eng`)
pub fn tesseract_languages(codes: &[String]) -> Result<String> {
    let names = codes
        .iter()
        .map(|c| normalize_to_part2t(c))
        .collect::<Result<Vec<_>>>()?;

    if names.is_empty() {
        return Err(anyhow!("At least one OCR language is required"));
    }

    Ok(names.join("+"))
}
