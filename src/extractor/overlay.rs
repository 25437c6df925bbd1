//! Classifying and parsing the seller-details overlay

use once_cell::sync::Lazy;
use regex::Regex;

/// Legal-entity forms as standalone words
static LEGAL_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ООО|ИП|АО|ЗАО|ПАО|ОАО|LTD|LLC|INC)\b").expect("Invalid legal form regex")
});

static LABELLED_TAX_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:ИНН|INN)\D{0,5}(\d{10,15})").expect("Invalid labelled tax id regex")
});

static BARE_TAX_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{10,15})\b").expect("Invalid tax id regex"));

const SCHEDULE_LABEL: &str = "режим работы";

/// Company identity read from an overlay
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompanyDetails {
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
}

/// Whether overlay text describes the seller's company
///
/// Any one of: a legal-entity form, ten or more digits in total, or the
/// opening-hours label.
#[must_use]
pub fn is_company_overlay(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < 5 {
        return false;
    }
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    LEGAL_FORM.is_match(trimmed) || digits >= 10 || trimmed.to_lowercase().contains(SCHEDULE_LABEL)
}

/// Company name and tax ID from overlay text
///
/// The name is the first line carrying a legal form, else the first line that
/// is neither numeric nor the opening-hours line. The tax ID prefers an
/// `ИНН`/`INN`-labelled number and falls back to the first 10-15 digit run.
#[must_use]
pub fn parse_company_overlay(text: &str) -> CompanyDetails {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let company_name = lines
        .iter()
        .find(|l| LEGAL_FORM.is_match(l))
        .or_else(|| {
            lines.iter().find(|l| {
                l.chars().count() > 3
                    && !is_numeric_line(l)
                    && !l.to_lowercase().starts_with(SCHEDULE_LABEL)
            })
        })
        .map(|l| strip_wrapping_quotes(l).to_string())
        .filter(|l| !l.is_empty());

    let tax_id = LABELLED_TAX_ID
        .captures(text)
        .or_else(|| BARE_TAX_ID.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    CompanyDetails {
        company_name,
        tax_id,
    }
}

fn strip_wrapping_quotes(line: &str) -> &str {
    line.strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
        .map_or(line, str::trim)
}

fn is_numeric_line(line: &str) -> bool {
    line.chars().all(|c| c.is_ascii_digit() || c.is_whitespace())
}
