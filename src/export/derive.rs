//! Composite values shared by the field tables: case identifiers, trigger
//! narratives and the claimed-quarter summaries.

use crate::error::GeneratorError;
use crate::models::{qualifying_quarters, quarters_of, CanonicalRecord, Question, QuarterKey, QUESTION_YEARS};
use crate::types::format_plain_number;

/// Headcount above which an employer counts as large, per credit year.
const LARGE_EMPLOYER_2020: u32 = 100;
const LARGE_EMPLOYER_2021: u32 = 500;

fn is_legal_form_token(token: &str) -> bool {
    matches!(
        token.to_lowercase().as_str(),
        "inc" | "llc" | "corp" | "ltd" | "lp" | "llp" | "pllc" | "pc" | "co"
    )
}

/// Up to three upper-case letters derived from a company name.
pub fn company_initials(name: &str) -> Option<String> {
    let words: Vec<String> = name
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty() && !is_legal_form_token(w))
        .collect();
    let first = words.first()?;

    let is_acronym = first.chars().count() >= 2 && first.chars().all(|c| c.is_uppercase() || c.is_ascii_digit());
    let mut initials: String = if is_acronym || words.len() == 1 {
        first.chars().take(3).collect()
    } else {
        words.iter().take(3).filter_map(|w| w.chars().next()).collect()
    };
    initials = initials.to_uppercase();
    if initials.chars().count() == 1 {
        initials.push('X');
    }
    Some(initials)
}

pub fn tax_id_digits(tax_id: &str) -> String {
    tax_id.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `SC123456789001`
pub fn case_id(record: &CanonicalRecord, suffix: &str) -> Result<String, GeneratorError> {
    let initials =
        company_initials(&record.company_info.company_name).ok_or(GeneratorError::MissingInput("company name"))?;
    let digits = tax_id_digits(&record.company_info.tax_id);
    if digits.is_empty() {
        return Err(GeneratorError::MissingInput("tax id"));
    }
    Ok(format!("{initials}{digits}{suffix}"))
}

/// Quarters where a supply, vendor or government-order trigger is set.
pub fn affected_quarters(record: &CanonicalRecord) -> Vec<QuarterKey> {
    qualifying_quarters()
        .into_iter()
        .filter(|key| {
            record.qualifying_questions.get(*key).is_some_and(|t| {
                t.supply_disruption || t.vendor_disruption || t.government_shutdown
            })
        })
        .collect()
}

pub fn join_quarters(keys: &[QuarterKey]) -> String {
    keys.iter().map(QuarterKey::label).collect::<Vec<_>>().join(",")
}

/// `FS|2020Q2,2020Q3|<sentence>;SC|...` for every active standard.
pub fn trigger_narrative(record: &CanonicalRecord) -> String {
    let quarters = join_quarters(&affected_quarters(record));
    record
        .operational_triggers
        .active()
        .map(|s| format!("{}|{}|{}", s.code(), quarters, s.sentence()))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn is_claimed(record: &CanonicalRecord, key: QuarterKey) -> bool {
    record.qualifying_questions.get(key).is_some_and(|t| {
        t.government_shutdown || t.supply_disruption || t.get(Question::revenue_threshold_for(key.year))
    })
}

/// The trigger that makes a quarter eligible, for qualification columns.
pub fn qualification_label(record: &CanonicalRecord, key: QuarterKey) -> &'static str {
    let Some(t) = record.qualifying_questions.get(key) else {
        return "";
    };
    if t.government_shutdown {
        "Government Order"
    } else if t.supply_disruption {
        "Supply Chain"
    } else if t.get(Question::revenue_threshold_for(key.year)) {
        "Revenue Reduction"
    } else {
        ""
    }
}

pub fn claimed_quarters(record: &CanonicalRecord) -> Vec<QuarterKey> {
    quarters_of(&QUESTION_YEARS)
        .into_iter()
        .filter(|key| is_claimed(record, *key))
        .collect()
}

/// Credit wages of each claimed quarter.
pub fn claim_amounts(record: &CanonicalRecord) -> Vec<(QuarterKey, f64)> {
    claimed_quarters(record)
        .into_iter()
        .map(|key| {
            let wages = record
                .credit_wages_by_quarter
                .get(key)
                .map(|c| c.credit_wages)
                .unwrap_or(0.0);
            (key, wages)
        })
        .collect()
}

pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// `2020Q2:50000.00,2020Q3:45000.00`
pub fn compound_amounts(amounts: &[(QuarterKey, f64)]) -> String {
    amounts
        .iter()
        .map(|(key, amount)| format!("{}:{}", key.label(), format_amount(*amount)))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn total_claim(amounts: &[(QuarterKey, f64)]) -> f64 {
    amounts.iter().map(|(_, a)| a).sum()
}

fn format_percentage(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format_plain_number(pct)
    } else {
        format!("{pct:.2}")
    }
}

pub fn owner_names(record: &CanonicalRecord) -> String {
    record
        .ownership
        .iter()
        .map(|o| o.name.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn ownership_percentages(record: &CanonicalRecord) -> String {
    record
        .ownership
        .iter()
        .map(|o| format_percentage(o.percentage))
        .collect::<Vec<_>>()
        .join("; ")
}

/// `Jane Doe (60%); John Roe (40%)`
pub fn ownership_summary(record: &CanonicalRecord) -> String {
    record
        .ownership
        .iter()
        .map(|o| format!("{} ({}%)", o.name, format_percentage(o.percentage)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// `Yes`/`No` against the 2019 headcount.
pub fn large_employer(record: &CanonicalRecord, year: u16) -> Result<String, GeneratorError> {
    let limit = match year {
        2020 => LARGE_EMPLOYER_2020,
        2021 => LARGE_EMPLOYER_2021,
        other => return Err(GeneratorError::OutOfRange(format!("no large-employer rule for {other}"))),
    };
    Ok(yes_no(record.company_info.headcount.y2019 > limit))
}

pub fn yes_no(flag: bool) -> String {
    let s = if flag { "Yes" } else { "No" };
    s.to_string()
}

/// Zero renders as blank so unknown values stay visibly empty.
pub fn number_or_blank(n: f64) -> String {
    if n == 0.0 {
        String::new()
    } else {
        format_plain_number(n)
    }
}
