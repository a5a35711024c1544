//! Heuristic role selection over a [`ColumnProfile`].
//!
//! Header-name patterns pick the preferred column for each role; when nothing
//! matches, a positional fallback is used. Ties are always broken by column
//! order, never by the values themselves.

use regex::{Regex, RegexBuilder};

use crate::classify::ColumnProfile;
use crate::config::AnalysisConfig;

pub const AMOUNT_PATTERN: &str = "(amount|total|value|price|cost|balance|debit|credit)";
pub const DATE_PATTERN: &str = "(date|time|timestamp|created|posted)";
pub const CATEGORY_PATTERN: &str = "(vendor|merchant|payee|description|category|type|party)";
pub const SOURCE_PATTERN: &str = "(employee|approver|user|creator|source|person|agent)";
pub const INVOICE_PATTERN: &str = "(invoice|ref|id|document|trans|number|ticket)";

fn pattern(p: &str) -> Regex {
    RegexBuilder::new(p)
        .case_insensitive(true)
        .build()
        .expect("static role pattern")
}

fn first_match<'a>(columns: &'a [String], re: &Regex) -> Option<&'a String> {
    columns.iter().find(|c| re.is_match(c))
}

/// Propose a role configuration. `None` when there is no numeric column.
pub fn auto_select(profile: &ColumnProfile) -> Option<AnalysisConfig> {
    let amount = first_match(&profile.numeric, &pattern(AMOUNT_PATTERN))
        .or_else(|| profile.numeric.last())?
        .clone();

    let date = first_match(&profile.date, &pattern(DATE_PATTERN))
        .or_else(|| profile.date.first())
        .cloned();

    let is_taken = |c: &String| *c == amount || Some(c) == date.as_ref();

    let remaining_categories: Vec<String> =
        profile.category.iter().filter(|c| !is_taken(c)).cloned().collect();
    let category = first_match(&remaining_categories, &pattern(CATEGORY_PATTERN))
        .or_else(|| remaining_categories.first())
        .cloned();

    let source = first_match(&profile.category, &pattern(SOURCE_PATTERN))
        .filter(|s| Some(*s) != category.as_ref())
        .cloned();

    let remaining_identifiers: Vec<String> =
        profile.identifier.iter().filter(|c| !is_taken(c)).cloned().collect();
    let invoice = first_match(&remaining_identifiers, &pattern(INVOICE_PATTERN))
        .or_else(|| remaining_identifiers.first())
        .cloned();

    Some(AnalysisConfig {
        amount_column: amount,
        date_column: date,
        category_column: category,
        source_column: source,
        invoice_column: invoice,
    })
}
