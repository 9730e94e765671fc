//! Legacy `ilwd:char` identifiers
//!
//! Older LIGO_LW documents tag row identifiers as strings of the form
//! `"<table>:<column>:<integer>"`; modern documents store the bare integer.
//! Both decode to the same `i64`.

use serde::{Deserialize, Serialize};

/// How the `<table>:<column>` prefix of a legacy identifier is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IlwdPolicy {
    /// Prefix must name the owning table and column exactly
    #[default]
    Strict,
    /// Only the integer after the last `:` is used
    SuffixOnly,
}

/// Table and column an identifier value belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Owner<'a> {
    pub table: &'a str,
    pub column: &'a str,
}

/// Decodes a legacy or modern identifier.
///
/// Without an owner (document params) the prefix is never checked.
pub fn parse_identifier(
    text: &str,
    owner: Option<Owner<'_>>,
    policy: IlwdPolicy,
) -> Result<i64, String> {
    if let Ok(id) = text.parse::<i64>() {
        return Ok(id);
    }

    let (prefix, suffix) = text
        .rsplit_once(':')
        .ok_or_else(|| "expected an integer or <table>:<column>:<integer>".to_string())?;

    let id = suffix
        .parse::<i64>()
        .map_err(|e| format!("identifier suffix '{}': {}", suffix, e))?;

    let owner = match (owner, policy) {
        (Some(owner), IlwdPolicy::Strict) => owner,
        _ => return Ok(id),
    };

    let (table, column) = prefix
        .split_once(':')
        .filter(|(_, column)| !column.contains(':'))
        .ok_or_else(|| "expected <table>:<column>:<integer>".to_string())?;

    if table != owner.table || column != owner.column {
        return Err(format!(
            "identifier prefix '{}' does not match owning column '{}:{}'",
            prefix, owner.table, owner.column
        ));
    }

    Ok(id)
}

/// Legacy text form of an identifier.
pub fn format_identifier(owner: Owner<'_>, id: i64) -> String {
    format!("{}:{}:{}", owner.table, owner.column, id)
}
