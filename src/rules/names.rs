//! Case-insensitive name checks shared by tags and post titles.

use crate::error::ServiceError;

pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// What a rename request amounts to once compared with the stored name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rename {
    /// Same name modulo case; nothing to write.
    Unchanged,
    /// Different name; must still be checked against the other records.
    Changed,
}

pub fn classify_rename(current: &str, requested: &str) -> Rename {
    if same_name(current, requested) {
        Rename::Unchanged
    } else {
        Rename::Changed
    }
}

/// The submitted tag name without surrounding whitespace, which is what gets
/// stored and compared.
pub fn require_tag_name(name: &str) -> Result<&str, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("Please Enter a tag name".into()));
    }
    Ok(name)
}

pub fn duplicate_tag(name: &str) -> ServiceError {
    ServiceError::Validation(format!(
        "The tag \"{name}\" already exists, please create one with a different name"
    ))
}

pub fn duplicate_title() -> ServiceError {
    ServiceError::Validation(
        "This title has already been used, please select a different one".into(),
    )
}

pub fn tag_unchanged_notice(current: &str) -> String {
    format!("The tag \"{current}\" was re-entered, no changes were made to the tag")
}

pub fn title_unchanged_notice(current: &str) -> String {
    format!("The title \"{current}\" was re-entered, no changes were made to the title")
}

/// Whether `submitted` names the `stored` record again with only its case
/// changed, so an edit kept the stored name.
pub fn case_only_change(stored: &str, submitted: &str) -> bool {
    let submitted = submitted.trim();
    !submitted.is_empty() && submitted != stored && same_name(stored, submitted)
}

/// Fails with `duplicate` when any of `others` matches `candidate`.
pub fn ensure_unique<'a>(
    candidate: &str,
    others: impl IntoIterator<Item = &'a str>,
    duplicate: impl FnOnce() -> ServiceError,
) -> Result<(), ServiceError> {
    if others.into_iter().any(|other| same_name(candidate, other)) {
        return Err(duplicate());
    }
    Ok(())
}
