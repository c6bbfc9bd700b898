//! Diffing a post's tag links against a submitted set of tag names.

use std::collections::HashSet;

use crate::error::ServiceError;
use crate::models::tag::Tag;

/// Link changes needed to make a post's tags match a submission.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagPlan {
    /// Tag ids whose links must be deleted.
    pub remove: Vec<i32>,
    /// Tag ids that need a new link.
    pub add: Vec<i32>,
}

impl TagPlan {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// Plans the link changes that turn `current` into the tags named by
/// `submitted`.
///
/// Names resolve against `known` by exact match. An unknown name fails the
/// whole plan, so callers can apply it knowing every id exists. Repeated
/// names count once.
pub fn reconcile(
    current: &[Tag],
    submitted: &[String],
    known: &[Tag],
) -> Result<TagPlan, ServiceError> {
    let mut seen = HashSet::new();
    let mut wanted = Vec::with_capacity(submitted.len());
    for name in submitted {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let tag = known
            .iter()
            .find(|t| t.name == *name)
            .ok_or_else(|| ServiceError::UnknownTag(name.clone()))?;
        wanted.push(tag.id);
    }

    let remove = current
        .iter()
        .filter(|t| !seen.contains(t.name.as_str()))
        .map(|t| t.id)
        .collect();
    let add = wanted
        .into_iter()
        .filter(|id| !current.iter().any(|t| t.id == *id))
        .collect();

    Ok(TagPlan { remove, add })
}
