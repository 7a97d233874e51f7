/// Merging the configured display order with the field's allowed values
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The ordered, duplicate-free list of values the dropdown offers
///
/// Built fresh by [`reconcile`] on every load and replaced wholesale; never
/// edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateList {
    items: Vec<String>,
}

impl CandidateList {
    pub fn new() -> Self {
        CandidateList { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.items.iter()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.position(value).is_some()
    }

    /// Row index of `value`, if the list offers it
    pub fn position(&self, value: &str) -> Option<usize> {
        self.items.iter().position(|item| item == value)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Order the allowed values according to the configuration
///
/// Configured values the field does not allow are dropped. Allowed values the
/// configuration does not mention follow the configured ones, in the order the
/// validation service returned them. The first occurrence of a value wins.
///
/// # Example
/// ```
/// use ordered_dropdown::reconcile;
///
/// let list = reconcile(&["Medium", "Low"], &["Low", "Medium", "High"]);
/// assert_eq!(list.as_slice(), ["Medium", "Low", "High"]);
/// ```
pub fn reconcile<S: AsRef<str>>(configured_order: &[S], allowed_set: &[S]) -> CandidateList {
    let allowed: HashSet<&str> = allowed_set.iter().map(AsRef::<str>::as_ref).collect();

    let mut seen = HashSet::new();
    let items = configured_order
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|value| allowed.contains(value))
        .chain(allowed_set.iter().map(AsRef::<str>::as_ref))
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect();

    CandidateList { items }
}
