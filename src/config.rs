/// Control configuration as the host hands it over
///
/// The host passes the control a `witInputs` mapping with two entries: the
/// reference name of the bound field (`FieldName`) and a semicolon-delimited
/// list of values in their preferred display order (`Values`).
use crate::host::{ConfigurationSource, HostError};
use crate::span::{Span, Spanned};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input key holding the bound field reference
pub const FIELD_NAME_INPUT: &str = "FieldName";

/// Input key holding the configured display order
pub const VALUES_INPUT: &str = "Values";

/// Configuration of one control instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Reference name of the bound field, e.g. `Microsoft.VSTS.Common.Priority`
    #[serde(rename = "FieldName")]
    pub field_reference: String,

    /// Raw semicolon-delimited configured order
    #[serde(rename = "Values", default)]
    pub values: String,
}

impl ControlConfig {
    pub fn new(field_reference: impl Into<String>, values: impl Into<String>) -> Self {
        ControlConfig {
            field_reference: field_reference.into(),
            values: values.into(),
        }
    }

    /// The configured display order, parsed from [`ControlConfig::values`]
    pub fn configured_order(&self) -> Vec<String> {
        parse_configured_values(&self.values)
    }
}

impl ConfigurationSource for ControlConfig {
    fn field_reference(&self) -> Result<String, HostError> {
        if self.field_reference.trim().is_empty() {
            return Err(HostError::NotAvailable(FIELD_NAME_INPUT.to_string()));
        }
        Ok(self.field_reference.clone())
    }

    fn configured_values(&self) -> Result<String, HostError> {
        Ok(self.values.clone())
    }
}

/// The raw `witInputs` mapping, as delivered by the host
impl ConfigurationSource for HashMap<String, String> {
    fn field_reference(&self) -> Result<String, HostError> {
        self.get(FIELD_NAME_INPUT)
            .filter(|field| !field.trim().is_empty())
            .cloned()
            .ok_or_else(|| HostError::NotAvailable(FIELD_NAME_INPUT.to_string()))
    }

    /// A missing `Values` input is an empty configured order
    fn configured_values(&self) -> Result<String, HostError> {
        Ok(self.get(VALUES_INPUT).cloned().unwrap_or_default())
    }
}

/// Split a configuration string into its trimmed, non-empty entries
///
/// # Example
/// ```
/// use ordered_dropdown::config::parse_configured_values;
///
/// let order = parse_configured_values(" High ;; Low;");
/// assert_eq!(order, ["High", "Low"]);
/// ```
pub fn parse_configured_values(raw: &str) -> Vec<String> {
    parse_configured_values_spanned(raw)
        .into_iter()
        .map(|entry| entry.value)
        .collect()
}

/// Like [`parse_configured_values`], keeping the byte span of each entry
pub fn parse_configured_values_spanned(raw: &str) -> Vec<Spanned<String>> {
    let mut entries = Vec::new();
    let mut offset = 0;

    for segment in raw.split(';') {
        let trimmed = segment.trim();
        if !trimmed.is_empty() {
            let start = offset + (segment.len() - segment.trim_start().len());
            entries.push(Spanned::new(
                trimmed.to_string(),
                Span::new(start, start + trimmed.len()),
            ));
        }
        offset += segment.len() + 1;
    }

    entries
}

/// A configured entry that will not show up where the administrator put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// The field does not allow this value, so it is dropped from the list
    NotAllowed { value: String, span: Span },
    /// The value was already listed earlier; only the first position counts
    Duplicate {
        value: String,
        span: Span,
        first: Span,
    },
}

impl ConfigIssue {
    pub fn span(&self) -> Span {
        match self {
            ConfigIssue::NotAllowed { span, .. } => *span,
            ConfigIssue::Duplicate { span, .. } => *span,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ConfigIssue::NotAllowed { value, .. } => value,
            ConfigIssue::Duplicate { value, .. } => value,
        }
    }
}

/// Find configured entries that reconciliation will drop or ignore
pub fn lint_configuration<S: AsRef<str>>(raw: &str, allowed: &[S]) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let mut first_seen: HashMap<String, Span> = HashMap::new();

    for entry in parse_configured_values_spanned(raw) {
        if let Some(first) = first_seen.get(&entry.value) {
            issues.push(ConfigIssue::Duplicate {
                value: entry.value,
                span: entry.span,
                first: *first,
            });
            continue;
        }
        first_seen.insert(entry.value.clone(), entry.span);

        if !allowed.iter().any(|value| value.as_ref() == entry.value) {
            issues.push(ConfigIssue::NotAllowed {
                value: entry.value,
                span: entry.span,
            });
        }
    }

    issues
}
