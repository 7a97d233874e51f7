use crate::host::HostError;

/// Errors raised while loading or writing the bound field
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    /// The configuration names no field to bind to
    MissingFieldReference,
    /// The configured order could not be read; the load carries on without it
    Configuration(HostError),
    /// The allowed values of the bound field could not be fetched
    AllowedValues(HostError),
    /// The current value of the bound field could not be read
    FieldValue(HostError),
    /// Writing a selection back to the bound field failed
    FieldWrite(HostError),
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::MissingFieldReference => {
                write!(f, "No field reference configured")
            }
            ControlError::Configuration(e) => {
                write!(f, "Could not read configured values: {}", e)
            }
            ControlError::AllowedValues(e) => write!(f, "Could not fetch allowed values: {}", e),
            ControlError::FieldValue(e) => write!(f, "Could not read field value: {}", e),
            ControlError::FieldWrite(e) => write!(f, "Could not write field value: {}", e),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::MissingFieldReference => None,
            ControlError::Configuration(e)
            | ControlError::AllowedValues(e)
            | ControlError::FieldValue(e)
            | ControlError::FieldWrite(e) => Some(e),
        }
    }
}
