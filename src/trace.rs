/// Record of what a controller did, for debugging and visualizing sync behavior
use serde::{Deserialize, Serialize};

/// Something the controller did or decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A load cycle began; the control shows nothing until it commits
    CycleStarted,

    /// The configured order could not be read; the cycle continues without it
    ConfigurationUnavailable { error: String },

    /// The cycle applied its list and selection
    CycleCommitted {
        items: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        selection: Option<String>,
    },

    /// A newer cycle started while this one was waiting on the host
    CycleSuperseded,

    /// The cycle gave up; the control stays loading
    CycleFailed { error: String },

    /// A change notification for the bound field was applied
    FieldChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    /// A change notification did not touch the bound field
    FieldChangeIgnored,

    /// A user selection was written to the host
    WriteIssued { value: String },

    /// A user selection carried no value
    WriteSkipped,

    /// Writing a user selection failed
    WriteFailed { error: String },

    Expanded,

    Collapsed,
}

/// One trace step, tagged with the load generation current at the time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub generation: u64,
    #[serde(flatten)]
    pub event: SyncEvent,
}

/// Ordered list of trace entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncTrace {
    entries: Vec<TraceEntry>,
}

impl SyncTrace {
    pub fn new() -> Self {
        SyncTrace::default()
    }

    pub fn push(&mut self, generation: u64, event: SyncEvent) {
        self.entries.push(TraceEntry { generation, event });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &SyncEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
