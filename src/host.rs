/// Host collaborator traits and in-memory implementations
///
/// The control never talks to the host directly. Each host capability it needs
/// (configuration, the allowed values of a field, reading and writing the field,
/// change notifications, and resizing the hosting frame) sits behind a trait so
/// that the controller can run against a real host binding, or against the
/// in-memory implementations below when embedded or tested.
///
/// Everything here is single-threaded: the futures are not `Send` and shared
/// state lives in `Rc<RefCell<..>>`.
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Error types for host calls
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The host has no such service, input or field
    NotAvailable(String),
    /// The call reached the host but failed
    Failed(String),
    /// The host refused the value
    Rejected(String),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::NotAvailable(what) => write!(f, "Not available: {}", what),
            HostError::Failed(msg) => write!(f, "Host call failed: {}", msg),
            HostError::Rejected(msg) => write!(f, "Rejected by host: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

/// Where the control reads its own configuration from
pub trait ConfigurationSource {
    /// Reference name of the field this control is bound to
    fn field_reference(&self) -> Result<String, HostError>;

    /// The raw semicolon-delimited configured order
    fn configured_values(&self) -> Result<String, HostError>;
}

/// The host's view of which values a field currently permits
#[async_trait(?Send)]
pub trait FieldValidationService {
    async fn allowed_values(&self, field: &str) -> Result<Vec<String>, HostError>;
}

/// Reads and writes the value of a field on the open work item
#[async_trait(?Send)]
pub trait FieldValueService {
    /// Current value of the field; `None` when the field is empty
    async fn get_value(&self, field: &str) -> Result<Option<String>, HostError>;

    async fn set_value(&self, field: &str, value: &str) -> Result<(), HostError>;
}

/// Requested size of the frame hosting the control
///
/// A `None` dimension lets the host size the frame to its content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutHint {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl LayoutHint {
    /// Fit the frame to the rendered content
    pub fn auto() -> Self {
        LayoutHint::default()
    }

    /// Fixed height, content width
    pub fn height(height: u32) -> Self {
        LayoutHint {
            width: None,
            height: Some(height),
        }
    }
}

/// Accepts resize requests for the hosting frame
pub trait LayoutSink {
    fn resize(&self, hint: LayoutHint);
}

/// A field value as the host reports it
///
/// Integer and boolean fields, such as priority, arrive as JSON numbers and
/// booleans. The control compares and displays every value as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Number(number) => number.to_string(),
            FieldValue::Flag(flag) => flag.to_string(),
        }
    }
}

fn deserialize_changed_fields<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let fields = HashMap::<String, Option<FieldValue>>::deserialize(deserializer)?;
    Ok(fields
        .into_iter()
        .map(|(field, value)| (field, value.map(FieldValue::into_text)))
        .collect())
}

/// Payload of a field change notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChangedArgs {
    /// New value per changed field reference; `None` when the field was cleared
    #[serde(deserialize_with = "deserialize_changed_fields")]
    pub changed_fields: HashMap<String, Option<String>>,
}

impl FieldChangedArgs {
    pub fn new() -> Self {
        FieldChangedArgs::default()
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.changed_fields.insert(field.into(), Some(value.into()));
        self
    }

    pub fn with_cleared(mut self, field: impl Into<String>) -> Self {
        self.changed_fields.insert(field.into(), None);
        self
    }

    /// The new value of `field`, if this notification covers it
    pub fn get(&self, field: &str) -> Option<Option<&str>> {
        self.changed_fields.get(field).map(Option::as_deref)
    }
}

/// Callbacks the host invokes on a registered control
#[async_trait(?Send)]
pub trait ControlHandler {
    /// Some field on the work item changed
    fn on_field_changed(&self, args: &FieldChangedArgs);

    /// The work item form was reset
    async fn on_reset(&self);

    /// The work item was refreshed from the server
    async fn on_refreshed(&self);
}

/// Registers controls with the host under their contribution id
pub trait NotificationRegistry {
    fn register(&self, contribution_id: &str, handler: Rc<dyn ControlHandler>);
}

/// Everything a controller needs from its host
#[derive(Clone)]
pub struct HostServices {
    pub config: Rc<dyn ConfigurationSource>,
    pub validation: Rc<dyn FieldValidationService>,
    pub values: Rc<dyn FieldValueService>,
    pub layout: Rc<dyn LayoutSink>,
}

impl HostServices {
    pub fn new(
        config: Rc<dyn ConfigurationSource>,
        validation: Rc<dyn FieldValidationService>,
        values: Rc<dyn FieldValueService>,
        layout: Rc<dyn LayoutSink>,
    ) -> Self {
        HostServices {
            config,
            validation,
            values,
            layout,
        }
    }

    /// Wire a configuration source to an in-memory field store and layout
    ///
    /// # Example
    /// ```
    /// use ordered_dropdown::config::ControlConfig;
    /// use ordered_dropdown::host::{HostServices, InMemoryFieldStore, RecordingLayout};
    ///
    /// let store = InMemoryFieldStore::new();
    /// store.set_allowed_values("Custom.Size", ["S", "M", "L"]);
    /// let services = HostServices::in_memory(
    ///     ControlConfig::new("Custom.Size", "L;M"),
    ///     store,
    ///     RecordingLayout::new(),
    /// );
    /// ```
    pub fn in_memory(
        config: impl ConfigurationSource + 'static,
        store: InMemoryFieldStore,
        layout: RecordingLayout,
    ) -> Self {
        let store = Rc::new(store);
        HostServices {
            config: Rc::new(config),
            validation: store.clone(),
            values: store,
            layout: Rc::new(layout),
        }
    }
}

#[derive(Default)]
struct FieldStoreState {
    allowed: HashMap<String, Vec<String>>,
    values: HashMap<String, String>,
    writes: Vec<(String, String)>,
    allowed_calls: usize,
    get_calls: usize,
    fail_allowed: Option<HostError>,
    fail_get: Option<HostError>,
    fail_set: Option<HostError>,
}

/// In-memory work item fields
///
/// Holds the allowed values and the current value per field, records every
/// write, and can be told to fail any of its calls. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryFieldStore {
    state: Rc<RefCell<FieldStoreState>>,
}

impl InMemoryFieldStore {
    pub fn new() -> Self {
        InMemoryFieldStore::default()
    }

    /// Set the values the field allows, in the order the host reports them
    pub fn set_allowed_values<I, S>(&self, field: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.state.borrow_mut().allowed.insert(field.into(), values);
    }

    /// Set the stored value of a field without going through `set_value`
    pub fn insert_value(&self, field: impl Into<String>, value: impl Into<String>) {
        self.state
            .borrow_mut()
            .values
            .insert(field.into(), value.into());
    }

    pub fn value(&self, field: &str) -> Option<String> {
        self.state.borrow().values.get(field).cloned()
    }

    /// Every successful write, oldest first
    pub fn writes(&self) -> Vec<(String, String)> {
        self.state.borrow().writes.clone()
    }

    pub fn allowed_value_calls(&self) -> usize {
        self.state.borrow().allowed_calls
    }

    pub fn get_value_calls(&self) -> usize {
        self.state.borrow().get_calls
    }

    pub fn fail_allowed_values(&self, error: HostError) {
        self.state.borrow_mut().fail_allowed = Some(error);
    }

    pub fn fail_get_value(&self, error: HostError) {
        self.state.borrow_mut().fail_get = Some(error);
    }

    pub fn fail_set_value(&self, error: HostError) {
        self.state.borrow_mut().fail_set = Some(error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.fail_allowed = None;
        state.fail_get = None;
        state.fail_set = None;
    }
}

#[async_trait(?Send)]
impl FieldValidationService for InMemoryFieldStore {
    async fn allowed_values(&self, field: &str) -> Result<Vec<String>, HostError> {
        let mut state = self.state.borrow_mut();
        state.allowed_calls += 1;
        if let Some(error) = &state.fail_allowed {
            return Err(error.clone());
        }
        state
            .allowed
            .get(field)
            .cloned()
            .ok_or_else(|| HostError::NotAvailable(field.to_string()))
    }
}

#[async_trait(?Send)]
impl FieldValueService for InMemoryFieldStore {
    async fn get_value(&self, field: &str) -> Result<Option<String>, HostError> {
        let mut state = self.state.borrow_mut();
        state.get_calls += 1;
        if let Some(error) = &state.fail_get {
            return Err(error.clone());
        }
        Ok(state.values.get(field).cloned())
    }

    async fn set_value(&self, field: &str, value: &str) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = &state.fail_set {
            return Err(error.clone());
        }
        if let Some(allowed) = state.allowed.get(field) {
            if !allowed.iter().any(|candidate| candidate == value) {
                return Err(HostError::Rejected(format!(
                    "'{}' is not an allowed value for {}",
                    value, field
                )));
            }
        }
        state.values.insert(field.to_string(), value.to_string());
        state.writes.push((field.to_string(), value.to_string()));
        Ok(())
    }
}

/// Layout sink that remembers every resize request
#[derive(Clone, Default)]
pub struct RecordingLayout {
    hints: Rc<RefCell<Vec<LayoutHint>>>,
}

impl RecordingLayout {
    pub fn new() -> Self {
        RecordingLayout::default()
    }

    pub fn hints(&self) -> Vec<LayoutHint> {
        self.hints.borrow().clone()
    }

    pub fn last(&self) -> Option<LayoutHint> {
        self.hints.borrow().last().copied()
    }
}

impl LayoutSink for RecordingLayout {
    fn resize(&self, hint: LayoutHint) {
        self.hints.borrow_mut().push(hint);
    }
}

/// Registry that lets tests and embedders play the host's notifications
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    handlers: Rc<RefCell<Vec<(String, Rc<dyn ControlHandler>)>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        InMemoryRegistry::default()
    }

    /// Contribution ids in registration order
    pub fn contributions(&self) -> Vec<String> {
        self.handlers
            .borrow()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn handler(&self, contribution_id: &str) -> Option<Rc<dyn ControlHandler>> {
        self.handlers
            .borrow()
            .iter()
            .find(|(id, _)| id == contribution_id)
            .map(|(_, handler)| handler.clone())
    }

    pub fn notify_field_changed(&self, args: &FieldChangedArgs) {
        for handler in self.snapshot() {
            handler.on_field_changed(args);
        }
    }

    pub async fn reset(&self) {
        for handler in self.snapshot() {
            handler.on_reset().await;
        }
    }

    pub async fn refresh(&self) {
        for handler in self.snapshot() {
            handler.on_refreshed().await;
        }
    }

    // Handlers may register again while being notified
    fn snapshot(&self) -> Vec<Rc<dyn ControlHandler>> {
        self.handlers
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect()
    }
}

impl NotificationRegistry for InMemoryRegistry {
    fn register(&self, contribution_id: &str, handler: Rc<dyn ControlHandler>) {
        let mut handlers = self.handlers.borrow_mut();
        handlers.retain(|(id, _)| id != contribution_id);
        handlers.push((contribution_id.to_string(), handler));
    }
}
