/// Keeps the dropdown's list and selection in step with the host.
///
/// The controller owns everything the control shows: the candidate list, the
/// selection, whether it is still loading and whether the list is expanded.
/// A load cycle ([`Controller::initialize`]) reads the configuration, fetches
/// the allowed values, reconciles the two, reads the current field value and
/// then commits list and selection together. The host re-runs the cycle on
/// every reset or refresh.
///
/// Cycles may overlap. Each one takes a new generation number when it starts,
/// and checks after every host call that no newer cycle has started since;
/// a superseded cycle drops its results without touching state. Change
/// notifications are applied in every state, and one that lands while a cycle
/// is in flight wins over the value that cycle read.
///
/// State is only borrowed between host calls, never across an `.await`, so
/// any number of controller futures can be interleaved on one thread.
use crate::config::parse_configured_values;
use crate::dropdown::{selected_index, DropdownEffect};
use crate::error::ControlError;
use crate::host::{
    ControlHandler, FieldChangedArgs, HostServices, LayoutHint, NotificationRegistry,
};
use crate::reconcile::{reconcile, CandidateList};
use crate::trace::{SyncEvent, SyncTrace};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Frame height requested while the list is collapsed
pub const COLLAPSED_HEIGHT: u32 = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// No load cycle has started yet
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// How a user selection reaches the displayed selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Wait for the host's change notification after a write
    #[default]
    Conservative,
    /// Show the written value as soon as the write succeeds
    Optimistic,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptions {
    pub policy: SelectionPolicy,
    pub trace: bool,
}

impl ControllerOptions {
    pub fn new() -> Self {
        ControllerOptions::default()
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Record a [`SyncTrace`] of everything the controller does
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// How a load cycle ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// List and selection were applied
    Committed,
    /// A newer cycle started first; nothing was applied
    Superseded,
}

/// Result of handing a user selection to the host
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Nothing was selected, so nothing was written
    Skipped,
    Written,
    Failed(ControlError),
}

/// What the presentation layer may render
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlView {
    pub items: Vec<String>,
    pub selected: Option<String>,
    /// Row of `selected` in `items`; `None` when the value is not offered
    pub selected_index: Option<usize>,
    pub loading: bool,
    pub expanded: bool,
}

#[derive(Debug, Default)]
struct ControlState {
    load: LoadState,
    items: CandidateList,
    selection: Option<String>,
    /// Bumped on every externally applied selection change
    selection_clock: u64,
    /// Field reference resolved by the latest cycle
    field: Option<String>,
    expanded: bool,
}

#[derive(Debug, Clone, Copy)]
struct Cycle {
    generation: u64,
    selection_clock: u64,
}

pub struct Controller {
    services: HostServices,
    options: ControllerOptions,
    generation: Cell<u64>,
    state: RefCell<ControlState>,
    trace: RefCell<SyncTrace>,
}

impl Controller {
    pub fn new(services: HostServices, options: ControllerOptions) -> Self {
        Controller {
            services,
            options,
            generation: Cell::new(0),
            state: RefCell::new(ControlState::default()),
            trace: RefCell::new(SyncTrace::new()),
        }
    }

    /// Run a load cycle
    ///
    /// On error the control stays in [`LoadState::Loading`] until the next
    /// cycle succeeds.
    pub async fn initialize(&self) -> Result<LoadOutcome, ControlError> {
        let cycle = self.begin_cycle();

        match self.load(cycle).await {
            Ok(LoadOutcome::Superseded) => {
                debug!(generation = cycle.generation, "discarding superseded load");
                self.record(cycle.generation, SyncEvent::CycleSuperseded);
                Ok(LoadOutcome::Superseded)
            }
            Ok(LoadOutcome::Committed) => Ok(LoadOutcome::Committed),
            Err(error) => {
                warn!(generation = cycle.generation, %error, "load failed");
                self.record(
                    cycle.generation,
                    SyncEvent::CycleFailed {
                        error: error.to_string(),
                    },
                );
                Err(error)
            }
        }
    }

    fn begin_cycle(&self) -> Cycle {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let selection_clock = {
            let mut state = self.state.borrow_mut();
            state.load = LoadState::Loading;
            state.selection_clock
        };

        debug!(generation, "load started");
        self.record(generation, SyncEvent::CycleStarted);
        Cycle {
            generation,
            selection_clock,
        }
    }

    async fn load(&self, cycle: Cycle) -> Result<LoadOutcome, ControlError> {
        let config = &self.services.config;

        let field = config.field_reference().map_err(|error| {
            debug!(%error, "field reference unavailable");
            ControlError::MissingFieldReference
        })?;
        self.state.borrow_mut().field = Some(field.clone());

        let configured = match config.configured_values() {
            Ok(raw) => parse_configured_values(&raw),
            Err(error) => {
                let error = ControlError::Configuration(error);
                warn!(%field, %error, "using allowed value order");
                self.record(
                    cycle.generation,
                    SyncEvent::ConfigurationUnavailable {
                        error: error.to_string(),
                    },
                );
                Vec::new()
            }
        };

        let allowed = self.services.validation.allowed_values(&field).await;
        if !self.is_current(cycle) {
            return Ok(LoadOutcome::Superseded);
        }
        let allowed = allowed.map_err(ControlError::AllowedValues)?;
        let items = reconcile(&configured, &allowed);

        let value = self.services.values.get_value(&field).await;
        if !self.is_current(cycle) {
            return Ok(LoadOutcome::Superseded);
        }
        let value = value.map_err(ControlError::FieldValue)?;

        self.commit(cycle, items, normalize(value));
        Ok(LoadOutcome::Committed)
    }

    fn commit(&self, cycle: Cycle, items: CandidateList, fetched: Option<String>) {
        let (items, selection) = {
            let mut state = self.state.borrow_mut();
            if state.selection_clock == cycle.selection_clock {
                state.selection = fetched;
            } else {
                debug!(
                    generation = cycle.generation,
                    "keeping selection changed during load"
                );
            }
            state.items = items;
            state.load = LoadState::Ready;
            (state.items.clone(), state.selection.clone())
        };

        info!(
            generation = cycle.generation,
            items = items.len(),
            selection = selection.as_deref().unwrap_or(""),
            "control ready"
        );
        if self.options.trace {
            self.record(
                cycle.generation,
                SyncEvent::CycleCommitted {
                    items: items.into_vec(),
                    selection,
                },
            );
        }
        self.services.layout.resize(LayoutHint::auto());
    }

    fn is_current(&self, cycle: Cycle) -> bool {
        self.generation.get() == cycle.generation
    }

    /// Apply a change notification
    ///
    /// Only the bound field is looked at; the candidate list is left alone.
    pub fn apply_field_change(&self, args: &FieldChangedArgs) {
        let generation = self.generation.get();
        let Some(field) = self.bound_field() else {
            debug!("change notification before a field is bound");
            self.record(generation, SyncEvent::FieldChangeIgnored);
            return;
        };

        match args.get(&field) {
            Some(value) => {
                let value = normalize(value.map(str::to_string));
                debug!(%field, value = value.as_deref().unwrap_or(""), "bound field changed");
                self.set_selection(value.clone());
                self.record(generation, SyncEvent::FieldChanged { value });
            }
            None => self.record(generation, SyncEvent::FieldChangeIgnored),
        }
    }

    /// Write a value the user picked back to the bound field
    ///
    /// An empty pick is ignored. Write failures are logged and returned, never
    /// raised; the selection only follows once the host confirms the change,
    /// unless the policy is [`SelectionPolicy::Optimistic`].
    pub async fn on_user_select(&self, value: Option<&str>) -> WriteOutcome {
        let generation = self.generation.get();
        let Some(value) = value.filter(|value| !value.is_empty()) else {
            debug!("ignoring empty selection");
            self.record(generation, SyncEvent::WriteSkipped);
            return WriteOutcome::Skipped;
        };

        let Some(field) = self.bound_field() else {
            return self.write_failed(generation, ControlError::MissingFieldReference);
        };

        match self.services.values.set_value(&field, value).await {
            Ok(()) => {
                debug!(%field, value, "selection written");
                self.record(
                    generation,
                    SyncEvent::WriteIssued {
                        value: value.to_string(),
                    },
                );
                if self.options.policy == SelectionPolicy::Optimistic {
                    self.set_selection(Some(value.to_string()));
                }
                WriteOutcome::Written
            }
            Err(error) => self.write_failed(generation, ControlError::FieldWrite(error)),
        }
    }

    fn write_failed(&self, generation: u64, error: ControlError) -> WriteOutcome {
        warn!(%error, "selection not written");
        self.record(
            generation,
            SyncEvent::WriteFailed {
                error: error.to_string(),
            },
        );
        WriteOutcome::Failed(error)
    }

    /// The list opened; let the frame grow to fit it
    pub fn on_expand(&self) {
        self.state.borrow_mut().expanded = true;
        self.record(self.generation.get(), SyncEvent::Expanded);
        self.services.layout.resize(LayoutHint::auto());
    }

    /// The list closed; shrink the frame back to the text field
    pub fn on_collapse(&self) {
        self.state.borrow_mut().expanded = false;
        self.record(self.generation.get(), SyncEvent::Collapsed);
        self.services.layout.resize(LayoutHint::height(COLLAPSED_HEIGHT));
    }

    /// Act on what the dropdown reported
    pub async fn apply_effects(&self, effects: Vec<DropdownEffect>) {
        for effect in effects {
            match effect {
                DropdownEffect::Expanded => self.on_expand(),
                DropdownEffect::Collapsed => self.on_collapse(),
                DropdownEffect::Select(value) => {
                    self.on_user_select(value.as_deref()).await;
                }
            }
        }
    }

    fn set_selection(&self, selection: Option<String>) {
        let mut state = self.state.borrow_mut();
        state.selection = selection;
        state.selection_clock += 1;
    }

    // Falls back to the configuration while no cycle has resolved a field
    fn bound_field(&self) -> Option<String> {
        if let Some(field) = self.state.borrow().field.clone() {
            return Some(field);
        }
        self.services.config.field_reference().ok()
    }

    fn record(&self, generation: u64, event: SyncEvent) {
        if self.options.trace {
            self.trace.borrow_mut().push(generation, event);
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.state.borrow().load
    }

    pub fn is_ready(&self) -> bool {
        self.load_state() == LoadState::Ready
    }

    /// The current candidate list, whether or not loading has finished
    pub fn items(&self) -> CandidateList {
        self.state.borrow().items.clone()
    }

    pub fn selection(&self) -> Option<String> {
        self.state.borrow().selection.clone()
    }

    pub fn is_expanded(&self) -> bool {
        self.state.borrow().expanded
    }

    /// Generation of the most recently started load cycle
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn trace(&self) -> SyncTrace {
        self.trace.borrow().clone()
    }

    /// Snapshot for rendering; empty until the control is ready
    pub fn view(&self) -> ControlView {
        let state = self.state.borrow();
        if state.load != LoadState::Ready {
            return ControlView {
                loading: true,
                expanded: state.expanded,
                ..ControlView::default()
            };
        }

        ControlView {
            items: state.items.as_slice().to_vec(),
            selected: state.selection.clone(),
            selected_index: selected_index(state.items.as_slice(), state.selection.as_deref()),
            loading: false,
            expanded: state.expanded,
        }
    }
}

#[async_trait(?Send)]
impl ControlHandler for Controller {
    fn on_field_changed(&self, args: &FieldChangedArgs) {
        self.apply_field_change(args);
    }

    async fn on_reset(&self) {
        // Failures already logged; the control stays loading until the next cycle
        let _ = self.initialize().await;
    }

    async fn on_refreshed(&self) {
        let _ = self.initialize().await;
    }
}

/// Register a controller to receive the host's notifications
pub fn register_control(
    registry: &dyn NotificationRegistry,
    contribution_id: &str,
    controller: Rc<Controller>,
) {
    info!(contribution_id, "registering control");
    registry.register(contribution_id, controller);
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
