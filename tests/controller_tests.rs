/// Tests for the load cycle and how it interleaves with host notifications
use async_trait::async_trait;
use ordered_dropdown::config::ControlConfig;
use ordered_dropdown::host::{
    ConfigurationSource, FieldValidationService, FieldValue, HostServices, InMemoryFieldStore,
    LayoutHint, RecordingLayout,
};
use ordered_dropdown::{
    ControlError, Controller, ControllerOptions, FieldChangedArgs, HostError, LoadOutcome,
    LoadState, SelectionPolicy, SyncEvent, WriteOutcome,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tokio::sync::oneshot;

const FIELD: &str = "Microsoft.VSTS.Common.Priority";

/// Validation service whose calls wait until the test releases them
///
/// Each call takes the next queued gate and answers with that gate's values.
#[derive(Default)]
struct GatedValidation {
    gates: RefCell<VecDeque<(oneshot::Receiver<()>, Vec<String>)>>,
}

impl GatedValidation {
    fn gate(&self, values: &[&str]) -> oneshot::Sender<()> {
        let (release, wait) = oneshot::channel();
        let values = values.iter().map(|value| value.to_string()).collect();
        self.gates.borrow_mut().push_back((wait, values));
        release
    }
}

#[async_trait(?Send)]
impl FieldValidationService for GatedValidation {
    async fn allowed_values(&self, _field: &str) -> Result<Vec<String>, HostError> {
        let gate = self.gates.borrow_mut().pop_front();
        let Some((wait, values)) = gate else {
            return Err(HostError::NotAvailable("no gate queued".to_string()));
        };
        wait.await.map_err(|_| HostError::Failed("gate dropped".to_string()))?;
        Ok(values)
    }
}

struct Fixture {
    controller: Controller,
    store: InMemoryFieldStore,
    layout: RecordingLayout,
}

fn fixture(values: &str, options: ControllerOptions) -> Fixture {
    let store = InMemoryFieldStore::new();
    store.set_allowed_values(FIELD, ["Low", "Medium", "High"]);
    store.insert_value(FIELD, "Low");
    let layout = RecordingLayout::new();
    let services = HostServices::in_memory(
        ControlConfig::new(FIELD, values),
        store.clone(),
        layout.clone(),
    );
    Fixture {
        controller: Controller::new(services, options.with_trace(true)),
        store,
        layout,
    }
}

fn gated_fixture() -> (Controller, Rc<GatedValidation>, InMemoryFieldStore) {
    let store = InMemoryFieldStore::new();
    store.insert_value(FIELD, "Low");
    let gated = Rc::new(GatedValidation::default());
    let services = HostServices::new(
        Rc::new(ControlConfig::new(FIELD, "")),
        gated.clone(),
        Rc::new(store.clone()),
        Rc::new(RecordingLayout::new()),
    );
    let controller = Controller::new(services, ControllerOptions::new().with_trace(true));
    (controller, gated, store)
}

#[tokio::test]
async fn test_unrelated_field_change_keeps_selection() {
    let f = fixture("", ControllerOptions::new());
    f.controller.initialize().await.unwrap();

    f.controller.apply_field_change(&FieldChangedArgs::new().with_field("System.Title", "High"));

    assert_eq!(f.controller.selection().as_deref(), Some("Low"));
    assert_eq!(
        f.controller.trace().events().last(),
        Some(&SyncEvent::FieldChangeIgnored)
    );
}

#[tokio::test]
async fn test_bound_field_change_updates_selection_without_refetch() {
    let f = fixture("", ControllerOptions::new());
    f.controller.initialize().await.unwrap();
    let calls = f.store.allowed_value_calls();

    f.controller.apply_field_change(&FieldChangedArgs::new().with_field(FIELD, "High"));

    assert_eq!(f.controller.selection().as_deref(), Some("High"));
    assert_eq!(f.controller.view().selected_index, Some(2));
    assert_eq!(f.store.allowed_value_calls(), calls);
}

#[tokio::test]
async fn test_cleared_field_clears_selection() {
    let f = fixture("", ControllerOptions::new());
    f.controller.initialize().await.unwrap();

    f.controller.apply_field_change(&FieldChangedArgs::new().with_cleared(FIELD));
    assert_eq!(f.controller.selection(), None);
    assert_eq!(f.controller.view().selected_index, None);
}

#[tokio::test]
async fn test_empty_selection_is_not_written() {
    let f = fixture("", ControllerOptions::new());
    f.controller.initialize().await.unwrap();

    assert_eq!(f.controller.on_user_select(None).await, WriteOutcome::Skipped);
    assert_eq!(f.controller.on_user_select(Some("")).await, WriteOutcome::Skipped);
    assert!(f.store.writes().is_empty());
}

#[tokio::test]
async fn test_selection_waits_for_host_confirmation() {
    let f = fixture("", ControllerOptions::new());
    f.controller.initialize().await.unwrap();

    assert_eq!(
        f.controller.on_user_select(Some("High")).await,
        WriteOutcome::Written
    );
    assert_eq!(f.store.value(FIELD).as_deref(), Some("High"));
    assert_eq!(f.controller.selection().as_deref(), Some("Low"));

    f.controller.apply_field_change(&FieldChangedArgs::new().with_field(FIELD, "High"));
    assert_eq!(f.controller.selection().as_deref(), Some("High"));
}

#[tokio::test]
async fn test_optimistic_policy_shows_written_value() {
    let f = fixture(
        "",
        ControllerOptions::new().with_policy(SelectionPolicy::Optimistic),
    );
    f.controller.initialize().await.unwrap();

    f.controller.on_user_select(Some("Medium")).await;
    assert_eq!(f.controller.selection().as_deref(), Some("Medium"));
}

#[tokio::test]
async fn test_failed_write_keeps_selection() {
    let f = fixture(
        "",
        ControllerOptions::new().with_policy(SelectionPolicy::Optimistic),
    );
    f.controller.initialize().await.unwrap();
    f.store.fail_set_value(HostError::Failed("work item is read-only".to_string()));

    let outcome = f.controller.on_user_select(Some("High")).await;

    assert!(matches!(
        outcome,
        WriteOutcome::Failed(ControlError::FieldWrite(_))
    ));
    assert_eq!(f.controller.selection().as_deref(), Some("Low"));
    assert!(f.store.writes().is_empty());
}

#[tokio::test]
async fn test_allowed_values_failure_leaves_loading() {
    let f = fixture("", ControllerOptions::new());
    f.store.fail_allowed_values(HostError::Failed("offline".to_string()));

    let result = f.controller.initialize().await;

    assert!(matches!(result, Err(ControlError::AllowedValues(_))));
    assert_eq!(f.controller.load_state(), LoadState::Loading);
    assert!(f.controller.view().loading);
    assert_eq!(f.store.get_value_calls(), 0);
    assert!(f.layout.hints().is_empty());
}

#[tokio::test]
async fn test_field_value_failure_leaves_loading() {
    let f = fixture("", ControllerOptions::new());
    f.store.fail_get_value(HostError::Failed("offline".to_string()));

    let result = f.controller.initialize().await;

    assert!(matches!(result, Err(ControlError::FieldValue(_))));
    assert_eq!(f.controller.load_state(), LoadState::Loading);
    assert!(f.controller.view().items.is_empty());
}

#[tokio::test]
async fn test_failure_after_ready_hides_previous_list() {
    let f = fixture("", ControllerOptions::new());
    f.controller.initialize().await.unwrap();
    f.store.fail_allowed_values(HostError::Failed("offline".to_string()));

    assert!(f.controller.initialize().await.is_err());
    assert!(f.controller.view().loading);

    f.store.clear_failures();
    assert_eq!(f.controller.initialize().await, Ok(LoadOutcome::Committed));
    assert_eq!(f.controller.view().items, ["Low", "Medium", "High"]);
}

#[tokio::test]
async fn test_missing_field_reference_is_fatal() {
    let store = InMemoryFieldStore::new();
    let services = HostServices::in_memory(
        HashMap::<String, String>::new(),
        store.clone(),
        RecordingLayout::new(),
    );
    let controller = Controller::new(services, ControllerOptions::new());

    assert_eq!(
        controller.initialize().await,
        Err(ControlError::MissingFieldReference)
    );
    assert_eq!(store.allowed_value_calls(), 0);
}

#[tokio::test]
async fn test_missing_configured_values_fall_back_to_allowed_order() {
    let store = InMemoryFieldStore::new();
    store.set_allowed_values(FIELD, ["B", "A"]);
    let mut inputs = HashMap::new();
    inputs.insert("FieldName".to_string(), FIELD.to_string());
    let services = HostServices::in_memory(inputs, store, RecordingLayout::new());
    let controller = Controller::new(services, ControllerOptions::new().with_trace(true));

    assert_eq!(controller.initialize().await, Ok(LoadOutcome::Committed));
    assert_eq!(controller.view().items, ["B", "A"]);
    assert!(!controller
        .trace()
        .events()
        .any(|event| matches!(event, SyncEvent::ConfigurationUnavailable { .. })));
}

/// Configuration whose configured order cannot be read
struct UnreadableValues;

impl ConfigurationSource for UnreadableValues {
    fn field_reference(&self) -> Result<String, HostError> {
        Ok(FIELD.to_string())
    }

    fn configured_values(&self) -> Result<String, HostError> {
        Err(HostError::Failed("inputs not loaded".to_string()))
    }
}

#[tokio::test]
async fn test_unreadable_configured_values_fall_back_to_allowed_order() {
    let store = InMemoryFieldStore::new();
    store.set_allowed_values(FIELD, ["B", "A"]);
    let services = HostServices::in_memory(UnreadableValues, store, RecordingLayout::new());
    let controller = Controller::new(services, ControllerOptions::new().with_trace(true));

    assert_eq!(controller.initialize().await, Ok(LoadOutcome::Committed));
    assert_eq!(controller.view().items, ["B", "A"]);
    assert!(controller
        .trace()
        .events()
        .any(|event| matches!(event, SyncEvent::ConfigurationUnavailable { .. })));
}

#[tokio::test]
async fn test_numeric_allowed_values_load() {
    // Integer fields report their allowed values and current value as numbers
    let allowed: Vec<FieldValue> = serde_json::from_str("[1, 2, 3, 4]").unwrap();
    let current: FieldValue = serde_json::from_str("3").unwrap();

    let f = fixture("2;1", ControllerOptions::new());
    f.store.set_allowed_values(
        FIELD,
        allowed.into_iter().map(FieldValue::into_text).collect::<Vec<_>>(),
    );
    f.store.insert_value(FIELD, current.into_text());

    assert_eq!(f.controller.initialize().await, Ok(LoadOutcome::Committed));
    let view = f.controller.view();
    assert!(!view.loading);
    assert_eq!(view.items, ["2", "1", "3", "4"]);
    assert_eq!(view.selected_index, Some(2));
}

#[tokio::test]
async fn test_refresh_during_load_commits_only_latest_cycle() {
    let (controller, gated, _) = gated_fixture();
    let first = gated.gate(&["Stale"]);
    let second = gated.gate(&["Fresh"]);

    let release = async {
        tokio::task::yield_now().await;
        second.send(()).unwrap();
        tokio::task::yield_now().await;
        first.send(()).unwrap();
    };
    let (a, b, ()) = tokio::join!(controller.initialize(), controller.initialize(), release);

    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|outcome| *outcome == LoadOutcome::Committed);
    assert_eq!(outcomes, [LoadOutcome::Superseded, LoadOutcome::Committed]);

    assert_eq!(controller.generation(), 2);
    assert_eq!(controller.view().items, ["Fresh"]);
    let committed = controller
        .trace()
        .entries()
        .iter()
        .filter(|entry| matches!(entry.event, SyncEvent::CycleCommitted { .. }))
        .map(|entry| entry.generation)
        .collect::<Vec<_>>();
    assert_eq!(committed, [2]);
}

#[tokio::test]
async fn test_stale_cycle_finishing_first_is_discarded() {
    let (controller, gated, _) = gated_fixture();
    let first = gated.gate(&["Stale"]);
    let second = gated.gate(&["Fresh"]);

    let release = async {
        tokio::task::yield_now().await;
        first.send(()).unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        // The stale cycle must not have shown anything
        assert!(controller.view().loading);
        second.send(()).unwrap();
    };
    let (a, b, ()) = tokio::join!(controller.initialize(), controller.initialize(), release);

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(controller.view().items, ["Fresh"]);
    assert!(controller
        .trace()
        .events()
        .any(|event| *event == SyncEvent::CycleSuperseded));
}

#[tokio::test]
async fn test_change_during_load_survives_commit() {
    let (controller, gated, store) = gated_fixture();
    let gate = gated.gate(&["Low", "High"]);

    let notify = async {
        tokio::task::yield_now().await;
        controller.apply_field_change(&FieldChangedArgs::new().with_field(FIELD, "High"));
        gate.send(()).unwrap();
    };
    let (result, ()) = tokio::join!(controller.initialize(), notify);

    assert_eq!(result, Ok(LoadOutcome::Committed));
    assert_eq!(store.value(FIELD).as_deref(), Some("Low"));
    assert_eq!(controller.selection().as_deref(), Some("High"));
    assert_eq!(controller.view().selected_index, Some(1));
}

#[tokio::test]
async fn test_commit_resizes_frame_to_content() {
    let f = fixture("", ControllerOptions::new());
    f.controller.on_collapse();
    f.controller.initialize().await.unwrap();
    assert_eq!(f.layout.last(), Some(LayoutHint::auto()));
}
