/// JavaScript binding for the ordered dropdown control
///
/// The page hands the control a host object wrapping the work item form
/// service and the extension SDK:
///
/// ```js
/// const control = new OrderedDropdown({
///   getFieldReference: () => config.witInputs.FieldName,
///   getConfiguredValues: () => config.witInputs.Values,
///   getAllowedValues: (field) => formService.getAllowedFieldValues(field),
///   getFieldValue: (field) => formService.getFieldValue(field, { returnOriginalValue: false }),
///   setFieldValue: (field, value) => formService.setFieldValue(field, value),
///   resize: (width, height) => SDK.resize(width, height),
/// });
/// SDK.register(SDK.getContributionId(), () => ({
///   onFieldChanged: (args) => control.onFieldChanged(args),
///   onReset: () => control.onReset(),
///   onRefreshed: () => control.onRefreshed(),
/// }));
/// await control.initialize();
/// ```
use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect};
use ordered_dropdown::config::{lint_configuration, parse_configured_values};
use ordered_dropdown::diagnostic::report_config_issue_plain;
use ordered_dropdown::dropdown::{DropdownEvent, DropdownState};
use ordered_dropdown::host::{
    ConfigurationSource, ControlHandler, FieldValidationService, FieldValue, FieldValueService,
    HostServices, LayoutHint, LayoutSink,
};
use ordered_dropdown::{
    reconcile, Controller, ControllerOptions, FieldChangedArgs, HostError, LoadOutcome,
    SelectionPolicy, WriteOutcome,
};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

/// A JavaScript object implementing the host callbacks
struct JsHost {
    host: JsValue,
}

impl JsHost {
    fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, HostError> {
        let function = Reflect::get(&self.host, &JsValue::from_str(method))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
            .ok_or_else(|| HostError::NotAvailable(method.to_string()))?;
        let args: Array = args.iter().collect();
        function
            .apply(&self.host, &args)
            .map_err(|e| HostError::Failed(describe(&e)))
    }

    // Plain return values are treated as already-resolved promises
    async fn call_async(&self, method: &str, args: &[JsValue]) -> Result<JsValue, HostError> {
        let value = self.call(method, args)?;
        JsFuture::from(Promise::resolve(&value))
            .await
            .map_err(|e| HostError::Failed(describe(&e)))
    }
}

fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .or_else(|| {
            error
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", error))
}

// Integer fields such as priority report numbers rather than strings
fn decode_values(values: JsValue) -> Result<Vec<String>, serde_wasm_bindgen::Error> {
    let values: Vec<FieldValue> = serde_wasm_bindgen::from_value(values)?;
    Ok(values.into_iter().map(FieldValue::into_text).collect())
}

impl ConfigurationSource for JsHost {
    fn field_reference(&self) -> Result<String, HostError> {
        self.call("getFieldReference", &[])?
            .as_string()
            .filter(|field| !field.trim().is_empty())
            .ok_or_else(|| HostError::NotAvailable("FieldName".to_string()))
    }

    fn configured_values(&self) -> Result<String, HostError> {
        let values = self.call("getConfiguredValues", &[])?;
        if values.is_undefined() || values.is_null() {
            return Ok(String::new());
        }
        values
            .as_string()
            .ok_or_else(|| HostError::Failed(format!("Values is not a string: {:?}", values)))
    }
}

#[async_trait(?Send)]
impl FieldValidationService for JsHost {
    async fn allowed_values(&self, field: &str) -> Result<Vec<String>, HostError> {
        let values = self
            .call_async("getAllowedValues", &[JsValue::from_str(field)])
            .await?;
        decode_values(values).map_err(|e| HostError::Failed(e.to_string()))
    }
}

#[async_trait(?Send)]
impl FieldValueService for JsHost {
    async fn get_value(&self, field: &str) -> Result<Option<String>, HostError> {
        let value = self
            .call_async("getFieldValue", &[JsValue::from_str(field)])
            .await?;
        let value: Option<FieldValue> =
            serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Failed(e.to_string()))?;
        Ok(value.map(FieldValue::into_text))
    }

    async fn set_value(&self, field: &str, value: &str) -> Result<(), HostError> {
        let accepted = self
            .call_async(
                "setFieldValue",
                &[JsValue::from_str(field), JsValue::from_str(value)],
            )
            .await?;
        if accepted.as_bool() == Some(false) {
            return Err(HostError::Rejected(format!("{} = {}", field, value)));
        }
        Ok(())
    }
}

impl LayoutSink for JsHost {
    fn resize(&self, hint: LayoutHint) {
        let dimension = |value: Option<u32>| value.map_or(JsValue::UNDEFINED, JsValue::from);
        if let Err(error) = self.call("resize", &[dimension(hint.width), dimension(hint.height)]) {
            tracing::debug!(%error, "resize request failed");
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MountOptions {
    optimistic: bool,
    trace: bool,
}

/// The dropdown control, driven by the page and the host's notifications
#[wasm_bindgen]
pub struct OrderedDropdown {
    controller: Rc<Controller>,
    dropdown: RefCell<DropdownState>,
}

#[wasm_bindgen]
impl OrderedDropdown {
    /// Create a control around a host object; see the crate docs for its shape
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsValue, options: JsValue) -> Result<OrderedDropdown, JsValue> {
        let options: MountOptions = if options.is_undefined() || options.is_null() {
            MountOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        let policy = if options.optimistic {
            SelectionPolicy::Optimistic
        } else {
            SelectionPolicy::Conservative
        };

        let host = Rc::new(JsHost { host });
        let services = HostServices::new(host.clone(), host.clone(), host.clone(), host);
        let controller = Controller::new(
            services,
            ControllerOptions::new()
                .with_policy(policy)
                .with_trace(options.trace),
        );

        Ok(OrderedDropdown {
            controller: Rc::new(controller),
            dropdown: RefCell::new(DropdownState::new()),
        })
    }

    /// Run a load cycle; resolves to `true` when it was applied
    pub fn initialize(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            match controller.initialize().await {
                Ok(outcome) => Ok(JsValue::from_bool(outcome == LoadOutcome::Committed)),
                Err(e) => Err(JsValue::from_str(&e.to_string())),
            }
        })
    }

    #[wasm_bindgen(js_name = onFieldChanged)]
    pub fn on_field_changed(&self, args: JsValue) -> Result<(), JsValue> {
        let args: FieldChangedArgs = serde_wasm_bindgen::from_value(args)?;
        self.controller.on_field_changed(&args);
        Ok(())
    }

    #[wasm_bindgen(js_name = onReset)]
    pub fn on_reset(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.on_reset().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = onRefreshed)]
    pub fn on_refreshed(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.on_refreshed().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Write a picked value; resolves to `true` when the host took it
    #[wasm_bindgen(js_name = onUserSelect)]
    pub fn on_user_select(&self, value: Option<String>) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let outcome = controller.on_user_select(value.as_deref()).await;
            Ok(JsValue::from_bool(outcome == WriteOutcome::Written))
        })
    }

    /// Feed a dropdown event such as `{ type: "arrowClick" }`
    pub fn dispatch(&self, event: JsValue) -> Result<Promise, JsValue> {
        let event: DropdownEvent = serde_wasm_bindgen::from_value(event)?;
        let effects = self.dropdown.borrow_mut().handle(event);
        let controller = self.controller.clone();
        Ok(future_to_promise(async move {
            controller.apply_effects(effects).await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// What to render: `{ items, selected, selectedIndex, loading, expanded }`
    pub fn view(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.controller.view())?)
    }

    pub fn trace(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.controller.trace())?)
    }
}

/// Reconcile a configured order with a list of allowed values
#[wasm_bindgen]
pub fn reconcile_values(configured: &str, allowed: JsValue) -> Result<JsValue, JsValue> {
    let allowed = decode_values(allowed)?;
    let list = reconcile(&parse_configured_values(configured), &allowed);
    Ok(serde_wasm_bindgen::to_value(&list)?)
}

/// Explain which configured entries will not show up where they were listed
#[wasm_bindgen]
pub fn lint_values(configured: &str, allowed: JsValue) -> Result<String, JsValue> {
    let allowed = decode_values(allowed)?;
    Ok(lint_configuration(configured, &allowed)
        .iter()
        .map(|issue| report_config_issue_plain("Values", configured, issue))
        .collect())
}
