//! Ordered Dropdown - a work item form control with an administrator-defined value order
//!
//! The control binds to one work item field. Its list is the field's allowed
//! values, reordered so the values named in the control's configuration come
//! first; every other allowed value follows in the order the host reports it.
//! The control reads and writes the field through the host and follows the
//! host's change, reset and refresh notifications.
//!
//! # Example
//!
//! ```
//! # tokio_test::block_on(async {
//! use ordered_dropdown::config::ControlConfig;
//! use ordered_dropdown::host::{HostServices, InMemoryFieldStore, RecordingLayout};
//! use ordered_dropdown::{Controller, ControllerOptions};
//!
//! let store = InMemoryFieldStore::new();
//! store.set_allowed_values("Custom.Size", ["S", "M", "L"]);
//! store.insert_value("Custom.Size", "M");
//!
//! let services = HostServices::in_memory(
//!     ControlConfig::new("Custom.Size", "L;M"),
//!     store,
//!     RecordingLayout::new(),
//! );
//! let controller = Controller::new(services, ControllerOptions::new());
//! controller.initialize().await.unwrap();
//!
//! assert_eq!(controller.view().items, ["L", "M", "S"]);
//! assert_eq!(controller.view().selected_index, Some(1));
//! # });
//! ```

pub mod config;
pub mod controller;
pub mod diagnostic;
pub mod dropdown;
pub mod error;
pub mod host;
pub mod reconcile;
pub mod span;
pub mod trace;

use std::rc::Rc;

/// Re-export main types for convenience
pub use config::ControlConfig;
pub use controller::{
    register_control, ControlView, Controller, ControllerOptions, LoadOutcome, LoadState,
    SelectionPolicy, WriteOutcome,
};
pub use error::ControlError;
pub use host::{FieldChangedArgs, HostError, HostServices};
pub use reconcile::{reconcile, CandidateList};
pub use trace::{SyncEvent, SyncTrace};

/// Create a controller, register it with the host and run the first load
///
/// The controller is registered before loading so that no change notification
/// is missed while the first cycle is in flight. A failed first load is logged
/// and leaves the control loading; the next reset or refresh retries it.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// use ordered_dropdown::host::{
///     HostServices, InMemoryFieldStore, InMemoryRegistry, RecordingLayout,
/// };
/// use ordered_dropdown::{mount, ControlConfig, ControllerOptions};
///
/// let store = InMemoryFieldStore::new();
/// store.set_allowed_values("Custom.Size", ["S", "M", "L"]);
/// let services = HostServices::in_memory(
///     ControlConfig::new("Custom.Size", ""),
///     store,
///     RecordingLayout::new(),
/// );
///
/// let registry = InMemoryRegistry::new();
/// let controller = mount(services, ControllerOptions::new(), &registry, "size-dropdown").await;
/// assert!(controller.is_ready());
/// assert_eq!(registry.contributions(), ["size-dropdown"]);
/// # });
/// ```
pub async fn mount(
    services: HostServices,
    options: ControllerOptions,
    registry: &dyn host::NotificationRegistry,
    contribution_id: &str,
) -> Rc<Controller> {
    let controller = Rc::new(Controller::new(services, options));
    register_control(registry, contribution_id, controller.clone());

    if let Err(error) = controller.initialize().await {
        tracing::warn!(contribution_id, %error, "first load failed");
    }

    controller
}
