/// Interaction model of the rendered dropdown
///
/// Rendering is the host page's job. This is only the expanded/collapsed logic
/// behind it: a read-only text field showing the selection, a chevron that
/// toggles the list, and the list itself. Clicking the chevron moves focus away
/// from the text field and back again, so while the chevron is held down the
/// focus and blur events it causes must not expand or collapse the list.
use serde::{Deserialize, Serialize};

/// Input events from the rendered dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DropdownEvent {
    /// Focus entered the dropdown
    Focus,
    /// Focus left an element; `inside` when it moved to another element of the dropdown
    Blur { inside: bool },
    /// The pointer left the dropdown
    MouseLeave,
    /// The text field was clicked
    FieldClick,
    /// The chevron was pressed
    ArrowMouseDown,
    /// The chevron was released
    ArrowClick,
    /// A row was picked; `None` when the list reported an empty pick
    RowSelected { value: Option<String> },
}

/// What the controller has to act on after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropdownEffect {
    Expanded,
    Collapsed,
    Select(Option<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropdownState {
    expanded: bool,
    toggling: bool,
}

impl DropdownState {
    pub fn new() -> Self {
        DropdownState::default()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_toggling(&self) -> bool {
        self.toggling
    }

    /// Apply an event, returning the effects it caused in order
    pub fn handle(&mut self, event: DropdownEvent) -> Vec<DropdownEffect> {
        let mut effects = Vec::new();

        match event {
            DropdownEvent::Focus => {
                if !self.toggling {
                    self.set_expanded(true, &mut effects);
                }
            }
            DropdownEvent::Blur { inside } => {
                if !inside && !self.toggling {
                    self.set_expanded(false, &mut effects);
                }
            }
            DropdownEvent::MouseLeave => {
                // A drag off the chevron never produces the click that would clear this
                self.toggling = false;
            }
            DropdownEvent::FieldClick => {
                self.set_expanded(true, &mut effects);
            }
            DropdownEvent::ArrowMouseDown => {
                self.toggling = true;
            }
            DropdownEvent::ArrowClick => {
                let expanded = !self.expanded;
                self.set_expanded(expanded, &mut effects);
                self.toggling = false;
            }
            DropdownEvent::RowSelected { value } => {
                effects.push(DropdownEffect::Select(value));
                self.set_expanded(false, &mut effects);
            }
        }

        effects
    }

    fn set_expanded(&mut self, expanded: bool, effects: &mut Vec<DropdownEffect>) {
        if self.expanded == expanded {
            return;
        }
        self.expanded = expanded;
        effects.push(if expanded {
            DropdownEffect::Expanded
        } else {
            DropdownEffect::Collapsed
        });
    }
}

/// Row to highlight for `selected`, if the list offers it
pub fn selected_index<S: AsRef<str>>(items: &[S], selected: Option<&str>) -> Option<usize> {
    let selected = selected?;
    items.iter().position(|item| item.as_ref() == selected)
}
