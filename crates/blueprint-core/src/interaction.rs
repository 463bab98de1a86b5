use crate::graph::{InputRef, OutputRef, SlotRef};

/// What the editor should do in response to a slot click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    /// The clicked slot became the pending slot. When `sever` is set the
    /// clicked input held a link that must be cut first.
    Begin {
        /// Input whose link to cut
        sever: Option<InputRef>,
    },
    /// The click completed a link
    Complete(InputRef, OutputRef),
    /// The click did nothing
    Ignore,
}

/// Observable result of a click, as reported by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A slot is now waiting for its counterpart
    Pending(SlotRef),
    /// A link was made
    Linked(InputRef, OutputRef),
    /// Nothing changed
    Ignored,
    /// The pending slot was dropped
    Cleared,
}

/// Two-click linking state: at most one slot waits for a counterpart
#[derive(Debug, Default)]
pub struct LinkGesture {
    pending: Option<SlotRef>,
}

impl LinkGesture {
    /// Create an idle gesture
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot waiting for a counterpart
    pub fn pending(&self) -> Option<SlotRef> {
        self.pending
    }

    /// Feed a slot click. `input_linked` tells whether the clicked slot is an
    /// input that currently holds a link.
    pub fn click(&mut self, slot: SlotRef, input_linked: bool) -> GestureAction {
        match (self.pending, slot) {
            (None, SlotRef::Input(input)) => {
                self.pending = Some(slot);
                GestureAction::Begin {
                    sever: input_linked.then_some(input),
                }
            }
            (None, SlotRef::Output(_)) => {
                self.pending = Some(slot);
                GestureAction::Begin { sever: None }
            }
            (Some(SlotRef::Input(input)), SlotRef::Output(output))
            | (Some(SlotRef::Output(output)), SlotRef::Input(input)) => {
                self.pending = None;
                GestureAction::Complete(input, output)
            }
            (Some(_), _) => GestureAction::Ignore,
        }
    }

    /// Drop the pending slot. Returns whether one was set.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}
