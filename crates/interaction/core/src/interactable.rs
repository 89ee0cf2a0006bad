//! The capability a target object exposes to the interaction system.
//!
//! [`Interactable`] is the minimal target-side state machine: an enabled flag
//! that gates both detection and execution, an ordered option list, a scoring
//! priority, and an optional handler bound by owning code.

use crate::events::{Observers, SubscriptionId};
use crate::types::{EntityId, InteractionContext, InteractionOption, InteractionResult, InteractionTag};

/// Callback invoked when an interaction with the owning object is executed.
///
/// Handlers run synchronously inside [`Interactable::interact`]; the returned
/// code becomes the interaction result.
pub trait InteractionHandler: Send {
    fn handle(&mut self, interactor: EntityId, kind: &InteractionTag) -> InteractionResult;
}

impl<F> InteractionHandler for F
where
    F: FnMut(EntityId, &InteractionTag) -> InteractionResult + Send,
{
    fn handle(&mut self, interactor: EntityId, kind: &InteractionTag) -> InteractionResult {
        self(interactor, kind)
    }
}

/// Events published by an [`Interactable`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractableEvent {
    /// Emitted only on an actual flip of the enabled flag.
    StatusChanged { enabled: bool },
    /// A successful interaction with the resolved type.
    Triggered {
        interactor: EntityId,
        kind: InteractionTag,
    },
}

pub struct Interactable {
    enabled: bool,
    options: Vec<InteractionOption>,
    priority: i32,
    handler: Option<Box<dyn InteractionHandler>>,
    observers: Observers<InteractableEvent>,
}

impl Interactable {
    pub fn new(options: Vec<InteractionOption>) -> Self {
        Self {
            enabled: true,
            options,
            priority: 0,
            handler: None,
            observers: Observers::new(),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_handler(mut self, handler: impl InteractionHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Starts disabled; no status event is emitted for the initial state.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Raw configured options regardless of the enabled flag.
    pub fn configured_options(&self) -> &[InteractionOption] {
        &self.options
    }

    /// Options offered to `interactor`; empty while disabled.
    ///
    /// The caller decides which option to invoke.
    pub fn options_for(&self, _interactor: Option<EntityId>) -> Vec<InteractionOption> {
        if !self.enabled {
            return Vec::new();
        }
        self.options.clone()
    }

    /// Precondition for approaching or interacting with this object.
    ///
    /// Extension point for richer checks; currently enabled + known interactor.
    pub fn can_interact(&self, interactor: Option<EntityId>, _context: &InteractionContext) -> bool {
        self.enabled && interactor.is_some()
    }

    /// Executes an interaction.
    ///
    /// An unset `kind` resolves to the first configured option. A set `kind`
    /// must match a configured option exactly.
    pub fn interact(
        &mut self,
        interactor: Option<EntityId>,
        kind: Option<&InteractionTag>,
    ) -> InteractionResult {
        let Some(interactor) = interactor else {
            return InteractionResult::NotAllowed;
        };
        if !self.enabled {
            return InteractionResult::NotAllowed;
        }

        let Some(resolved) = self.resolve_kind(kind) else {
            return InteractionResult::Failed;
        };

        let result = match self.handler.as_mut() {
            Some(handler) => handler.handle(interactor, &resolved),
            None => InteractionResult::Success,
        };

        if result.is_success() {
            self.observers.emit(&InteractableEvent::Triggered {
                interactor,
                kind: resolved,
            });
        }
        result
    }

    fn resolve_kind(&self, kind: Option<&InteractionTag>) -> Option<InteractionTag> {
        let resolved = match kind {
            Some(kind) => kind,
            None => &self.options.first()?.kind,
        };
        self.options
            .iter()
            .any(|option| &option.kind == resolved)
            .then(|| resolved.clone())
    }

    pub fn enable(&mut self) {
        self.set_enabled(true);
    }

    pub fn disable(&mut self) {
        self.set_enabled(false);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.observers
                .emit(&InteractableEvent::StatusChanged { enabled });
        }
    }

    pub fn set_options(&mut self, options: Vec<InteractionOption>) {
        self.options = options;
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn set_handler(&mut self, handler: impl InteractionHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    pub fn clear_handler(&mut self) {
        self.handler = None;
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&InteractableEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl std::fmt::Debug for Interactable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interactable")
            .field("enabled", &self.enabled)
            .field("options", &self.options)
            .field("priority", &self.priority)
            .field("handler", &self.handler.is_some())
            .field("observers", &self.observers)
            .finish()
    }
}
