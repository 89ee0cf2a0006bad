//! Observer lists and the events the executor emits.
//!
//! Subscribers register and unregister explicitly. Delivery is synchronous
//! with the emitting call and follows subscription order.

use strum::EnumDiscriminants;

use crate::types::{EntityId, InteractionContext, InteractionResult};

/// Handle returned by [`Observers::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of callbacks for one event type.
pub struct Observers<E> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.entries.len())
            .finish()
    }
}

/// Events emitted by an [`Interactor`](crate::Interactor).
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKind), derive(Hash, strum::Display))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractionEvent {
    /// A new best target was selected.
    TargetFound { target: EntityId },
    /// The previous best target is no longer the best.
    TargetLost { target: EntityId },
    Started { context: InteractionContext },
    Completed {
        context: InteractionContext,
        result: InteractionResult,
    },
    Failed {
        context: InteractionContext,
        result: InteractionResult,
    },
    /// Channeled progress in `[0, 1]`.
    Progress {
        target: Option<EntityId>,
        progress: f32,
    },
}

impl InteractionEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from(self)
    }

    /// Builds the terminal event matching `result`.
    pub fn outcome(context: InteractionContext, result: InteractionResult) -> Self {
        if result.is_success() {
            Self::Completed { context, result }
        } else {
            Self::Failed { context, result }
        }
    }

    /// Returns true for the completed/failed pair.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

impl Observers<InteractionEvent> {
    /// Subscribes to a single event kind.
    pub fn subscribe_kind(
        &mut self,
        kind: EventKind,
        mut callback: impl FnMut(&InteractionEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribe(move |event| {
            if event.kind() == kind {
                callback(event);
            }
        })
    }
}
