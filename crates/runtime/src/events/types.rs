//! Event payloads carried on the bus.

use serde::{Deserialize, Serialize};

use interaction_core::{EntityId, EventKind, InteractableEvent, InteractionEvent, Role};

use super::bus::Topic;

/// Executor event tagged with its interactor and the trust side that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractorEvent {
    pub interactor: EntityId,
    pub side: Role,
    pub event: InteractionEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Best-target found/lost transitions.
    Targeting(InteractorEvent),
    /// Started, completed and failed attempts, instant or channeled.
    Interaction(InteractorEvent),
    /// Channel progress.
    Channel(InteractorEvent),
    /// Status changes and triggers of authoritative interactables.
    Interactable {
        entity: EntityId,
        event: InteractableEvent,
    },
}

impl Event {
    /// Routes an executor event to the topic matching its kind.
    pub fn from_interaction(interactor: EntityId, side: Role, event: InteractionEvent) -> Self {
        let kind = event.kind();
        let tagged = InteractorEvent {
            interactor,
            side,
            event,
        };
        match kind {
            EventKind::TargetFound | EventKind::TargetLost => Event::Targeting(tagged),
            EventKind::Progress => Event::Channel(tagged),
            EventKind::Started | EventKind::Completed | EventKind::Failed => {
                Event::Interaction(tagged)
            }
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            Event::Targeting(_) => Topic::Targeting,
            Event::Interaction(_) => Topic::Interaction,
            Event::Channel(_) => Topic::Channel,
            Event::Interactable { .. } => Topic::Interactable,
        }
    }

    /// Executor payload, if this is an executor event.
    pub fn interactor_event(&self) -> Option<&InteractorEvent> {
        match self {
            Event::Targeting(inner) | Event::Interaction(inner) | Event::Channel(inner) => {
                Some(inner)
            }
            Event::Interactable { .. } => None,
        }
    }
}
