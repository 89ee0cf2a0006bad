use crate::types::{EntityId, InteractionTag};
use crate::world::World;

/// What a presentation layer would show for the current target.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prompt {
    pub target: EntityId,
    pub text: String,
    pub kind: InteractionTag,
    pub requires_hold: bool,
}

impl Prompt {
    pub const FALLBACK_TEXT: &'static str = "Interact";

    /// Built from the first offered option; `None` when nothing is offered.
    pub fn for_target(world: &World, target: EntityId) -> Option<Self> {
        let options = world.interactable(target)?.options_for(None);
        let first = options.into_iter().next()?;
        let text = if first.display_text.is_empty() {
            Self::FALLBACK_TEXT.to_owned()
        } else {
            first.display_text
        };
        Some(Self {
            target,
            text,
            kind: first.kind,
            requires_hold: first.requires_hold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactable::Interactable;
    use crate::types::InteractionOption;
    use crate::world::{Placement, WorldObject};
    use glam::Vec3;

    fn spawn(world: &mut World, interactable: Interactable) -> EntityId {
        world.spawn(WorldObject::new(Placement::at(Vec3::ZERO)).with_interactable(interactable)).unwrap()
    }

    #[test]
    fn uses_first_option_text() {
        let mut world = World::new();
        let door = spawn(
            &mut world,
            Interactable::new(vec![
                InteractionOption::new(InteractionTag::OPEN, "Open Door").hold(),
                InteractionOption::new(InteractionTag::USE, "Knock"),
            ]),
        );

        let prompt = Prompt::for_target(&world, door).unwrap();
        assert_eq!(prompt.text, "Open Door");
        assert_eq!(prompt.kind, InteractionTag::OPEN);
        assert!(prompt.requires_hold);
    }

    #[test]
    fn empty_text_falls_back() {
        let mut world = World::new();
        let lever = spawn(
            &mut world,
            Interactable::new(vec![InteractionOption::new(InteractionTag::USE, "")]),
        );
        assert_eq!(Prompt::for_target(&world, lever).unwrap().text, "Interact");
    }

    #[test]
    fn nothing_to_show() {
        let mut world = World::new();
        let bare = spawn(&mut world, Interactable::new(Vec::new()));
        let off = spawn(
            &mut world,
            Interactable::new(vec![InteractionOption::new(InteractionTag::USE, "Use")]).disabled(),
        );
        let rock = world.spawn(WorldObject::new(Placement::at(Vec3::ZERO))).unwrap();

        assert_eq!(Prompt::for_target(&world, bare), None);
        assert_eq!(Prompt::for_target(&world, off), None);
        assert_eq!(Prompt::for_target(&world, rock), None);
        assert_eq!(Prompt::for_target(&world, EntityId(99)), None);
    }
}
