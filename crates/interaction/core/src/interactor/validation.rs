//! Checks applied identically on every trust side before execution.
use crate::error::ValidationError;
use crate::types::InteractionContext;
use crate::world::World;

/// Validates `context` against the live world.
///
/// Order: target live, target enabled, distance within `max_distance`,
/// target precondition. The first failure wins.
pub fn validate(
    world: &World,
    context: &InteractionContext,
    max_distance: f32,
) -> Result<(), ValidationError> {
    let interactor = context.interactor;
    let target = context.target.ok_or(ValidationError::NoTarget)?;
    if !world.is_live(target) {
        return Err(ValidationError::TargetMissing { target });
    }

    let interactable = world
        .interactable(target)
        .filter(|interactable| interactable.is_enabled())
        .ok_or(ValidationError::Disabled { target })?;

    let distance = world
        .distance(interactor, target)
        .ok_or(ValidationError::InteractorMissing { interactor })?;
    if distance > max_distance {
        return Err(ValidationError::OutOfRange {
            target,
            distance,
            limit: max_distance,
        });
    }

    if !interactable.can_interact(Some(interactor), context) {
        return Err(ValidationError::Rejected { target });
    }
    Ok(())
}
