//! Detection of sprites running into each other because of this round's moves.

use log::trace;
use tileworld_core::{CellCoord, MoveDirection, RuleId, RuleRepository, RuleType, SpriteId};
use tileworld_world::RoundState;

use crate::{guard, RuleClosure};

/// Closures of the collision rules triggered by the pending moves.
///
/// For each moving sprite and each matching collision rule the search stops
/// at the first colliding sprite whose closure passes the rule's guards.
pub(crate) fn detect<R: RuleRepository>(
    repository: &R,
    rules: &[RuleId],
    state: &RoundState,
) -> Vec<RuleClosure> {
    let sprites = state.sprite_ids();
    let mut closures = Vec::new();

    for &mover in &sprites {
        if !state.is_alive(mover) {
            continue;
        }
        let Some(direction) = state.pending_direction(mover) else {
            continue;
        };
        let (Some(kind), Some(origin)) = (state.kind_of(mover), state.cell_of(mover)) else {
            continue;
        };
        let Some(target) = origin.step(direction) else {
            continue;
        };

        for &id in rules {
            let Some(rule) = repository.rule(id) else {
                continue;
            };
            if !rule.rule_type().is_colliding()
                || !rule.applies_to(kind)
                || rule.direction() != Some(direction)
            {
                continue;
            }
            for &other in &sprites {
                if other == mover
                    || !state.is_alive(other)
                    || !collides(state, rule.rule_type(), direction, target, other)
                {
                    continue;
                }
                let closure = guard::evaluate_rule(
                    repository.catalog(),
                    state,
                    id,
                    rule,
                    mover,
                    Some(other),
                );
                if let Some(closure) = closure {
                    trace!(
                        "rule {} collides sprite {} with sprite {}",
                        id.get(),
                        mover.get(),
                        other.get()
                    );
                    closures.push(closure);
                    break;
                }
            }
        }
    }
    closures
}

/// Reports whether `other` collides with a sprite moving in `direction` into `target`.
fn collides(
    state: &RoundState,
    rule_type: RuleType,
    direction: MoveDirection,
    target: CellCoord,
    other: SpriteId,
) -> bool {
    let Some(cell) = state.cell_of(other) else {
        return false;
    };
    let heading = state.pending_direction(other);
    let oncoming = heading == Some(direction.opposite());

    if cell == target {
        return match rule_type {
            RuleType::CollidingResting => heading.is_none() || oncoming,
            RuleType::CollidingMoving => oncoming,
            RuleType::Resting | RuleType::Moving | RuleType::Pushing => false,
        };
    }
    if rule_type != RuleType::CollidingMoving {
        return false;
    }
    let Some(heading) = heading else {
        return false;
    };
    [direction.rotate_left(), direction.rotate_right(), direction]
        .into_iter()
        .any(|rotated| target.step(rotated) == Some(cell) && heading == rotated.opposite())
}
