//! Spatial guard evaluation and witness binding.

use tileworld_core::{Attribute, CellCoord, KindCatalog, Offset, Rule, RuleId, SpriteId, WhenDo};
use tileworld_world::RoundState;

use crate::RuleClosure;

/// Outcome of evaluating one WhenDo guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The guard rejected the cell; the rule does not match.
    Fail,
    /// The guard accepted the cell, optionally binding an adjacent sprite.
    Pass {
        /// Sprite captured at the guard's cell.
        witness: Option<SpriteId>,
    },
}

/// Evaluates every guard of `rule` around `self_sprite`.
///
/// With a `collider`, movable-kind constraints see only that sprite, wherever
/// the guard lies, and the collider is the closure's sole witness.
pub(crate) fn evaluate_rule(
    catalog: &KindCatalog,
    state: &RoundState,
    rule_id: RuleId,
    rule: &Rule,
    self_sprite: SpriteId,
    collider: Option<SpriteId>,
) -> Option<RuleClosure> {
    let origin = state.cell_of(self_sprite)?;
    let mut witnesses: Vec<SpriteId> = collider.into_iter().collect();
    for (offset, when_do) in rule.when_dos() {
        match evaluate_when_do(catalog, state, when_do, offset, origin, self_sprite, collider) {
            Verdict::Fail => return None,
            Verdict::Pass { witness } => witnesses.extend(witness),
        }
    }
    Some(RuleClosure {
        rule: rule_id,
        self_sprite,
        witnesses,
    })
}

pub(crate) fn evaluate_when_do(
    catalog: &KindCatalog,
    state: &RoundState,
    when_do: &WhenDo,
    offset: Offset,
    origin: CellCoord,
    self_sprite: SpriteId,
    collider: Option<SpriteId>,
) -> Verdict {
    if when_do.is_vacuous() {
        return Verdict::Pass { witness: None };
    }
    let Some(target) = origin
        .at_offset(offset)
        .filter(|cell| state.contains(*cell))
    else {
        return Verdict::Fail;
    };

    let mut one_of = false;
    let mut one_of_passed = false;

    let tile = state.tile(target);
    for kind in catalog.fixed() {
        let present = tile == Some(kind);
        match when_do.attribute(kind) {
            Attribute::Exclude if present => return Verdict::Fail,
            Attribute::Include | Attribute::OneOf => {
                one_of = true;
                one_of_passed |= present;
            }
            Attribute::Exclude | Attribute::Ok => {}
        }
    }

    let adjacent = offset.is_adjacent();
    let excluding = offset.is_center().then_some(self_sprite);
    let mut capture = None;
    for kind in catalog.movable() {
        let attribute = when_do.attribute(kind);
        if attribute == Attribute::Ok {
            continue;
        }
        let witness = match collider {
            Some(collider) => (state.kind_of(collider) == Some(kind)).then_some(collider),
            None => state.live_sprite_at(kind, target, excluding),
        };
        if attribute.requires_presence() {
            one_of = true;
            if witness.is_some() {
                one_of_passed = true;
                if adjacent && capture.is_none() {
                    capture = witness;
                }
            }
        } else if witness.is_some() {
            return Verdict::Fail;
        }
    }

    if one_of && !one_of_passed {
        return Verdict::Fail;
    }
    Verdict::Pass {
        witness: if collider.is_none() { capture } else { None },
    }
}
