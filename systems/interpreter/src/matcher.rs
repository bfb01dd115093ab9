//! Candidate selection of (rule, sprite) pairs per phase.

use log::trace;
use tileworld_core::{PushInput, Rule, RuleId, RuleRepository, RuleType, SpriteId};
use tileworld_world::RoundState;

use crate::{guard, Phase, RuleClosure};

/// Rule identifiers split once into ordinary rules and always-firing resting rules.
#[derive(Clone, Debug, Default)]
pub(crate) struct RuleSet {
    ordinary: Vec<RuleId>,
    always_true_resting: Vec<RuleId>,
}

impl RuleSet {
    pub(crate) fn new<R: RuleRepository>(repository: &R) -> Self {
        let mut rules = Self::default();
        for id in repository.rule_ids() {
            let Some(rule) = repository.rule(id) else {
                continue;
            };
            if rule.rule_type() == RuleType::Resting && rule.is_always_true() {
                rules.always_true_resting.push(id);
            } else {
                rules.ordinary.push(id);
            }
        }
        rules
    }

    /// Rules not segregated as always-true resting rules, in declaration order.
    pub(crate) fn ordinary(&self) -> &[RuleId] {
        &self.ordinary
    }

    /// Reports whether `id` was segregated as an always-true resting rule.
    pub(crate) fn is_always_true_resting(&self, id: RuleId) -> bool {
        self.always_true_resting.contains(&id)
    }

    /// Closures of every rule that fires in `phase`, against the current state.
    pub(crate) fn collect<R: RuleRepository>(
        &self,
        repository: &R,
        state: &RoundState,
        phase: Phase,
        pressed: &[PushInput],
        dirty_filter: bool,
    ) -> Vec<RuleClosure> {
        let sprites = state.sprite_ids();
        let mut closures = Vec::new();
        for &sprite in &sprites {
            if eligible(state, sprite, phase, dirty_filter) {
                match_into(
                    repository,
                    state,
                    &self.ordinary,
                    phase,
                    pressed,
                    sprite,
                    &mut closures,
                );
            }
        }

        if phase == Phase::Resting {
            for &sprite in &sprites {
                if state.is_alive(sprite) && state.is_settled(sprite) {
                    match_into(
                        repository,
                        state,
                        &self.always_true_resting,
                        phase,
                        pressed,
                        sprite,
                        &mut closures,
                    );
                }
            }
        }
        closures
    }
}

fn match_into<R: RuleRepository>(
    repository: &R,
    state: &RoundState,
    rules: &[RuleId],
    phase: Phase,
    pressed: &[PushInput],
    sprite: SpriteId,
    out: &mut Vec<RuleClosure>,
) {
    let Some(kind) = state.kind_of(sprite) else {
        return;
    };
    for &id in rules {
        let Some(rule) = repository.rule(id) else {
            continue;
        };
        if !rule.applies_to(kind) || !selects(rule, phase, state, sprite, pressed) {
            continue;
        }
        if let Some(closure) =
            guard::evaluate_rule(repository.catalog(), state, id, rule, sprite, None)
        {
            trace!("{phase:?}: rule {} fires for sprite {}", id.get(), sprite.get());
            out.push(closure);
        }
    }
}

fn eligible(state: &RoundState, sprite: SpriteId, phase: Phase, dirty_filter: bool) -> bool {
    if !state.is_alive(sprite) {
        return false;
    }
    match phase {
        Phase::Moving => state.direction(sprite).is_some(),
        Phase::Resting => {
            state.is_settled(sprite)
                && (!dirty_filter
                    || state.rested_last_round(sprite)
                    || state
                        .cell_of(sprite)
                        .is_some_and(|cell| state.changed_near(cell)))
        }
        Phase::Pushing => state.is_settled(sprite),
    }
}

fn selects(
    rule: &Rule,
    phase: Phase,
    state: &RoundState,
    sprite: SpriteId,
    pressed: &[PushInput],
) -> bool {
    match phase {
        Phase::Moving => {
            rule.rule_type() == RuleType::Moving
                && rule.direction().is_some()
                && state.direction(sprite) == rule.direction()
        }
        Phase::Resting => rule.rule_type() == RuleType::Resting,
        Phase::Pushing => {
            rule.rule_type() == RuleType::Pushing && pressed.contains(&rule.input())
        }
    }
}
