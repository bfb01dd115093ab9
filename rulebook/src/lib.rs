#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory rule storage backing the Tileworld interpreter.

use std::collections::BTreeMap;

use log::debug;
use tileworld_core::{
    Kind, KindCatalog, Offset, PushInput, Rule, RuleId, RuleRepository, RuleType, WhenDo,
};

/// Authored rules keyed by identifier, in declaration order.
#[derive(Clone, Debug)]
pub struct RuleBook {
    catalog: KindCatalog,
    player: Option<Kind>,
    rules: BTreeMap<RuleId, Rule>,
    next_rule_id: RuleId,
}

impl RuleBook {
    /// Creates an empty rule book over the provided kind catalog.
    #[must_use]
    pub fn new(catalog: KindCatalog) -> Self {
        Self {
            catalog,
            player: None,
            rules: BTreeMap::new(),
            next_rule_id: RuleId::new(0),
        }
    }

    /// Designates the kind controlled by the player.
    pub fn set_player(&mut self, player: Option<Kind>) {
        self.player = player;
    }

    /// Number of rules in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Reports whether the book holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that apply to `kind`, in declaration order.
    #[must_use]
    pub fn rules_for_kind(&self, kind: Kind) -> Vec<RuleId> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.applies_to(kind))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Rules that apply to `kind` with the given type and input.
    ///
    /// Resting rules match regardless of `input`.
    #[must_use]
    pub fn rules_for(
        &self,
        kind: Kind,
        rule_type: RuleType,
        input: impl Into<PushInput>,
    ) -> Vec<RuleId> {
        let input = input.into();
        self.rules
            .iter()
            .filter(|(_, rule)| {
                rule.applies_to(kind)
                    && rule.rule_type() == rule_type
                    && (rule_type == RuleType::Resting || rule.input() == input)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Lets an existing rule apply to one more kind.
    ///
    /// Returns `false` when the rule does not exist.
    pub fn add_kind(&mut self, id: RuleId, kind: Kind) -> bool {
        let Some(rule) = self.rule_mut(id) else {
            return false;
        };
        if !rule.applies_to(kind) {
            let mut kinds = rule.kinds().to_vec();
            kinds.push(kind);
            rule.set_kinds(kinds);
        }
        true
    }

    /// Stops an existing rule from applying to `kind`.
    ///
    /// Returns `false` when the rule does not exist.
    pub fn remove_kind(&mut self, id: RuleId, kind: Kind) -> bool {
        let Some(rule) = self.rule_mut(id) else {
            return false;
        };
        let kinds = rule
            .kinds()
            .iter()
            .copied()
            .filter(|candidate| *candidate != kind)
            .collect();
        rule.set_kinds(kinds);
        true
    }

    /// WhenDo of a rule at `offset`, created with every attribute `Ok` when missing.
    pub fn when_do_or_insert(&mut self, id: RuleId, offset: Offset) -> Option<&mut WhenDo> {
        let kind_count = self.catalog.len();
        self.rule_mut(id)
            .map(|rule| rule.when_do_or_insert(offset, kind_count))
    }
}

impl RuleRepository for RuleBook {
    fn catalog(&self) -> &KindCatalog {
        &self.catalog
    }

    fn player(&self) -> Option<Kind> {
        self.player
    }

    fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.keys().copied().collect()
    }

    fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    fn rule_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
        self.rules.get_mut(&id)
    }

    fn make_rule(
        &mut self,
        kind: Kind,
        rule_type: RuleType,
        input: impl Into<PushInput>,
    ) -> RuleId {
        let input = input.into();
        let id = self.next_rule_id;
        self.next_rule_id = RuleId::new(id.get().saturating_add(1));
        let _ = self
            .rules
            .insert(id, Rule::new(vec![kind], rule_type, input));
        debug!("rule {} created: {rule_type:?} {input:?} for {kind:?}", id.get());
        id
    }

    fn remove_rule(&mut self, id: RuleId) -> Option<Rule> {
        let removed = self.rules.remove(&id);
        if removed.is_some() {
            debug!("rule {} removed", id.get());
        }
        removed
    }
}
