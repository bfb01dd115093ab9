//! Declarative rule data and the repository contract the interpreter consumes.

use serde::{Deserialize, Serialize};

use crate::{Kind, KindCatalog, MoveDirection, Offset, DIAMOND_CELLS};

/// Number of command slots attached to a single WhenDo.
pub const COMMAND_SLOTS: usize = 4;

/// Unique identifier assigned to a rule by its repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(u32);

impl RuleId {
    /// Creates a new rule identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Situation in which a rule is considered for a sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    /// Applies to sprites that are standing still.
    Resting,
    /// Applies to sprites that moved in the rule's direction last round.
    Moving,
    /// Applies while the player presses the rule's direction.
    Pushing,
    /// Applies when a moving sprite runs into a resting or oncoming sprite.
    CollidingResting,
    /// Applies when a moving sprite crosses paths with another moving sprite.
    CollidingMoving,
}

impl RuleType {
    /// Reports whether the rule is driven by the collision pass.
    #[must_use]
    pub const fn is_colliding(self) -> bool {
        matches!(self, Self::CollidingResting | Self::CollidingMoving)
    }
}

/// Constraint a WhenDo places on one kind at its cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// No constraint.
    #[default]
    Ok,
    /// The kind must be present.
    Include,
    /// The kind must be absent.
    Exclude,
    /// One of the kinds tagged this way must be present.
    OneOf,
}

impl Attribute {
    /// Reports whether the attribute demands presence.
    ///
    /// `Include` and `OneOf` are evaluated identically: a guard with several
    /// presence tags passes when any one of them matches.
    #[must_use]
    pub const fn requires_presence(self) -> bool {
        matches!(self, Self::Include | Self::OneOf)
    }
}

/// Argument of a [`Command::Move`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveArg {
    /// Start moving left.
    Left,
    /// Start moving right.
    Right,
    /// Start moving up.
    Up,
    /// Start moving down.
    Down,
    /// Come to a halt.
    Stop,
    /// Reverse the last committed direction.
    UTurn,
}

impl MoveArg {
    /// Direction requested by the argument, if it starts a move.
    #[must_use]
    pub const fn direction(self) -> Option<MoveDirection> {
        match self {
            Self::Left => Some(MoveDirection::Left),
            Self::Right => Some(MoveDirection::Right),
            Self::Up => Some(MoveDirection::Up),
            Self::Down => Some(MoveDirection::Down),
            Self::Stop | Self::UTurn => None,
        }
    }
}

impl From<MoveDirection> for MoveArg {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Left => Self::Left,
            MoveDirection::Right => Self::Right,
            MoveDirection::Up => Self::Up,
            MoveDirection::Down => Self::Down,
        }
    }
}

/// Input a rule is keyed on: a direction or the A button.
///
/// Moving and colliding rules compare their input against a travel direction,
/// so only Pushing rules ever fire on [`PushInput::A`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PushInput {
    /// Left on the pad.
    Left,
    /// Right on the pad.
    Right,
    /// Up on the pad.
    Up,
    /// Down on the pad.
    Down,
    /// The A button.
    A,
}

impl PushInput {
    /// Direction the input stands for, if it is one of the pad directions.
    #[must_use]
    pub const fn direction(self) -> Option<MoveDirection> {
        match self {
            Self::Left => Some(MoveDirection::Left),
            Self::Right => Some(MoveDirection::Right),
            Self::Up => Some(MoveDirection::Up),
            Self::Down => Some(MoveDirection::Down),
            Self::A => None,
        }
    }
}

impl From<MoveDirection> for PushInput {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Left => Self::Left,
            MoveDirection::Right => Self::Right,
            MoveDirection::Up => Self::Up,
            MoveDirection::Down => Self::Down,
        }
    }
}

/// Argument of a [`Command::Sprite`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteArg {
    /// Remove the sprite from the world at the end of the round.
    Remove,
}

/// Argument of a [`Command::Game`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameArg {
    /// The player wins.
    Win,
    /// The player loses.
    Lose,
}

/// Instruction stored in a WhenDo command slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Sets the pending move of the sprite bound at the WhenDo's position.
    Move(MoveArg),
    /// Paints the WhenDo's cell with a fixed kind.
    Paint(Kind),
    /// Acts on the sprite bound at the WhenDo's position.
    Sprite(SpriteArg),
    /// Changes the game status at commit time.
    Game(GameArg),
    /// Skips the next global instruction when a live sprite of the kind exists.
    SpritePred(Kind),
}

impl Command {
    /// Converts the command into a global instruction, if it is one.
    #[must_use]
    pub const fn as_global(self) -> Option<GlobalInstruction> {
        match self {
            Self::Game(arg) => Some(GlobalInstruction::Game(arg)),
            Self::SpritePred(kind) => Some(GlobalInstruction::SpritePred(kind)),
            Self::Move(_) | Self::Paint(_) | Self::Sprite(_) => None,
        }
    }
}

/// Instruction queued during a round and executed in order at commit time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalInstruction {
    /// Sets a terminal game status.
    Game(GameArg),
    /// Skips the following instruction when a live sprite of the kind exists.
    SpritePred(Kind),
}

/// Guard and command payload attached to one diamond position of a rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhenDo {
    attributes: Vec<Attribute>,
    commands: [Option<Command>; COMMAND_SLOTS],
}

impl WhenDo {
    /// Creates a WhenDo that places no constraint on any of `kind_count` kinds.
    #[must_use]
    pub fn new(kind_count: usize) -> Self {
        Self {
            attributes: vec![Attribute::Ok; kind_count],
            commands: [None; COMMAND_SLOTS],
        }
    }

    /// Attribute recorded for `kind`; kinds never set read as [`Attribute::Ok`].
    #[must_use]
    pub fn attribute(&self, kind: Kind) -> Attribute {
        self.attributes
            .get(kind.index())
            .copied()
            .unwrap_or_default()
    }

    /// Records the attribute for `kind`.
    pub fn set_attribute(&mut self, kind: Kind, attribute: Attribute) {
        let index = kind.index();
        if index >= self.attributes.len() {
            self.attributes.resize(index + 1, Attribute::Ok);
        }
        self.attributes[index] = attribute;
    }

    /// Resets every attribute to [`Attribute::Ok`].
    pub fn clear_attributes(&mut self) {
        self.attributes.fill(Attribute::Ok);
    }

    /// Reports whether the guard constrains nothing.
    #[must_use]
    pub fn is_vacuous(&self) -> bool {
        self.attributes.iter().all(|attribute| *attribute == Attribute::Ok)
    }

    /// Command stored in `slot`, if any.
    #[must_use]
    pub fn command(&self, slot: usize) -> Option<Command> {
        self.commands.get(slot).copied().flatten()
    }

    /// Stores `command` in `slot`; slots beyond [`COMMAND_SLOTS`] are ignored.
    pub fn set_command(&mut self, slot: usize, command: Option<Command>) {
        if let Some(entry) = self.commands.get_mut(slot) {
            *entry = command;
        }
    }

    /// Removes the command in `slot`, shifting later commands forward.
    pub fn remove_command(&mut self, slot: usize) {
        if slot >= COMMAND_SLOTS {
            return;
        }
        self.commands[slot..].rotate_left(1);
        self.commands[COMMAND_SLOTS - 1] = None;
    }

    /// Commands in execution order, ending at the first empty slot.
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.commands.iter().map_while(|command| *command)
    }

    /// Reports whether the first slot holds a command.
    #[must_use]
    pub fn has_commands(&self) -> bool {
        self.commands[0].is_some()
    }
}

/// Declarative when/do unit scoped to a set of kinds, a type and a direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    kinds: Vec<Kind>,
    rule_type: RuleType,
    input: PushInput,
    when_dos: [Option<WhenDo>; DIAMOND_CELLS],
}

impl Rule {
    /// Creates a rule without any WhenDo.
    #[must_use]
    pub fn new(kinds: Vec<Kind>, rule_type: RuleType, input: impl Into<PushInput>) -> Self {
        Self {
            kinds,
            rule_type,
            input: input.into(),
            when_dos: Default::default(),
        }
    }

    /// Kinds the rule applies to.
    #[must_use]
    pub fn kinds(&self) -> &[Kind] {
        &self.kinds
    }

    /// Replaces the kinds the rule applies to.
    pub fn set_kinds(&mut self, kinds: Vec<Kind>) {
        self.kinds = kinds;
    }

    /// Reports whether the rule applies to sprites of `kind`.
    #[must_use]
    pub fn applies_to(&self, kind: Kind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Situation in which the rule is considered.
    #[must_use]
    pub const fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Input the rule is keyed on. Resting rules ignore it.
    #[must_use]
    pub const fn input(&self) -> PushInput {
        self.input
    }

    /// Direction the rule is keyed on, or `None` for an A-button rule.
    #[must_use]
    pub const fn direction(&self) -> Option<MoveDirection> {
        self.input.direction()
    }

    /// WhenDo attached at `offset`, if any.
    #[must_use]
    pub fn when_do(&self, offset: Offset) -> Option<&WhenDo> {
        self.when_dos[offset.index()].as_ref()
    }

    /// Mutable WhenDo attached at `offset`, if any.
    pub fn when_do_mut(&mut self, offset: Offset) -> Option<&mut WhenDo> {
        self.when_dos[offset.index()].as_mut()
    }

    /// WhenDo at `offset`, created without constraints when missing.
    pub fn when_do_or_insert(&mut self, offset: Offset, kind_count: usize) -> &mut WhenDo {
        self.when_dos[offset.index()].get_or_insert_with(|| WhenDo::new(kind_count))
    }

    /// Detaches the WhenDo at `offset`.
    pub fn remove_when_do(&mut self, offset: Offset) -> Option<WhenDo> {
        self.when_dos[offset.index()].take()
    }

    /// Attached WhenDos paired with their offsets, in diamond order.
    pub fn when_dos(&self) -> impl Iterator<Item = (Offset, &WhenDo)> + '_ {
        Offset::ALL
            .iter()
            .filter_map(|offset| self.when_do(*offset).map(|when_do| (*offset, when_do)))
    }

    /// Reports whether no WhenDo of the rule constrains anything.
    #[must_use]
    pub fn is_always_true(&self) -> bool {
        self.when_dos().all(|(_, when_do)| when_do.is_vacuous())
    }
}

/// Read/write access to authored rules, as provided by the authoring side.
pub trait RuleRepository {
    /// Kind catalog the rules are expressed against.
    fn catalog(&self) -> &KindCatalog;

    /// Kind controlled by the player, if one is designated.
    fn player(&self) -> Option<Kind>;

    /// Identifiers of every rule in declaration order.
    fn rule_ids(&self) -> Vec<RuleId>;

    /// Looks up a rule.
    fn rule(&self, id: RuleId) -> Option<&Rule>;

    /// Looks up a rule for editing.
    fn rule_mut(&mut self, id: RuleId) -> Option<&mut Rule>;

    /// Creates an empty rule for a single kind and returns its identifier.
    fn make_rule(
        &mut self,
        kind: Kind,
        rule_type: RuleType,
        input: impl Into<PushInput>,
    ) -> RuleId;

    /// Deletes a rule, returning it when it existed.
    fn remove_rule(&mut self, id: RuleId) -> Option<Rule>;
}
