//! Authoritative sprite storage indexed by identifier and by kind.

use std::collections::BTreeMap;

use tileworld_core::{Kind, MoveArg, MoveDirection, Position, SpriteId};

/// State of a single sprite stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Sprite {
    /// Identifier allocated by the world for the sprite.
    pub(crate) id: SpriteId,
    /// Movable kind of the sprite.
    pub(crate) kind: Kind,
    /// Continuous center position.
    pub(crate) position: Position,
    /// Direction committed by the previous round.
    pub(crate) direction: Option<MoveDirection>,
    /// Move instruction accumulated during the current round.
    pub(crate) pending: Option<MoveArg>,
    /// Cleared once a rule removes the sprite.
    pub(crate) alive: bool,
}

impl Sprite {
    /// Reports whether a directional move was issued this round.
    pub(crate) fn is_moving(&self) -> bool {
        self.pending.and_then(MoveArg::direction).is_some()
    }

    /// Direction the sprite commits to once the pending instruction is applied.
    pub(crate) fn resolved_direction(&self) -> Option<MoveDirection> {
        match self.pending? {
            MoveArg::Stop => None,
            MoveArg::UTurn => self.direction.map(MoveDirection::opposite),
            directional => directional.direction(),
        }
    }
}

/// Registry that stores sprites and manages identifier allocation.
#[derive(Debug, Default)]
pub(crate) struct SpriteRegistry {
    entries: BTreeMap<SpriteId, Sprite>,
    buckets: BTreeMap<Kind, Vec<SpriteId>>,
    next_sprite_id: u32,
}

impl SpriteRegistry {
    /// Creates an empty registry with one bucket per movable kind.
    pub(crate) fn new(kinds: impl Iterator<Item = Kind>) -> Self {
        Self {
            entries: BTreeMap::new(),
            buckets: kinds.map(|kind| (kind, Vec::new())).collect(),
            next_sprite_id: 0,
        }
    }

    /// Stores a resting sprite and returns its identifier.
    pub(crate) fn spawn(&mut self, kind: Kind, position: Position) -> SpriteId {
        let id = SpriteId::new(self.next_sprite_id);
        self.next_sprite_id = self.next_sprite_id.saturating_add(1);
        let sprite = Sprite {
            id,
            kind,
            position,
            direction: None,
            pending: None,
            alive: true,
        };
        let _ = self.entries.insert(id, sprite);
        self.buckets.entry(kind).or_default().push(id);
        id
    }

    /// Removes the sprite from its bucket and the registry.
    pub(crate) fn remove(&mut self, id: SpriteId) -> Option<Sprite> {
        let sprite = self.entries.remove(&id)?;
        if let Some(bucket) = self.buckets.get_mut(&sprite.kind) {
            bucket.retain(|candidate| *candidate != id);
        }
        Some(sprite)
    }

    pub(crate) fn get(&self, id: SpriteId) -> Option<&Sprite> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.entries.get_mut(&id)
    }

    /// Identifiers of the sprites of `kind` in insertion order.
    pub(crate) fn bucket(&self, kind: Kind) -> &[SpriteId] {
        self.buckets
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every sprite, kind bucket by kind bucket, in insertion order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Sprite> + '_ {
        self.buckets
            .values()
            .flatten()
            .filter_map(|id| self.entries.get(id))
    }

    /// Mutable access to every sprite; the order is unspecified.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sprite> + '_ {
        self.entries.values_mut()
    }
}
