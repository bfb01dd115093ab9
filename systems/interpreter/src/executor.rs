//! Turns the commands of accepted rule closures into world commands.

use tileworld_core::{CellCoord, Command, Offset, Rule, SpriteArg, SpriteId, WorldCommand};
use tileworld_world::RoundState;

use crate::{policy::ConflictPolicy, RuleClosure};

/// Emits the world commands of every command of `rule` for `closure`,
/// position by position.
///
/// `out` must only hold commands of this closure, since a Move consults the
/// moves already emitted into it as well as the pending moves of `state`.
pub(crate) fn execute<P: ConflictPolicy>(
    rule: &Rule,
    closure: &RuleClosure,
    state: &RoundState,
    policy: &mut P,
    out: &mut Vec<WorldCommand>,
) {
    let Some(origin) = state.cell_of(closure.self_sprite) else {
        return;
    };
    let colliding = rule.rule_type().is_colliding();

    for (offset, when_do) in rule.when_dos() {
        if !when_do.has_commands() {
            continue;
        }
        let target = origin.at_offset(offset);
        for command in when_do.commands() {
            match command {
                Command::Paint(kind) => {
                    if let Some(cell) = target {
                        out.push(WorldCommand::Paint { cell, kind });
                    }
                }
                Command::Move(arg) => {
                    let Some(actor) = acting_sprite(state, closure, offset, target, colliding)
                    else {
                        continue;
                    };
                    if !has_pending(state, out, actor) || colliding || policy.replace_pending() {
                        out.push(WorldCommand::SetPending { sprite: actor, arg });
                    }
                }
                Command::Sprite(SpriteArg::Remove) => {
                    if let Some(actor) = acting_sprite(state, closure, offset, target, colliding) {
                        out.push(WorldCommand::MarkDead { sprite: actor });
                    }
                }
                Command::Game(_) | Command::SpritePred(_) => {
                    if let Some(instruction) = command.as_global() {
                        out.push(WorldCommand::QueueGlobal { instruction });
                    }
                }
            }
        }
    }
}

fn has_pending(state: &RoundState, emitted: &[WorldCommand], actor: SpriteId) -> bool {
    state.pending(actor).is_some()
        || emitted.iter().any(|command| {
            matches!(command, WorldCommand::SetPending { sprite, .. } if *sprite == actor)
        })
}

/// Sprite a Move or Sprite command at `offset` acts on.
fn acting_sprite(
    state: &RoundState,
    closure: &RuleClosure,
    offset: Offset,
    target: Option<CellCoord>,
    colliding: bool,
) -> Option<SpriteId> {
    if offset.is_center() {
        return Some(closure.self_sprite);
    }
    if colliding {
        return closure.witnesses.first().copied();
    }
    let target = target?;
    closure
        .witnesses
        .iter()
        .copied()
        .find(|witness| state.cell_of(*witness) == Some(target))
}
