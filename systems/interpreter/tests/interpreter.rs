use std::time::Duration;

use tileworld_core::{
    Attribute, CellCoord, Command, Event, GameArg, GameStatus, Grid, Kind, KindCatalog, MoveArg,
    MoveDirection, Offset, PushInput, RuleId, RuleRepository, RuleType, SpriteArg, SpriteSnapshot,
};
use tileworld_rulebook::RuleBook;
use tileworld_system_interpreter::{Config, Interpreter, KeepFirst, TakeLast};
use tileworld_world::{self as world, query, World, WorldError};

const FLOOR: Kind = Kind::new(0);
const WALL: Kind = Kind::new(1);
const HERO: Kind = Kind::new(2);
const GEM: Kind = Kind::new(3);
const ROCK: Kind = Kind::new(4);

const PERIOD: Duration = Duration::from_millis(150);

fn catalog() -> KindCatalog {
    KindCatalog::new(2, 3)
}

fn world_from(rows: &[&str]) -> World {
    world_with_config(rows, world::Config::default())
}

fn world_with_config(rows: &[&str], config: world::Config) -> World {
    let tiles: Vec<Vec<Kind>> = rows
        .iter()
        .map(|row| {
            row.chars()
                .map(|glyph| if glyph == '#' { WALL } else { FLOOR })
                .collect()
        })
        .collect();
    let sprites: Vec<Vec<Option<Kind>>> = rows
        .iter()
        .map(|row| {
            row.chars()
                .map(|glyph| match glyph {
                    'h' => Some(HERO),
                    'g' => Some(GEM),
                    'r' => Some(ROCK),
                    _ => None,
                })
                .collect()
        })
        .collect();
    let mut world = World::new(config);
    world::set_world(
        &mut world,
        catalog(),
        Grid::from_rows(tiles).expect("rectangular tiles"),
        Grid::from_rows(sprites).expect("rectangular sprites"),
    )
    .expect("valid layout");
    world
}

fn when_do(
    book: &mut RuleBook,
    rule: RuleId,
    offset: Offset,
    attributes: &[(Kind, Attribute)],
    commands: &[Command],
) {
    let when_do = book.when_do_or_insert(rule, offset).expect("rule exists");
    for (kind, attribute) in attributes {
        when_do.set_attribute(*kind, *attribute);
    }
    for (slot, command) in commands.iter().enumerate() {
        when_do.set_command(slot, Some(*command));
    }
}

fn always(book: &mut RuleBook, kind: Kind, commands: &[Command]) -> RuleId {
    let rule = book.make_rule(kind, RuleType::Resting, MoveDirection::Left);
    when_do(book, rule, Offset::CENTER, &[], commands);
    rule
}

fn sprite_of(world: &World, kind: Kind) -> Option<SpriteSnapshot> {
    query::sprite_view(world)
        .into_vec()
        .into_iter()
        .find(|sprite| sprite.kind == kind)
}

fn tile(world: &World, cell: CellCoord) -> Option<Kind> {
    query::tiles(world).and_then(|tiles| tiles.get(cell).copied())
}

#[test]
fn round_before_set_world_is_rejected() {
    let mut interpreter = Interpreter::new(RuleBook::new(catalog()), Config::default());
    let mut world = World::default();
    let result = interpreter.round(&mut world, &[], &mut Vec::new());
    assert_eq!(result, Err(WorldError::NotSet));
}

#[test]
fn moving_sprite_shifts_one_cell_per_round() {
    let mut book = RuleBook::new(catalog());
    let _ = always(&mut book, HERO, &[Command::Move(MoveArg::Right)]);
    let moving = book.make_rule(HERO, RuleType::Moving, MoveDirection::Right);
    when_do(&mut book, moving, Offset::CENTER, &[], &[Command::Move(MoveArg::Right)]);

    let mut world = world_from(&["...", ".h.", "..."]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let mut events = Vec::new();
    let status = interpreter
        .round(&mut world, &[], &mut events)
        .expect("world set");
    world::advance(&mut world, PERIOD);

    assert_eq!(status, GameStatus::InPlay);
    let hero = sprite_of(&world, HERO).expect("hero alive");
    assert_eq!(hero.cell, CellCoord::new(2, 1));
    assert_eq!(hero.direction, Some(MoveDirection::Right));
    assert!(events.contains(&Event::SpriteMoving {
        sprite: hero.id,
        from: CellCoord::new(1, 1),
        direction: MoveDirection::Right,
    }));
}

#[test]
fn moving_rules_keep_sprites_going() {
    let mut book = RuleBook::new(catalog());
    let pushing = book.make_rule(HERO, RuleType::Pushing, MoveDirection::Right);
    when_do(&mut book, pushing, Offset::CENTER, &[], &[Command::Move(MoveArg::Right)]);
    let moving = book.make_rule(HERO, RuleType::Moving, MoveDirection::Right);
    let ahead = Offset::toward(MoveDirection::Right);
    when_do(&mut book, moving, ahead, &[(WALL, Attribute::Exclude)], &[]);
    when_do(&mut book, moving, Offset::CENTER, &[], &[Command::Move(MoveArg::Right)]);

    let mut world = world_from(&["h...#"]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let _ = interpreter
        .round(&mut world, &[PushInput::Right], &mut Vec::new())
        .expect("world set");
    world::advance(&mut world, PERIOD);
    for _ in 0..4 {
        let _ = interpreter
            .round(&mut world, &[], &mut Vec::new())
            .expect("world set");
        world::advance(&mut world, PERIOD);
    }

    let hero = sprite_of(&world, HERO).expect("hero alive");
    assert_eq!(hero.cell, CellCoord::new(3, 0));
    assert_eq!(hero.direction, None);
}

#[test]
fn pushing_rules_follow_pressed_directions() {
    let mut book = RuleBook::new(catalog());
    let pushing = book.make_rule(HERO, RuleType::Pushing, MoveDirection::Down);
    when_do(&mut book, pushing, Offset::CENTER, &[], &[Command::Move(MoveArg::Down)]);

    let mut world = world_from(&["h", ".", "."]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let _ = interpreter
        .round(&mut world, &[PushInput::Left], &mut Vec::new())
        .expect("world set");
    assert_eq!(sprite_of(&world, HERO).and_then(|hero| hero.direction), None);

    let _ = interpreter
        .round(&mut world, &[PushInput::Left, PushInput::Down], &mut Vec::new())
        .expect("world set");
    assert_eq!(
        sprite_of(&world, HERO).and_then(|hero| hero.direction),
        Some(MoveDirection::Down)
    );
}

#[test]
fn a_button_rules_fire_only_on_a() {
    let mut book = RuleBook::new(catalog());
    let jump = book.make_rule(HERO, RuleType::Pushing, PushInput::A);
    when_do(&mut book, jump, Offset::CENTER, &[], &[Command::Move(MoveArg::Up)]);

    let mut world = world_from(&[".", "h"]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let _ = interpreter
        .round(&mut world, &[PushInput::Down, PushInput::Up], &mut Vec::new())
        .expect("world set");
    assert_eq!(sprite_of(&world, HERO).and_then(|hero| hero.direction), None);

    let _ = interpreter
        .round(&mut world, &[PushInput::A], &mut Vec::new())
        .expect("world set");
    assert_eq!(
        sprite_of(&world, HERO).and_then(|hero| hero.direction),
        Some(MoveDirection::Up)
    );
}

#[test]
fn standing_orders_hold_when_nothing_nearby_changes() {
    let play = |dirty_filter| {
        let mut book = RuleBook::new(catalog());
        let stand = book.make_rule(HERO, RuleType::Resting, MoveDirection::Left);
        let ahead = Offset::toward(MoveDirection::Right);
        when_do(&mut book, stand, ahead, &[(WALL, Attribute::Exclude)], &[]);
        when_do(&mut book, stand, Offset::CENTER, &[], &[Command::Move(MoveArg::Stop)]);
        let walk = book.make_rule(HERO, RuleType::Pushing, MoveDirection::Right);
        when_do(&mut book, walk, Offset::CENTER, &[], &[Command::Move(MoveArg::Right)]);

        let mut world = world_from(&["h..."]);
        let config = Config::new(dirty_filter, 0);
        let mut interpreter = Interpreter::with_policy(book, config, KeepFirst);
        let inputs: [&[PushInput]; 3] = [&[], &[PushInput::Right], &[PushInput::Right]];
        let mut directions = Vec::new();
        for pressed in inputs {
            let _ = interpreter
                .round(&mut world, pressed, &mut Vec::new())
                .expect("world set");
            world::advance(&mut world, PERIOD);
            directions.push(sprite_of(&world, HERO).and_then(|hero| hero.direction));
        }
        directions
    };

    let filtered = play(true);
    assert_eq!(filtered, play(false));
    assert_eq!(filtered, vec![None, None, None]);
}

#[test]
fn head_on_collision_removes_both_sprites() {
    let mut book = RuleBook::new(catalog());
    let _ = always(&mut book, HERO, &[Command::Move(MoveArg::Right)]);
    let _ = always(&mut book, GEM, &[Command::Move(MoveArg::Left)]);
    let crash = book.make_rule(HERO, RuleType::CollidingResting, MoveDirection::Right);
    let ahead = Offset::toward(MoveDirection::Right);
    let remove = Command::Sprite(SpriteArg::Remove);
    when_do(&mut book, crash, Offset::CENTER, &[], &[remove]);
    when_do(&mut book, crash, ahead, &[], &[remove]);

    let mut world = world_from(&["hg."]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let mut events = Vec::new();
    let _ = interpreter
        .round(&mut world, &[], &mut events)
        .expect("world set");

    let dead: Vec<_> = query::dead_sprites(&world)
        .iter()
        .map(|sprite| sprite.kind)
        .collect();
    assert_eq!(dead, vec![HERO, GEM]);
    assert!(query::sprite_view(&world).is_empty());
    assert!(events.contains(&Event::RoundCompleted {
        round: 0,
        closures: 3
    }));
}

#[test]
fn collision_fires_once_per_sprite_rule() {
    let mut book = RuleBook::new(catalog());
    let _ = always(&mut book, HERO, &[Command::Move(MoveArg::Right)]);
    let _ = always(&mut book, GEM, &[Command::Move(MoveArg::Left)]);
    let hero_crash = book.make_rule(HERO, RuleType::CollidingResting, MoveDirection::Right);
    when_do(&mut book, hero_crash, Offset::CENTER, &[], &[Command::Move(MoveArg::UTurn)]);
    let gem_crash = book.make_rule(GEM, RuleType::CollidingResting, MoveDirection::Left);
    when_do(&mut book, gem_crash, Offset::CENTER, &[], &[Command::Move(MoveArg::UTurn)]);

    let mut world = world_from(&["hg"]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let mut events = Vec::new();
    let _ = interpreter
        .round(&mut world, &[], &mut events)
        .expect("world set");

    assert!(events.contains(&Event::RoundCompleted {
        round: 0,
        closures: 4
    }));
    assert_eq!(query::sprite_view(&world).len(), 2);
}

#[test]
fn distant_exclusion_of_the_collider_vetoes_a_collision() {
    let build = |veto: bool| {
        let mut book = RuleBook::new(catalog());
        let walk = book.make_rule(HERO, RuleType::Pushing, MoveDirection::Right);
        when_do(&mut book, walk, Offset::CENTER, &[], &[Command::Move(MoveArg::Right)]);
        let smash = book.make_rule(HERO, RuleType::CollidingResting, MoveDirection::Right);
        let ahead = Offset::toward(MoveDirection::Right);
        when_do(
            &mut book,
            smash,
            ahead,
            &[(ROCK, Attribute::Include)],
            &[Command::Sprite(SpriteArg::Remove)],
        );
        if veto {
            let beyond = Offset::new(2, 0).expect("inside the diamond");
            when_do(&mut book, smash, beyond, &[(ROCK, Attribute::Exclude)], &[]);
        }
        book
    };

    for (veto, survives) in [(false, false), (true, true)] {
        let mut world = world_from(&["hr.."]);
        let mut interpreter = Interpreter::new(build(veto), Config::default());
        let _ = interpreter
            .round(&mut world, &[PushInput::Right], &mut Vec::new())
            .expect("world set");
        assert_eq!(sprite_of(&world, ROCK).is_some(), survives, "veto {veto}");
    }
}

#[test]
fn crossing_paths_trigger_moving_collisions() {
    let build = |rule_type| {
        let mut book = RuleBook::new(catalog());
        let _ = always(&mut book, HERO, &[Command::Move(MoveArg::Right)]);
        let _ = always(&mut book, GEM, &[Command::Move(MoveArg::Down)]);
        let crash = book.make_rule(HERO, rule_type, MoveDirection::Right);
        when_do(&mut book, crash, Offset::CENTER, &[], &[Command::Move(MoveArg::Stop)]);
        book
    };

    for (rule_type, expected) in [
        (RuleType::CollidingMoving, None),
        (RuleType::CollidingResting, Some(MoveDirection::Right)),
    ] {
        let mut world = world_from(&[".g.", "h..", "..."]);
        let mut interpreter = Interpreter::new(build(rule_type), Config::default());
        let _ = interpreter
            .round(&mut world, &[], &mut Vec::new())
            .expect("world set");

        let hero = sprite_of(&world, HERO).expect("hero alive");
        assert_eq!(hero.direction, expected, "{rule_type:?}");
        let gem = sprite_of(&world, GEM).expect("gem alive");
        assert_eq!(gem.direction, Some(MoveDirection::Down));
    }
}

#[test]
fn resting_paint_marks_cell_changed() {
    let mut book = RuleBook::new(catalog());
    let _ = always(&mut book, HERO, &[Command::Paint(WALL)]);

    let mut world = world_from(&["...", ".h.", "..."]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let mut events = Vec::new();
    let _ = interpreter
        .round(&mut world, &[], &mut events)
        .expect("world set");

    let center = CellCoord::new(1, 1);
    assert_eq!(tile(&world, center), Some(WALL));
    assert!(query::is_changed(&world, center));
    assert!(!query::is_changed(&world, CellCoord::new(0, 0)));
    assert!(events.contains(&Event::TilePainted {
        cell: center,
        kind: WALL
    }));
}

#[test]
fn first_paint_of_a_cell_wins() {
    let mut book = RuleBook::new(catalog());
    let _ = always(&mut book, HERO, &[Command::Paint(WALL)]);
    let _ = always(&mut book, HERO, &[Command::Paint(FLOOR)]);

    let mut world = world_from(&["h"]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let _ = interpreter
        .round(&mut world, &[], &mut Vec::new())
        .expect("world set");
    assert_eq!(tile(&world, CellCoord::new(0, 0)), Some(WALL));
}

#[test]
fn paint_log_overflow_commits_the_same_tiles() {
    let run = |rows: &[&str], capacity| {
        let mut book = RuleBook::new(catalog());
        let _ = always(&mut book, HERO, &[Command::Paint(WALL)]);
        let config = world::Config::new(16.0, PERIOD, capacity);
        let mut world = world_with_config(rows, config);
        let mut interpreter = Interpreter::new(book, Config::default());
        let mut events = Vec::new();
        let _ = interpreter
            .round(&mut world, &[], &mut events)
            .expect("world set");
        let painted = events
            .iter()
            .filter(|event| matches!(event, Event::TilePainted { .. }))
            .count();
        (query::tiles(&world).cloned().expect("world set"), painted)
    };

    let crowded = ["hhhhhhh.", "h.h....."];
    let logged = run(&crowded, 64);
    assert_eq!(run(&crowded, 5), logged);
    assert_eq!(run(&crowded, 0), logged);
    assert_eq!(logged.1, 9);
    assert_eq!(logged.0.get(CellCoord::new(6, 0)), Some(&WALL));
    assert_eq!(logged.0.get(CellCoord::new(1, 1)), Some(&FLOOR));

    let full = ["hh.h....", ".h..h..."];
    let logged = run(&full, 64);
    assert_eq!(run(&full, 5), logged);
    assert_eq!(run(&full, 0), logged);
    assert_eq!(logged.1, 5);
    assert_eq!(logged.0.get(CellCoord::new(4, 1)), Some(&WALL));
    assert_eq!(logged.0.get(CellCoord::new(2, 0)), Some(&FLOOR));
}

#[test]
fn guards_without_neighbors_match_every_sprite() {
    let mut book = RuleBook::new(catalog());
    let rule = book.make_rule(HERO, RuleType::Resting, MoveDirection::Left);
    when_do(&mut book, rule, Offset::CENTER, &[(HERO, Attribute::Exclude)], &[Command::Paint(WALL)]);

    let mut world = world_from(&["h.h", "...", "h.."]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let _ = interpreter
        .round(&mut world, &[], &mut Vec::new())
        .expect("world set");

    for cell in [CellCoord::new(0, 0), CellCoord::new(2, 0), CellCoord::new(0, 2)] {
        assert_eq!(tile(&world, cell), Some(WALL), "{cell:?}");
    }
    assert_eq!(tile(&world, CellCoord::new(1, 1)), Some(FLOOR));
}

#[test]
fn sprite_predicate_guards_the_win() {
    let build = || {
        let mut book = RuleBook::new(catalog());
        let _ = always(
            &mut book,
            HERO,
            &[Command::SpritePred(GEM), Command::Game(GameArg::Win)],
        );
        book
    };

    let mut lonely = world_from(&["h."]);
    let status = Interpreter::new(build(), Config::default())
        .round(&mut lonely, &[], &mut Vec::new())
        .expect("world set");
    assert_eq!(status, GameStatus::Won);

    let mut guarded = world_from(&["hg"]);
    let status = Interpreter::new(build(), Config::default())
        .round(&mut guarded, &[], &mut Vec::new())
        .expect("world set");
    assert_eq!(status, GameStatus::InPlay);
}

#[test]
fn finished_games_stay_finished() {
    let mut book = RuleBook::new(catalog());
    let _ = always(&mut book, HERO, &[Command::Game(GameArg::Lose)]);

    let mut world = world_from(&["h"]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let mut events = Vec::new();
    let status = interpreter
        .round(&mut world, &[], &mut events)
        .expect("world set");
    assert_eq!(status, GameStatus::Lost);
    assert!(events.contains(&Event::GameStatusChanged {
        status: GameStatus::Lost
    }));

    let mut later = Vec::new();
    let status = interpreter
        .round(&mut world, &[], &mut later)
        .expect("world set");
    assert_eq!(status, GameStatus::Lost);
    assert!(later.is_empty());
    assert_eq!(query::round_index(&world), 1);
}

#[test]
fn adjacent_witness_receives_commands() {
    let mut book = RuleBook::new(catalog());
    let shove = book.make_rule(HERO, RuleType::Resting, MoveDirection::Left);
    let ahead = Offset::toward(MoveDirection::Right);
    when_do(
        &mut book,
        shove,
        ahead,
        &[(GEM, Attribute::Include)],
        &[Command::Move(MoveArg::Right)],
    );
    let grab = book.make_rule(HERO, RuleType::Resting, MoveDirection::Left);
    let below = Offset::toward(MoveDirection::Down);
    when_do(
        &mut book,
        grab,
        below,
        &[(ROCK, Attribute::OneOf), (GEM, Attribute::OneOf)],
        &[Command::Sprite(SpriteArg::Remove)],
    );

    let mut world = world_from(&["hg.", "r.."]);
    let mut interpreter = Interpreter::new(book, Config::default());
    let _ = interpreter
        .round(&mut world, &[], &mut Vec::new())
        .expect("world set");

    let gem = sprite_of(&world, GEM).expect("gem alive");
    assert_eq!(gem.direction, Some(MoveDirection::Right));
    assert_eq!(sprite_of(&world, HERO).and_then(|hero| hero.direction), None);
    assert!(sprite_of(&world, ROCK).is_none());
}

#[test]
fn conflict_policy_breaks_move_ties() {
    let build = || {
        let mut book = RuleBook::new(catalog());
        let _ = always(&mut book, HERO, &[Command::Move(MoveArg::Left)]);
        let _ = always(&mut book, HERO, &[Command::Move(MoveArg::Right)]);
        book
    };

    let mut world = world_from(&[".h."]);
    let _ = Interpreter::with_policy(build(), Config::default(), KeepFirst)
        .round(&mut world, &[], &mut Vec::new())
        .expect("world set");
    assert_eq!(
        sprite_of(&world, HERO).and_then(|hero| hero.direction),
        Some(MoveDirection::Left)
    );

    let mut world = world_from(&[".h."]);
    let _ = Interpreter::with_policy(build(), Config::default(), TakeLast)
        .round(&mut world, &[], &mut Vec::new())
        .expect("world set");
    assert_eq!(
        sprite_of(&world, HERO).and_then(|hero| hero.direction),
        Some(MoveDirection::Right)
    );
}

#[test]
fn start_follows_the_player() {
    let mut book = RuleBook::new(catalog());
    book.set_player(Some(HERO));

    let mut world = world_from(&["g.h"]);
    let hero = sprite_of(&world, HERO).expect("hero alive").id;
    let mut interpreter = Interpreter::new(book, Config::default());
    let mut events = Vec::new();
    let _ = interpreter.start(&mut world, &mut events).expect("world set");

    assert_eq!(events.first(), Some(&Event::CameraFollow { sprite: hero }));
    assert!(events.contains(&Event::RoundCompleted {
        round: 0,
        closures: 0
    }));
}
