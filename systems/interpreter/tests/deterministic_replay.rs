use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use tileworld_core::{
    Attribute, Command, Event, GameArg, GameStatus, Grid, Kind, KindCatalog, MoveArg,
    MoveDirection, Offset, PushInput, RuleId, RuleRepository, RuleType, SpriteArg,
};
use tileworld_rulebook::RuleBook;
use tileworld_system_interpreter::{CoinFlip, Config, ConflictPolicy, Interpreter, KeepFirst};
use tileworld_world::{self as world, query, World};

const FLOOR: Kind = Kind::new(0);
const WALL: Kind = Kind::new(1);
const HERO: Kind = Kind::new(2);
const GEM: Kind = Kind::new(3);
const ROCK: Kind = Kind::new(4);

const PERIOD: Duration = Duration::from_millis(150);

const LAYOUT: [&str; 7] = [
    "#########",
    "#r..g..r#",
    "#...#...#",
    "#.g...g.#",
    "#.r.....#",
    "#...h.r.#",
    "#########",
];

const INPUTS: &str = "RRRUA.UULLDRRRR..DDLLUUURRRDD..A.LLLUU";

#[test]
fn deterministic_replay_produces_identical_outcomes() {
    let first = replay(CoinFlip::seeded(0x5eed), true);
    let second = replay(CoinFlip::seeded(0x5eed), true);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first.rounds > 0);
}

#[test]
fn dirty_filter_never_changes_the_outcome() {
    let filtered = replay(KeepFirst, true);
    let exhaustive = replay(KeepFirst, false);

    assert_eq!(filtered.sprites, exhaustive.sprites);
    assert_eq!(filtered.tiles, exhaustive.tiles);
    assert_eq!(filtered.status, exhaustive.status);

    for seed in [0x5eed, 7, 0xdead_beef] {
        let filtered = replay(CoinFlip::seeded(seed), true);
        let exhaustive = replay(CoinFlip::seeded(seed), false);
        assert_eq!(filtered, exhaustive, "seed {seed:#x}");
    }
}

fn replay<P: ConflictPolicy>(policy: P, dirty_filter: bool) -> ReplayOutcome {
    let mut world = build_world();
    let config = Config::new(dirty_filter, 0);
    let mut interpreter = Interpreter::with_policy(rule_book(), config, policy);
    let mut log = Vec::new();

    let mut events = Vec::new();
    let mut status = interpreter
        .start(&mut world, &mut events)
        .expect("world set");
    record_events(&events, &mut log);
    world::advance(&mut world, PERIOD);

    let mut rounds = 1;
    for glyph in INPUTS.chars() {
        if status != GameStatus::InPlay {
            break;
        }
        events.clear();
        status = interpreter
            .round(&mut world, &pressed(glyph), &mut events)
            .expect("world set");
        record_events(&events, &mut log);
        world::advance(&mut world, PERIOD);
        rounds += 1;
    }

    let sprites = query::sprite_view(&world)
        .iter()
        .map(|sprite| SpriteState {
            id: sprite.id.get(),
            kind: sprite.kind.get(),
            column: sprite.cell.column(),
            row: sprite.cell.row(),
            direction: sprite.direction,
        })
        .collect();
    let tiles = query::tiles(&world).cloned().expect("world set");
    let tiles = tiles
        .cells_row_major()
        .filter_map(|cell| tiles.get(cell).map(Kind::get))
        .collect();

    ReplayOutcome {
        sprites,
        tiles,
        status: format!("{status:?}"),
        events: log,
        rounds,
    }
}

fn pressed(glyph: char) -> Vec<PushInput> {
    match glyph {
        'L' => vec![PushInput::Left],
        'R' => vec![PushInput::Right],
        'U' => vec![PushInput::Up],
        'D' => vec![PushInput::Down],
        'A' => vec![PushInput::A],
        _ => Vec::new(),
    }
}

fn build_world() -> World {
    let tiles: Vec<Vec<Kind>> = LAYOUT
        .iter()
        .map(|row| {
            row.chars()
                .map(|glyph| if glyph == '#' { WALL } else { FLOOR })
                .collect()
        })
        .collect();
    let sprites: Vec<Vec<Option<Kind>>> = LAYOUT
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
    let mut world = World::default();
    world::set_world(
        &mut world,
        KindCatalog::new(2, 3),
        Grid::from_rows(tiles).expect("rectangular tiles"),
        Grid::from_rows(sprites).expect("rectangular sprites"),
    )
    .expect("valid layout");
    world
}

fn rule_book() -> RuleBook {
    let mut book = RuleBook::new(KindCatalog::new(2, 3));
    book.set_player(Some(HERO));
    let solid = [(WALL, Attribute::Exclude), (ROCK, Attribute::Exclude)];

    for direction in MoveDirection::ALL {
        let ahead = Offset::toward(direction);
        let walk = book.make_rule(HERO, RuleType::Pushing, direction);
        edit(&mut book, walk, ahead, &solid, &[]);
        edit(&mut book, walk, Offset::CENTER, &[], &[Command::Move(direction.into())]);

        let collect = book.make_rule(HERO, RuleType::CollidingResting, direction);
        edit(
            &mut book,
            collect,
            ahead,
            &[(GEM, Attribute::Include)],
            &[Command::Sprite(SpriteArg::Remove)],
        );
    }

    let brace = book.make_rule(HERO, RuleType::Resting, MoveDirection::Left);
    let below = Offset::toward(MoveDirection::Down);
    edit(&mut book, brace, below, &[(WALL, Attribute::Include)], &[]);
    edit(&mut book, brace, Offset::CENTER, &[], &[Command::Move(MoveArg::Stop)]);

    let build = book.make_rule(HERO, RuleType::Pushing, PushInput::A);
    let above = Offset::toward(MoveDirection::Up);
    edit(
        &mut book,
        build,
        above,
        &[(ROCK, Attribute::Exclude), (GEM, Attribute::Exclude)],
        &[Command::Paint(WALL)],
    );

    for direction in [MoveDirection::Left, MoveDirection::Right] {
        let wander = book.make_rule(GEM, RuleType::Resting, direction);
        let side = Offset::toward(direction);
        let blocked = [
            (WALL, Attribute::Exclude),
            (ROCK, Attribute::Exclude),
            (GEM, Attribute::Exclude),
            (HERO, Attribute::Exclude),
        ];
        edit(&mut book, wander, side, &blocked, &[]);
        edit(&mut book, wander, Offset::CENTER, &[], &[Command::Move(direction.into())]);
    }

    let below = Offset::toward(MoveDirection::Down);
    let hollow = [
        (WALL, Attribute::Exclude),
        (ROCK, Attribute::Exclude),
        (GEM, Attribute::Exclude),
    ];
    let fall = book.make_rule(ROCK, RuleType::Resting, MoveDirection::Down);
    edit(&mut book, fall, below, &hollow, &[]);
    edit(&mut book, fall, Offset::CENTER, &[], &[Command::Move(MoveArg::Down)]);
    let keep_falling = book.make_rule(ROCK, RuleType::Moving, MoveDirection::Down);
    edit(&mut book, keep_falling, below, &hollow, &[]);
    edit(&mut book, keep_falling, Offset::CENTER, &[], &[Command::Move(MoveArg::Down)]);

    let crush = book.make_rule(ROCK, RuleType::CollidingResting, MoveDirection::Down);
    edit(
        &mut book,
        crush,
        below,
        &[(HERO, Attribute::Include)],
        &[Command::Sprite(SpriteArg::Remove)],
    );
    edit(&mut book, crush, Offset::CENTER, &[], &[Command::Game(GameArg::Lose)]);

    let goal = book.make_rule(HERO, RuleType::Resting, MoveDirection::Left);
    edit(
        &mut book,
        goal,
        Offset::CENTER,
        &[],
        &[Command::SpritePred(GEM), Command::Game(GameArg::Win)],
    );
    book
}

fn edit(
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

fn record_events(events: &[Event], log: &mut Vec<String>) {
    log.extend(events.iter().map(|event| format!("{event:?}")));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SpriteState {
    id: u32,
    kind: u16,
    column: u32,
    row: u32,
    direction: Option<MoveDirection>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    sprites: Vec<SpriteState>,
    tiles: Vec<u16>,
    status: String,
    events: Vec<String>,
    rounds: usize,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
