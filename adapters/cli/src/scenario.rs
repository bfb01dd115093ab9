//! TOML scenario files: the kind palette, both layout layers and the rules.
//!
//! ```toml
//! player = "hero"
//! tiles = ["###", "#.#", "###"]
//! sprites = ["...", ".h.", "..."]
//!
//! [[fixed]]
//! name = "wall"
//! glyph = "#"
//!
//! [[movable]]
//! name = "hero"
//! glyph = "h"
//!
//! [[rules]]
//! kinds = ["hero"]
//! rule_type = "Pushing"
//! input = "Right"
//!
//! [[rules.when_do]]
//! offset = [0, 0]
//! commands = [{ move = "Right" }]
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use tileworld_core::{
    Attribute, Command, GameArg, Grid, Kind, KindCatalog, MoveArg, Offset, PushInput,
    RuleRepository, RuleType, SpriteArg, COMMAND_SLOTS,
};
use tileworld_rulebook::RuleBook;

/// Glyph of a sprite layer cell without a sprite.
pub(crate) const EMPTY_SPRITE: char = '.';

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    #[serde(default)]
    player: Option<String>,
    fixed: Vec<KindSpec>,
    #[serde(default)]
    movable: Vec<KindSpec>,
    tiles: Vec<String>,
    sprites: Vec<String>,
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KindSpec {
    name: String,
    glyph: char,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    kinds: Vec<String>,
    rule_type: RuleType,
    #[serde(default, alias = "direction")]
    input: Option<PushInput>,
    #[serde(default)]
    when_do: Vec<WhenDoSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WhenDoSpec {
    offset: Offset,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    one_of: Vec<String>,
    #[serde(default)]
    commands: Vec<CommandSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CommandSpec {
    Move(MoveArg),
    Paint(String),
    Sprite(SpriteArg),
    Game(GameArg),
    SpritePred(String),
}

/// Names and glyphs of every kind of a scenario, indexed by kind.
#[derive(Clone, Debug)]
pub(crate) struct Palette {
    catalog: KindCatalog,
    names: BTreeMap<String, Kind>,
    glyphs: Vec<char>,
}

impl Palette {
    fn new(fixed: &[KindSpec], movable: &[KindSpec]) -> Result<Self> {
        let fixed_count = u16::try_from(fixed.len()).context("too many fixed kinds")?;
        let movable_count = u16::try_from(movable.len()).context("too many movable kinds")?;
        ensure!(fixed_count > 0, "a scenario needs at least one fixed kind");
        for layer in [fixed, movable] {
            for (index, spec) in layer.iter().enumerate() {
                ensure!(
                    layer[..index].iter().all(|other| other.glyph != spec.glyph),
                    "glyph `{}` is used by two kinds of the same layer",
                    spec.glyph
                );
            }
        }
        ensure!(
            movable.iter().all(|spec| spec.glyph != EMPTY_SPRITE),
            "glyph `{EMPTY_SPRITE}` is reserved for empty sprite cells"
        );
        let catalog = KindCatalog::new(fixed_count, movable_count);

        let mut names = BTreeMap::new();
        let mut glyphs = Vec::with_capacity(catalog.len());
        for (kind, spec) in catalog.all().zip(fixed.iter().chain(movable)) {
            if names.insert(spec.name.clone(), kind).is_some() {
                bail!("kind `{}` is declared twice", spec.name);
            }
            glyphs.push(spec.glyph);
        }

        Ok(Self {
            catalog,
            names,
            glyphs,
        })
    }

    /// Catalog the palette describes.
    pub(crate) fn catalog(&self) -> KindCatalog {
        self.catalog
    }

    /// Glyph drawn for `kind`.
    pub(crate) fn glyph(&self, kind: Kind) -> Option<char> {
        self.glyphs.get(kind.index()).copied()
    }

    fn kind(&self, name: &str) -> Result<Kind> {
        self.names
            .get(name)
            .copied()
            .with_context(|| format!("unknown kind `{name}`"))
    }

    fn movable_kind(&self, name: &str) -> Result<Kind> {
        let kind = self.kind(name)?;
        ensure!(self.catalog.is_movable(kind), "kind `{name}` is not movable");
        Ok(kind)
    }

    fn fixed_by_glyph(&self, glyph: char) -> Option<Kind> {
        self.catalog
            .fixed()
            .find(|kind| self.glyph(*kind) == Some(glyph))
    }

    fn movable_by_glyph(&self, glyph: char) -> Option<Kind> {
        self.catalog
            .movable()
            .find(|kind| self.glyph(*kind) == Some(glyph))
    }
}

/// Everything needed to set a world and drive it.
#[derive(Debug)]
pub(crate) struct Scenario {
    pub(crate) palette: Palette,
    pub(crate) rules: RuleBook,
    pub(crate) tiles: Grid<Kind>,
    pub(crate) sprites: Grid<Option<Kind>>,
}

/// Reads and validates the scenario stored at `path`.
pub(crate) fn load(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid scenario {}", path.display()))
}

/// Parses and validates a scenario from TOML text.
pub(crate) fn parse(text: &str) -> Result<Scenario> {
    let file: ScenarioFile = toml::from_str(text).context("malformed scenario TOML")?;
    let palette = Palette::new(&file.fixed, &file.movable)?;

    let tiles = layer(&file.tiles, "tile", |glyph| palette.fixed_by_glyph(glyph))?;
    let sprites = layer(&file.sprites, "sprite", |glyph| {
        if glyph == EMPTY_SPRITE {
            Some(None)
        } else {
            palette.movable_by_glyph(glyph).map(Some)
        }
    })?;

    let mut rules = RuleBook::new(palette.catalog());
    if let Some(player) = &file.player {
        rules.set_player(Some(palette.movable_kind(player)?));
    }
    for (index, spec) in file.rules.iter().enumerate() {
        add_rule(&mut rules, &palette, spec).with_context(|| format!("rule #{}", index + 1))?;
    }

    Ok(Scenario {
        palette,
        rules,
        tiles,
        sprites,
    })
}

fn layer<T: Clone>(
    rows: &[String],
    name: &str,
    mut decode: impl FnMut(char) -> Option<T>,
) -> Result<Grid<T>> {
    let mut decoded = Vec::with_capacity(rows.len());
    for (row, line) in rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(line.len());
        for (column, glyph) in line.chars().enumerate() {
            let Some(value) = decode(glyph) else {
                bail!("unknown {name} glyph `{glyph}` at column {column}, row {row}");
            };
            cells.push(value);
        }
        decoded.push(cells);
    }
    ensure!(!decoded.is_empty(), "the {name} layer is empty");
    Grid::from_rows(decoded).with_context(|| format!("the {name} layer is not rectangular"))
}

fn add_rule(book: &mut RuleBook, palette: &Palette, spec: &RuleSpec) -> Result<()> {
    let Some((first, rest)) = spec.kinds.split_first() else {
        bail!("a rule needs at least one kind");
    };
    let input = match (spec.rule_type, spec.input) {
        (_, Some(input)) => input,
        (RuleType::Resting, None) => PushInput::Left,
        (rule_type, None) => bail!("{rule_type:?} rules need a direction"),
    };
    ensure!(
        input.direction().is_some() || spec.rule_type == RuleType::Pushing,
        "only Pushing rules can wait for the A button"
    );

    let id = book.make_rule(palette.movable_kind(first)?, spec.rule_type, input);
    for name in rest {
        let _ = book.add_kind(id, palette.movable_kind(name)?);
    }

    for entry in &spec.when_do {
        ensure!(
            entry.commands.len() <= COMMAND_SLOTS,
            "at most {COMMAND_SLOTS} commands fit one position"
        );
        let mut attributes = Vec::new();
        for (names, attribute) in [
            (&entry.include, Attribute::Include),
            (&entry.exclude, Attribute::Exclude),
            (&entry.one_of, Attribute::OneOf),
        ] {
            for name in names {
                attributes.push((palette.kind(name)?, attribute));
            }
        }
        let mut commands = Vec::with_capacity(entry.commands.len());
        for command in &entry.commands {
            commands.push(match command {
                CommandSpec::Move(arg) => Command::Move(*arg),
                CommandSpec::Paint(name) => {
                    let kind = palette.kind(name)?;
                    ensure!(
                        palette.catalog().is_fixed(kind),
                        "only fixed kinds can be painted, `{name}` is movable"
                    );
                    Command::Paint(kind)
                }
                CommandSpec::Sprite(arg) => Command::Sprite(*arg),
                CommandSpec::Game(arg) => Command::Game(*arg),
                CommandSpec::SpritePred(name) => Command::SpritePred(palette.movable_kind(name)?),
            });
        }

        let when_do = book
            .when_do_or_insert(id, entry.offset)
            .context("rule disappeared while being built")?;
        for (kind, attribute) in attributes {
            when_do.set_attribute(kind, attribute);
        }
        for (slot, command) in commands.into_iter().enumerate() {
            when_do.set_command(slot, Some(command));
        }
    }
    Ok(())
}
