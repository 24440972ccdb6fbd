//! Game registry.
//!
//! Every game is listed once in [`builtin_games`] with its author, name and
//! scheduling settings. The registry is validated when it is built, so a bad
//! entry fails at startup instead of when the game is picked.

use anyhow::{Result, ensure};
use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

use tycoon_core::Snapshot;

pub mod mefest;
pub mod thekiba;

/// What a game sees on each tick.
#[derive(Debug, Clone, Copy)]
pub struct GameContext<'a> {
    pub snapshot: &'a Snapshot,
    /// Wall-clock time of the tick, epoch milliseconds.
    pub now_ms: i64,
}

/// A read-only observer run by the runner on every tick.
pub trait Game: Send + Sync {
    fn play(&self, ctx: &GameContext<'_>, out: &mut dyn Write) -> Result<()>;
}

pub type GameFactory = fn() -> Box<dyn Game>;

/// Registration entry of one game.
#[derive(Clone)]
pub struct GameSpec {
    pub author: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Pause between ticks.
    pub waiting: Duration,
    /// Whether the game needs the live event stream or runs once on a loaded state.
    pub needs_stream: bool,
    pub factory: GameFactory,
}

impl std::fmt::Debug for GameSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSpec")
            .field("author", &self.author)
            .field("name", &self.name)
            .field("waiting", &self.waiting)
            .field("needs_stream", &self.needs_stream)
            .finish_non_exhaustive()
    }
}

impl GameSpec {
    const DEFAULT_WAITING: Duration = Duration::from_secs(10);

    #[must_use]
    pub const fn new(
        author: &'static str,
        name: &'static str,
        description: &'static str,
        factory: GameFactory,
    ) -> Self {
        Self {
            author,
            name,
            description,
            waiting: Self::DEFAULT_WAITING,
            needs_stream: false,
            factory,
        }
    }

    #[must_use]
    pub const fn with_waiting(mut self, waiting: Duration) -> Self {
        self.waiting = waiting;
        self
    }

    #[must_use]
    pub const fn streaming(mut self) -> Self {
        self.needs_stream = true;
        self
    }

    /// `author/name`
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.author, self.name)
    }

    #[must_use]
    pub fn build(&self) -> Box<dyn Game> {
        (self.factory)()
    }
}

pub fn builtin_games() -> Vec<GameSpec> {
    vec![
        mefest::show_site(),
        thekiba::watch_ads(),
        thekiba::extra_ads(),
    ]
}

#[derive(Debug, Clone)]
pub struct GameRegistry {
    entries: Vec<GameSpec>,
}

impl GameRegistry {
    /// Build a registry, rejecting blank or duplicate entries.
    pub fn new(entries: Vec<GameSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &entries {
            ensure!(
                !spec.author.trim().is_empty(),
                "game {:?} has no author",
                spec.name
            );
            ensure!(
                !spec.name.trim().is_empty(),
                "a game by {} has no name",
                spec.author
            );
            ensure!(
                !spec.author.contains('/') && !spec.name.contains('/'),
                "game {} uses '/' in its author or name",
                spec.key()
            );
            ensure!(
                seen.insert((spec.author, spec.name)),
                "game {} is registered twice",
                spec.key()
            );
        }
        Ok(Self { entries })
    }

    pub fn builtin() -> Result<Self> {
        Self::new(builtin_games())
    }

    #[must_use]
    pub fn find(&self, author: &str, name: &str) -> Option<&GameSpec> {
        self.entries
            .iter()
            .find(|spec| spec.author == author && spec.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameSpec> {
        self.entries.iter()
    }
}
