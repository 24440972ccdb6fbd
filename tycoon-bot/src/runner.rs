//! Wiring: config + registry -> the game to run, and the tick loop around it.

use anyhow::{Result, anyhow};
use chrono::Utc;
use std::io::Write;
use std::time::Duration;

use tycoon_core::{CancellationToken, ConnectionState, Snapshot, Transport, open};

use crate::config::BotConfig;
use crate::games::{Game, GameContext, GameRegistry, GameSpec};

/// Runs one configured game.
pub struct GameRunner {
    config: BotConfig,
    spec: GameSpec,
    game: Box<dyn Game>,
}

/// Build the runner for the game named by `config`.
///
/// Validates the config and the registry first; a game that reads the live
/// stream also needs an access token.
pub fn compose(config: BotConfig) -> Result<GameRunner> {
    config.validate()?;
    let registry = GameRegistry::builtin()?;
    let spec = registry
        .find(&config.author, &config.game)
        .cloned()
        .ok_or_else(|| anyhow!("can't find game {}/{}", config.author, config.game))?;
    if spec.needs_stream {
        config.validate_for_stream()?;
    }
    log::info!("{} has been started", spec.key());
    Ok(GameRunner::new(config, spec))
}

#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl GameRunner {
    #[must_use]
    pub fn new(config: BotConfig, spec: GameSpec) -> Self {
        let game = spec.build();
        Self { config, spec, game }
    }

    #[must_use]
    pub const fn spec(&self) -> &GameSpec {
        &self.spec
    }

    pub fn tick(&self, snapshot: &Snapshot, now_ms: i64, out: &mut dyn Write) -> Result<()> {
        let ctx = GameContext { snapshot, now_ms };
        self.game.play(&ctx, out)?;
        out.flush()?;
        Ok(())
    }

    /// Connect, then play on every tick until the connection ends.
    ///
    /// A failed tick is logged and retried after the restart delay; only the
    /// connection closing or `token` being cancelled stops the loop.
    pub async fn run_live<T>(
        &self,
        transport: T,
        initial: Snapshot,
        token: CancellationToken,
        out: &mut dyn Write,
    ) -> Result<ConnectionState>
    where
        T: Transport + 'static,
    {
        let handle = open(transport, initial, self.config.access_token.clone(), token);
        let restart_delay = Duration::from_millis(self.config.restart_delay_ms);
        let state = loop {
            let pause = match self.tick(&handle.snapshot(), now_ms(), out) {
                Ok(()) => self.spec.waiting,
                Err(err) => {
                    log::error!("{} tick failed: {err:#}", self.spec.key());
                    log::info!("restarting after {restart_delay:?}");
                    restart_delay
                }
            };
            tokio::select! {
                state = handle.closed() => break state,
                () = tokio::time::sleep(pause) => {}
            }
        };
        handle.join().await;
        log::info!("{} stopped: {state:?}", self.spec.key());
        Ok(state)
    }
}
