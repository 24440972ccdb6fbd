use anyhow::Result;
use std::io::Write;

use super::{Game, GameContext, GameSpec};

/// Lists the domains of every owned site.
pub struct ShowSite;

pub fn show_site() -> GameSpec {
    GameSpec::new(
        "mefest",
        "show-site",
        "List owned sites by domain",
        ShowSite::boxed,
    )
}

impl ShowSite {
    fn boxed() -> Box<dyn Game> {
        Box::new(Self)
    }
}

impl Game for ShowSite {
    fn play(&self, ctx: &GameContext<'_>, out: &mut dyn Write) -> Result<()> {
        for site in ctx.snapshot.sites.iter() {
            writeln!(out, "{} (level {})", site.domain, site.level)?;
        }
        Ok(())
    }
}
