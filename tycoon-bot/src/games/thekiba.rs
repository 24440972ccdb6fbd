use anyhow::Result;
use std::io::Write;
use std::time::Duration;

use tycoon_core::{Ad, project_sites};

use super::{Game, GameContext, GameSpec};

/// Projects every placed ad's earnings from the live state.
pub struct WatchAds;

/// Lists ads offered on sites this account does not own, best price first.
pub struct ExtraAds;

pub fn watch_ads() -> GameSpec {
    GameSpec::new(
        "thekiba",
        "watch-ads",
        "Project earnings of every placed ad",
        WatchAds::boxed,
    )
    .with_waiting(Duration::from_secs(10 * 60))
    .streaming()
}

pub fn extra_ads() -> GameSpec {
    GameSpec::new(
        "thekiba",
        "extra-ads",
        "List journalled ads from foreign sites",
        ExtraAds::boxed,
    )
    .with_waiting(Duration::from_secs(60))
    .streaming()
}

impl WatchAds {
    fn boxed() -> Box<dyn Game> {
        Box::new(Self)
    }
}

impl ExtraAds {
    fn boxed() -> Box<dyn Game> {
        Box::new(Self)
    }
}

impl Game for WatchAds {
    fn play(&self, ctx: &GameContext<'_>, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "Watching ads!")?;
        let mut total = 0.0;
        let mut per_hour = 0.0;
        for site in project_sites(ctx.snapshot, ctx.now_ms)? {
            for ad in &site.ads {
                let state = if ad.enabled { "on" } else { "off" };
                writeln!(
                    out,
                    "{} {} [{state}] earned {:.2} at {:.2}/h, conversion {:.4}",
                    site.domain,
                    ad.ad_id,
                    ad.stats.profit_total,
                    ad.stats.profit_per_hour,
                    ad.stats.conversion
                )?;
                if ad.enabled {
                    total += ad.stats.profit_total;
                    per_hour += ad.stats.profit_per_hour;
                }
            }
        }
        writeln!(out, "total {total:.2} at {per_hour:.2}/h")?;
        Ok(())
    }
}

impl Game for ExtraAds {
    fn play(&self, ctx: &GameContext<'_>, out: &mut dyn Write) -> Result<()> {
        let mut ads: Vec<&Ad> = ctx.snapshot.extra_ads.iter().collect();
        ads.sort_by(|a, b| b.cpc.total_cmp(&a.cpc));
        if ads.is_empty() {
            writeln!(out, "no foreign ads seen yet")?;
        }
        for ad in ads {
            writeln!(out, "{} on {}: cpc {:.2}", ad.id, ad.site_id, ad.cpc)?;
        }
        Ok(())
    }
}
