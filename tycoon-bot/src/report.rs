use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use tycoon_core::{SiteProjection, Snapshot, project_sites};

/// Everything a report prints about one snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub at: i64,
    pub generated_at: String,
    pub fingerprint: String,
    pub applied_frames: Option<usize>,
    pub sites: Vec<SiteProjection>,
}

impl ProjectionReport {
    pub fn build(snapshot: &Snapshot, at: i64) -> Result<Self> {
        Ok(Self {
            at,
            generated_at: DateTime::<Utc>::from_timestamp_millis(at)
                .map(|when| when.to_rfc3339())
                .unwrap_or_default(),
            fingerprint: format!("{:016x}", snapshot.fingerprint()),
            applied_frames: None,
            sites: project_sites(snapshot, at)?,
        })
    }

    #[must_use]
    pub fn with_applied_frames(mut self, frames: usize) -> Self {
        self.applied_frames = Some(frames);
        self
    }

    fn ad_count(&self) -> usize {
        self.sites.iter().map(|site| site.ads.len()).sum()
    }

    fn earnings(&self) -> (f64, f64) {
        self.sites
            .iter()
            .flat_map(|site| site.ads.iter())
            .filter(|ad| ad.enabled)
            .fold((0.0, 0.0), |(total, rate), ad| {
                (total + ad.stats.profit_total, rate + ad.stats.profit_per_hour)
            })
    }
}

pub fn write_report(format: &str, out: &mut dyn Write, report: &ProjectionReport) -> Result<()> {
    match format {
        "json" => generate_json_report(out, report),
        "markdown" => generate_markdown_report(out, report),
        "csv" => generate_csv_report(out, report),
        _ => generate_console_report(out, report),
    }
}

pub fn generate_console_report(out: &mut dyn Write, report: &ProjectionReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📈 Projection Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    writeln!(out, "At: {} ({})", report.generated_at, report.at)?;
    writeln!(out, "Snapshot: {}", report.fingerprint)?;
    if let Some(frames) = report.applied_frames {
        writeln!(out, "Replayed frames: {frames}")?;
    }
    writeln!(out, "Sites: {}", report.sites.len())?;
    writeln!(out, "Ads: {}", report.ad_count())?;
    let (total, rate) = report.earnings();
    writeln!(
        out,
        "Earnings: {} ({}/h)",
        format!("{total:.2}").green(),
        format!("{rate:.2}").green()
    )?;
    writeln!(out)?;

    for site in &report.sites {
        let traffic = &site.traffic;
        writeln!(out, "{}", site.domain.bold())?;
        writeln!(
            out,
            "   Traffic: {:.0}/h (generic {:.0}, community {:.0}, link {:.0}, ddos {:.0})",
            traffic.total_speed,
            traffic.generic_speed,
            traffic.community_speed,
            traffic.link_speed,
            traffic.ddos_speed
        )?;
        for ad in &site.ads {
            let status = if ad.enabled {
                "▶ on ".green()
            } else {
                "⏸ off".yellow()
            };
            writeln!(
                out,
                "   {status} {} earned {:.2} at {:.2}/h, conversion {:.4}",
                ad.ad_id, ad.stats.profit_total, ad.stats.profit_per_hour, ad.stats.conversion
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, report: &ProjectionReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &ProjectionReport) -> Result<()> {
    writeln!(out, "# Web Tycoon Projection\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **At**: {} ({})", report.generated_at, report.at)?;
    writeln!(out, "- **Snapshot**: `{}`", report.fingerprint)?;
    if let Some(frames) = report.applied_frames {
        writeln!(out, "- **Replayed frames**: {frames}")?;
    }
    writeln!(out, "- **Sites**: {}", report.sites.len())?;
    let (total, rate) = report.earnings();
    writeln!(out, "- **Earnings**: {total:.2} ({rate:.2}/h)\n")?;

    writeln!(out, "## Sites\n")?;
    if report.sites.is_empty() {
        writeln!(out, "_No sites with speed records._")?;
        return Ok(());
    }
    writeln!(out, "| Site | Traffic/h | Generic | Community | Link | DDoS |")?;
    writeln!(out, "|------|-----------|---------|-----------|------|------|")?;
    for site in &report.sites {
        let traffic = &site.traffic;
        writeln!(
            out,
            "| {} | {:.0} | {:.0} | {:.0} | {:.0} | {:.0} |",
            site.domain,
            traffic.total_speed,
            traffic.generic_speed,
            traffic.community_speed,
            traffic.link_speed,
            traffic.ddos_speed
        )?;
    }

    writeln!(out, "\n## Ads\n")?;
    writeln!(out, "| Site | Ad | Enabled | Earned | Per hour | Conversion |")?;
    writeln!(out, "|------|----|---------|--------|----------|------------|")?;
    for site in &report.sites {
        for ad in &site.ads {
            let enabled = if ad.enabled { "✅" } else { "❌" };
            writeln!(
                out,
                "| {} | {} | {enabled} | {:.2} | {:.2} | {:.4} |",
                site.domain,
                ad.ad_id,
                ad.stats.profit_total,
                ad.stats.profit_per_hour,
                ad.stats.conversion
            )?;
        }
    }
    Ok(())
}

/// One row per ad; sites without ads get a single row with empty ad columns.
pub fn generate_csv_report(out: &mut dyn Write, report: &ProjectionReport) -> Result<()> {
    writeln!(
        out,
        "site_id,domain,at,total_speed,generic_speed,community_speed,link_speed,ddos_speed,ad_id,enabled,profit_total,profit_per_hour,conversion"
    )?;
    for site in &report.sites {
        let traffic = &site.traffic;
        let prefix = format!(
            "{},{},{},{},{},{},{},{}",
            csv_field(&site.site_id),
            csv_field(&site.domain),
            site.at,
            traffic.total_speed,
            traffic.generic_speed,
            traffic.community_speed,
            traffic.link_speed,
            traffic.ddos_speed
        );
        if site.ads.is_empty() {
            writeln!(out, "{prefix},,,,,")?;
        }
        for ad in &site.ads {
            writeln!(
                out,
                "{prefix},{},{},{},{},{}",
                csv_field(&ad.ad_id),
                ad.enabled,
                ad.stats.profit_total,
                ad.stats.profit_per_hour,
                ad.stats.conversion
            )?;
        }
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tycoon_core::{Ad, Site, SiteSpeed, SpeedSnapshot};

    const T: i64 = 1_700_000_000_000;

    fn snapshot() -> Snapshot {
        let speed = SpeedSnapshot {
            generic_value: 300.0,
            community_value: 100.0,
            link_value: 50.0,
            limit: 1_000.0,
            ts: T,
            ..SpeedSnapshot::default()
        };
        Snapshot {
            sites: Arc::new(vec![
                Site {
                    id: "s1".into(),
                    domain: "cats.example".into(),
                    sitespeed: vec![SiteSpeed::from_speed("s1", &speed)],
                    ad: vec![Ad {
                        id: "a1".into(),
                        site_id: "s1".into(),
                        status: 1,
                        ctr_base: 2.0,
                        cpc: 500.0,
                        start_date: T / 1_000,
                        ..Ad::default()
                    }],
                    ..Site::default()
                },
                Site {
                    id: "s2".into(),
                    domain: "dogs, inc".into(),
                    sitespeed: vec![SiteSpeed::from_speed("s2", &speed)],
                    ..Site::default()
                },
            ]),
            ..Snapshot::default()
        }
    }

    fn render(format: &str, report: &ProjectionReport) -> String {
        let mut out = Vec::new();
        write_report(format, &mut out, report).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn report_captures_time_and_sites() {
        let report = ProjectionReport::build(&snapshot(), T).unwrap();
        assert_eq!(report.generated_at, "2023-11-14T22:13:20+00:00");
        assert_eq!(report.sites.len(), 2);
        assert_eq!(report.sites[0].traffic.total_speed, 450.0);
        assert_eq!(report.fingerprint.len(), 16);
    }

    #[test]
    fn json_report_round_trips_through_serde() {
        let report = ProjectionReport::build(&snapshot(), T)
            .unwrap()
            .with_applied_frames(4);
        let value: serde_json::Value = serde_json::from_str(&render("json", &report)).unwrap();
        assert_eq!(value["appliedFrames"], 4);
        assert_eq!(value["sites"][0]["siteId"], "s1");
        assert_eq!(value["sites"][0]["traffic"]["totalSpeed"], 450.0);
        assert_eq!(value["sites"][0]["ads"][0]["adId"], "a1");
    }

    #[test]
    fn csv_report_quotes_and_fills_empty_ads() {
        let report = ProjectionReport::build(&snapshot(), T).unwrap();
        let csv = render("csv", &report);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("site_id,domain,at"));
        assert!(lines[1].starts_with("s1,cats.example,1700000000000,450,300,100,50,0,a1,true"));
        assert!(lines[2].starts_with("s2,\"dogs, inc\","));
        assert!(lines[2].ends_with(",,,,,"));
    }

    #[test]
    fn markdown_and_console_mention_every_site() {
        let report = ProjectionReport::build(&snapshot(), T).unwrap();
        let markdown = render("markdown", &report);
        assert!(markdown.starts_with("# Web Tycoon Projection"));
        assert!(markdown.contains("| cats.example | 450 |"));
        let console = render("console", &report);
        assert!(console.contains("cats.example"));
        assert!(console.contains("dogs, inc"));
        assert!(console.contains("Sites: 2"));

        let empty = ProjectionReport::build(&Snapshot::default(), T).unwrap();
        assert!(render("markdown", &empty).contains("_No sites with speed records._"));
    }
}
