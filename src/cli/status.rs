use std::collections::BTreeMap;

use clap::Parser;
use relief::{
    ApiClient, KeywordClassifier, SessionState, Tier,
    domain::{Disaster, Report, Resource, Severity},
    priority,
};
use serde::Serialize;
use tracing::instrument;

use super::{
    output::OutputFormat,
    terminal::{Colorize, is_narrow},
    workspace::Workspace,
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show the backend, the session and what needs attention")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    backend: String,
    session: SessionState,
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<Counts>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Counts {
    disasters: BTreeMap<Severity, usize>,
    resources: usize,
    reports: usize,
    pending_reports: usize,
    high_alerts: usize,
    critical_alerts: usize,
}

impl Counts {
    fn tally(disasters: &[Disaster], resources: &[Resource], reports: &[Report]) -> Self {
        let mut counts = Self {
            resources: resources.len(),
            reports: reports.len(),
            ..Self::default()
        };
        for severity in disasters.iter().filter_map(|disaster| disaster.severity) {
            *counts.disasters.entry(severity).or_insert(0) += 1;
        }
        counts.pending_reports = reports
            .iter()
            .filter(|report| !report.verification_status.is_settled())
            .count();

        let classifier = KeywordClassifier::default();
        for triaged in priority::triage(&classifier, reports, |report| report.content.as_deref()) {
            match triaged.alert.tier {
                Tier::Critical => counts.critical_alerts += 1,
                Tier::High => counts.high_alerts += 1,
                Tier::Normal => {}
            }
        }
        counts
    }

    fn disaster_total(&self) -> usize {
        self.disasters.values().sum()
    }
}

impl Status {
    #[instrument(level = "debug", skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let store = workspace.connect().await?;
        let session = store.snapshot();

        let (counts, error) = match fetch_counts(store.api()).await {
            Ok(counts) => (Some(counts), session.error().map(ToString::to_string)),
            Err(e) => (None, Some(e.to_string())),
        };
        let summary = Summary {
            backend: workspace.config().base_url().to_string(),
            session: session.state(),
            user: session.user().map(|user| user.username.clone()),
            error,
            counts,
        };

        match self.output {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Table if self.quiet => Self::output_quiet(&summary),
            OutputFormat::Table => Self::output_table(&summary, workspace.is_initialized()),
        }
        Ok(())
    }

    fn output_quiet(summary: &Summary) {
        let counts = summary.counts.as_ref();
        println!(
            "session={} disasters={} pending={} critical={}",
            summary.session,
            counts.map_or(0, Counts::disaster_total),
            counts.map_or(0, |c| c.pending_reports),
            counts.map_or(0, |c| c.critical_alerts),
        );
    }

    fn output_table(summary: &Summary, initialized: bool) {
        println!("Backend: {}", summary.backend.info());
        if !initialized {
            println!("{}", "No workspace here. Run 'relief init' to create one.".dim());
        }
        match &summary.user {
            Some(user) => println!("Session: {} as {}", "logged in".success(), user.info()),
            None => println!("Session: {}", summary.session.to_string().dim()),
        }
        if let Some(error) = &summary.error {
            println!("{} {error}", "Error:".danger());
        }

        let Some(counts) = &summary.counts else {
            return;
        };

        println!();
        println!("Disasters");
        println!("{}", "─────────".dim());
        if is_narrow() {
            for (severity, count) in &counts.disasters {
                println!("{severity}: {count}");
            }
            println!("Total: {}", counts.disaster_total());
        } else {
            println!("{:<10} {:<6}", "Severity", "Count");
            for (severity, count) in counts.disasters.iter().rev() {
                println!("{:<10} {count:<6}", severity.as_str());
            }
            println!("{:<10} {}", "Total", counts.disaster_total());
        }

        println!();
        println!("Resources: {}", counts.resources);
        println!(
            "Reports: {} ({} pending review)",
            counts.reports, counts.pending_reports
        );

        println!();
        if counts.critical_alerts + counts.high_alerts == 0 {
            println!("Priority alerts: {} ✅", "0".success());
        } else {
            println!(
                "Priority alerts: {} critical, {} high ⚠️",
                counts.critical_alerts.to_string().danger(),
                counts.high_alerts.to_string().warning()
            );
            println!("{}", "Run 'relief triage' to review them.".dim());
        }
    }
}

async fn fetch_counts(api: &ApiClient) -> Result<Counts, relief::api::Error> {
    let (disasters, resources, reports) =
        tokio::try_join!(api.disasters(), api.resources(), api.reports())?;
    Ok(Counts::tally(&disasters, &resources, &reports))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tally_counts_severities_and_alerts() {
        let disasters: Vec<Disaster> = serde_json::from_value(json!([
            {"id": "1", "severity": "high"},
            {"id": "2", "severity": "HIGH"},
            {"id": "3", "severity": "low"},
            {"id": "4"},
        ]))
        .unwrap();
        let reports: Vec<Report> = serde_json::from_value(json!([
            {"id": "a", "content": "People trapped, urgent evacuation", "verification_status": "pending"},
            {"id": "b", "content": "Need medical help", "verification_status": "verified"},
            {"id": "c", "content": "Roads clear"},
        ]))
        .unwrap();

        let counts = Counts::tally(&disasters, &[], &reports);

        assert_eq!(counts.disasters.get(&Severity::High), Some(&2));
        assert_eq!(counts.disaster_total(), 3);
        assert_eq!(counts.pending_reports, 2);
        assert_eq!(counts.critical_alerts, 1);
        assert_eq!(counts.high_alerts, 1);
    }
}
