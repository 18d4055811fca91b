use relief::{KeywordClassifier, PriorityAlert, Route, Tier, filter, priority};
use serde::Serialize;
use tracing::instrument;

use crate::cli::{
    auth,
    output::{self, OutputFormat, Table},
    report::alert_label,
    terminal::Colorize,
    workspace::Workspace,
};

#[derive(Debug, clap::Parser)]
pub struct Triage {
    /// Text to classify; without it, every report is ranked
    text: Vec<String>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

/// One ranked report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Alert<'a> {
    report_id: &'a str,
    disaster_id: Option<&'a str>,
    tier: Tier,
    matched_keywords: &'a [String],
    content: &'a str,
}

impl Triage {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let classifier = KeywordClassifier::default();

        if !self.text.is_empty() {
            let alert = PriorityAlert::from_text(&classifier, &self.text.join(" "));
            if self.output == OutputFormat::Json {
                return output::render_json(&alert);
            }
            if alert.tier == Tier::Normal {
                println!("{}", "NORMAL priority: no urgent keywords".dim());
            } else {
                println!("{}", alert_label(&alert));
            }
            return Ok(());
        }

        let store = auth::enter(workspace, Route::PriorityAlerts).await?;
        let mut reports = store.api().reports().await?;
        filter::newest_first(&mut reports);
        let triaged = priority::triage(&classifier, &reports, |report| report.content.as_deref());

        let alerts: Vec<Alert<'_>> = triaged
            .iter()
            .map(|triaged| Alert {
                report_id: &triaged.item.id,
                disaster_id: triaged.item.disaster_id.as_deref(),
                tier: triaged.alert.tier,
                matched_keywords: &triaged.alert.matched_keywords,
                content: &triaged.alert.source_text,
            })
            .collect();

        if self.output == OutputFormat::Json {
            return output::render_json(&alerts);
        }
        if alerts.is_empty() {
            println!("{}", "No priority alerts".success());
            return Ok(());
        }

        let critical = alerts
            .iter()
            .filter(|alert| alert.tier == Tier::Critical)
            .count();
        let mut table = Table::new(vec!["TIER", "REPORT", "DISASTER", "KEYWORDS", "CONTENT"]);
        for alert in &alerts {
            table.push(vec![
                alert.tier.as_str().to_uppercase(),
                alert.report_id.to_string(),
                output::optional(alert.disaster_id),
                alert.matched_keywords.join(", "),
                output::truncate(alert.content, 48),
            ]);
        }
        table.print();
        println!();
        println!(
            "{}",
            format!(
                "{} alert(s), {critical} critical, of {} report(s)",
                alerts.len(),
                reports.len()
            )
            .dim()
        );
        Ok(())
    }
}
