use relief::{
    KeywordClassifier, PriorityAlert, Route, Tier,
    domain::{Report, ReportDraft, ReportPatch, VerificationStatus},
    filter,
};
use tracing::instrument;

use crate::cli::{
    auth, perform,
    output::{self, Filters, Format, OutputFormat, Table},
    terminal::{self, Colorize},
    workspace::Workspace,
};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(subcommand)]
    command: ReportCommand,
}

#[derive(Debug, clap::Parser)]
enum ReportCommand {
    /// List reports, newest first
    List {
        #[command(flatten)]
        filters: Filters,

        /// Keep reports about this disaster
        #[arg(long = "disaster", value_name = "ID")]
        disaster_id: Option<String>,

        #[command(flatten)]
        format: Format,
    },

    /// Show a single report
    Show {
        id: String,

        /// Output format (default: table).
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Submit a field report
    Create {
        /// The disaster being reported on
        #[arg(long = "disaster", value_name = "ID")]
        disaster_id: String,

        /// What was observed
        #[arg(long)]
        content: String,

        /// Supporting image
        #[arg(long)]
        image_url: Option<String>,

        /// Tags (comma-separated)
        #[arg(short, long = "tag", value_delimiter = ',', value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Change a report
    ///
    /// Only the fields that are given are sent.
    Update {
        id: String,

        /// Replacement content
        #[arg(long)]
        content: Option<String>,

        /// Replacement image
        #[arg(long)]
        image_url: Option<String>,

        /// Replacement tags (comma-separated)
        #[arg(short, long = "tag", value_delimiter = ',', value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Delete a report
    Delete {
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Reports awaiting review, most urgent first
    Pending {
        #[command(flatten)]
        format: Format,
    },

    /// Record a review outcome for a pending report
    Verify {
        id: String,

        /// verified or unverified
        #[arg(long)]
        status: VerificationStatus,
    },

    /// Ask the backend to assess a report's image
    VerifyImage {
        id: String,

        /// Image to assess (defaults to the report's own image)
        #[arg(long)]
        image_url: Option<String>,

        /// Output format (default: table).
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

impl Command {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self.command {
            ReportCommand::List {
                filters,
                disaster_id,
                format,
            } => {
                let store = auth::enter(workspace, Route::Reports).await?;
                let mut reports = store.api().reports().await?;
                filter::newest_first(&mut reports);
                filter::retain(&mut reports, &filters.criteria());
                if let Some(disaster_id) = disaster_id {
                    reports.retain(|report| {
                        report.disaster_id.as_deref() == Some(disaster_id.as_str())
                    });
                }
                render(&reports, &format)
            }
            ReportCommand::Show { id, output } => show(workspace, id, output).await,
            ReportCommand::Create {
                disaster_id,
                content,
                image_url,
                tags,
            } => {
                let draft = ReportDraft {
                    disaster_id,
                    content,
                    image_url,
                    tags: tags.into_iter().collect(),
                };
                create(workspace, draft).await
            }
            ReportCommand::Update {
                id,
                content,
                image_url,
                tags,
            } => {
                let patch = ReportPatch {
                    content,
                    image_url,
                    tags: (!tags.is_empty()).then(|| tags.into_iter().collect()),
                    verification_status: None,
                };
                update(workspace, id, patch).await
            }
            ReportCommand::Delete { id, yes } => delete(workspace, id, yes).await,
            ReportCommand::Pending { format } => pending(workspace, &format).await,
            ReportCommand::Verify { id, status } => verify(workspace, id, status).await,
            ReportCommand::VerifyImage {
                id,
                image_url,
                output,
            } => verify_image(workspace, id, image_url, output).await,
        }
    }
}

fn render(reports: &[Report], format: &Format) -> anyhow::Result<()> {
    if format.quiet {
        for report in reports {
            println!("{}", report.id);
        }
        return Ok(());
    }
    if format.output == OutputFormat::Json {
        return output::render_json(reports);
    }
    if reports.is_empty() {
        println!("{}", "No reports found".dim());
        return Ok(());
    }

    let mut table = Table::new(vec!["ID", "DISASTER", "BY", "STATUS", "CREATED", "CONTENT"]);
    for report in reports {
        table.push(vec![
            report.id.clone(),
            output::optional(report.disaster_id.as_deref()),
            output::optional(report.username.as_deref()),
            report.verification_status.to_string(),
            report.created_at.map_or_else(
                || "-".to_string(),
                |at| at.format("%Y-%m-%d").to_string(),
            ),
            output::truncate(report.content.as_deref().unwrap_or("-"), 48),
        ]);
    }
    table.print();
    Ok(())
}

async fn show(workspace: &Workspace, id: String, output: OutputFormat) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::Report(id.clone())).await?;
    let report = store.api().report(&id).await?;

    if output == OutputFormat::Json {
        return output::render_json(&report);
    }

    println!("{}", format!("Report {}", report.id).info());
    println!("{}", "──".repeat(20).dim());
    output::field("Disaster", report.disaster_id.as_deref());
    output::field("By", report.username.as_deref().or(report.user_id.as_deref()));
    output::field("Status", Some(report.verification_status));
    output::field(
        "Tags",
        (!report.tags.is_empty()).then(|| output::joined(&report.tags)),
    );
    output::field("Image", report.image_url.as_deref());
    output::field(
        "Created",
        report.created_at.map(|at| at.format("%Y-%m-%d %H:%M UTC")),
    );
    if let Some(content) = &report.content {
        let alert = PriorityAlert::from_text(&KeywordClassifier::default(), content);
        if alert.tier > Tier::Normal {
            output::field("Priority", Some(alert_label(&alert)));
        }
        println!();
        println!("{content}");
    }
    Ok(())
}

async fn create(workspace: &Workspace, draft: ReportDraft) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::CreateReport).await?;
    let api = store.api();

    let report = perform("Submitting report", || api.create_report(&draft)).await?;

    println!(
        "{}",
        format!("✅ Submitted report {}", report.id).success()
    );
    let alert = PriorityAlert::from_text(&KeywordClassifier::default(), &draft.content);
    if alert.tier > Tier::Normal {
        println!("{}", alert_label(&alert));
    }
    Ok(())
}

async fn update(workspace: &Workspace, id: String, patch: ReportPatch) -> anyhow::Result<()> {
    if patch.is_empty() {
        anyhow::bail!("Nothing to update. Pass --content, --image-url or --tag");
    }
    let store = auth::enter(workspace, Route::EditReport(id.clone())).await?;
    let api = store.api();

    perform("Updating report", || api.update_report(&id, &patch)).await?;

    println!("{}", format!("✅ Updated report {id}").success());
    Ok(())
}

async fn delete(workspace: &Workspace, id: String, yes: bool) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::DeleteReport(id.clone())).await?;
    if !terminal::confirm(yes, &format!("Delete report {id}?"))? {
        println!("{}", "Cancelled".dim());
        return Ok(());
    }

    let api = store.api();
    perform("Deleting report", || api.delete_report(&id)).await?;

    println!("{}", format!("✅ Deleted report {id}").success());
    Ok(())
}

async fn pending(workspace: &Workspace, format: &Format) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::ReportVerification).await?;
    let mut reports = store.api().reports().await?;
    reports.retain(|report| !report.verification_status.is_settled());

    // Urgent reports first; ties keep newest-first order.
    filter::newest_first(&mut reports);
    let classifier = KeywordClassifier::default();
    reports.sort_by_cached_key(|report| {
        let text = report.content.as_deref().unwrap_or_default();
        std::cmp::Reverse(PriorityAlert::from_text(&classifier, text).tier)
    });
    render(&reports, format)
}

async fn verify(
    workspace: &Workspace,
    id: String,
    status: VerificationStatus,
) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::ReportVerification).await?;
    let api = store.api();
    let report = api.report(&id).await?;

    perform("Recording review", || api.verify_report(&report, status)).await?;

    println!("{}", format!("✅ Report {id} marked {status}").success());
    Ok(())
}

async fn verify_image(
    workspace: &Workspace,
    id: String,
    image_url: Option<String>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::ReportVerification).await?;
    let api = store.api();
    let image_url = match image_url {
        Some(url) => url,
        None => api
            .report(&id)
            .await?
            .image_url
            .ok_or_else(|| anyhow::anyhow!("Report {id} has no image. Pass --image-url"))?,
    };

    let spinner = terminal::spinner("Analysing image");
    let analysis = api.verify_image(&id, &image_url).await;
    spinner.finish_and_clear();
    let analysis = analysis?;

    if output == OutputFormat::Json {
        return output::render_json(&analysis);
    }
    let verdict = match analysis.is_authentic {
        Some(true) => "Authentic".success(),
        Some(false) => "Potentially misleading".danger(),
        None => "inconclusive".warning(),
    };
    output::field("Verdict", Some(verdict));
    output::field(
        "Confidence",
        analysis.confidence.map(|c| format!("{:.0}%", percent(c))),
    );
    if let Some(text) = &analysis.analysis {
        println!();
        println!("{text}");
    }
    if let Some(text) = &analysis.recommendations {
        println!();
        println!("{}", "Recommendations".info());
        println!("{text}");
    }
    Ok(())
}

/// Confidence as a percentage; fractions are scaled up.
fn percent(confidence: f64) -> f64 {
    if confidence <= 1.0 {
        confidence * 100.0
    } else {
        confidence
    }
}

pub fn alert_label(alert: &PriorityAlert) -> String {
    let label = format!(
        "{} priority: {}",
        alert.tier.as_str().to_uppercase(),
        alert.matched_keywords.join(", ")
    );
    match alert.tier {
        Tier::Critical => label.danger(),
        Tier::High => label.warning(),
        Tier::Normal => label,
    }
}
