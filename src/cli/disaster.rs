use relief::{
    Route,
    domain::{Disaster, DisasterDraft, OfficialUpdate, Severity},
    filter,
};
use tracing::instrument;

use crate::cli::{
    auth, perform,
    output::{self, Filters, Format, OutputFormat, Table},
    resource,
    terminal::{self, Colorize},
    workspace::Workspace,
};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(subcommand)]
    command: DisasterCommand,
}

#[derive(Debug, clap::Parser)]
enum DisasterCommand {
    /// List disasters, newest first
    List {
        #[command(flatten)]
        filters: Filters,

        #[command(flatten)]
        format: Format,
    },

    /// Show a single disaster
    Show {
        id: String,

        /// Output format (default: table).
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Record a new disaster
    Create(Fields),

    /// Change the details of a disaster
    ///
    /// Fields that are not given keep their current value.
    Update {
        id: String,

        #[command(flatten)]
        fields: Fields,
    },

    /// Delete a disaster
    Delete {
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Official updates published about a disaster
    Updates {
        id: String,

        #[command(flatten)]
        filters: Filters,

        #[command(flatten)]
        format: Format,
    },

    /// Resources attached to a disaster
    Resources {
        id: String,

        #[command(flatten)]
        filters: Filters,

        #[command(flatten)]
        format: Format,
    },
}

/// Disaster details given on the command line.
#[derive(Debug, Clone, Default, clap::Args)]
struct Fields {
    /// Short headline
    #[arg(long)]
    title: Option<String>,

    /// Human-readable place name
    #[arg(long = "location")]
    location_name: Option<String>,

    /// What is happening
    #[arg(long)]
    description: Option<String>,

    /// LOW, MEDIUM, HIGH or CRITICAL (new disasters default to MEDIUM)
    #[arg(long)]
    severity: Option<Severity>,

    /// Tags (comma-separated); replaces the current tags
    #[arg(short, long = "tag", value_delimiter = ',', value_name = "TAG")]
    tags: Vec<String>,

    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Fill in a missing location and coordinates from the description
    #[arg(long)]
    locate: bool,
}

impl Fields {
    /// The draft to send, keeping `current` values for omitted fields.
    fn draft(self, current: Option<&Disaster>) -> DisasterDraft {
        let kept = |field: fn(&Disaster) -> Option<&String>| {
            current.and_then(field).cloned().unwrap_or_default()
        };
        DisasterDraft {
            title: self.title.unwrap_or_else(|| kept(|d| d.title.as_ref())),
            location_name: self
                .location_name
                .unwrap_or_else(|| kept(|d| d.location_name.as_ref())),
            description: self
                .description
                .unwrap_or_else(|| kept(|d| d.description.as_ref())),
            severity: self
                .severity
                .or_else(|| current.and_then(|d| d.severity))
                .unwrap_or_default(),
            tags: if self.tags.is_empty() {
                current.map(|d| d.tags.clone()).unwrap_or_default()
            } else {
                self.tags.into_iter().collect()
            },
            latitude: self.latitude.or_else(|| current.and_then(|d| d.latitude)),
            longitude: self.longitude.or_else(|| current.and_then(|d| d.longitude)),
        }
    }
}

impl Command {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self.command {
            DisasterCommand::List { filters, format } => list(workspace, &filters, &format).await,
            DisasterCommand::Show { id, output } => show(workspace, id, output).await,
            DisasterCommand::Create(fields) => create(workspace, fields).await,
            DisasterCommand::Update { id, fields } => update(workspace, id, fields).await,
            DisasterCommand::Delete { id, yes } => delete(workspace, id, yes).await,
            DisasterCommand::Updates {
                id,
                filters,
                format,
            } => updates(workspace, id, &filters, &format).await,
            DisasterCommand::Resources {
                id,
                filters,
                format,
            } => {
                let store = auth::enter(workspace, Route::DisasterResources(id.clone())).await?;
                let mut resources = store.api().resources_for_disaster(&id).await?;
                filter::retain(&mut resources, &filters.criteria());
                resource::render(&resources, &format)
            }
        }
    }
}

async fn list(workspace: &Workspace, filters: &Filters, format: &Format) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::Disasters).await?;
    let mut disasters = store.api().disasters().await?;
    filter::newest_first(&mut disasters);
    filter::retain(&mut disasters, &filters.criteria());
    render(&disasters, format)
}

fn render(disasters: &[Disaster], format: &Format) -> anyhow::Result<()> {
    if format.quiet {
        for disaster in disasters {
            println!("{}", disaster.id);
        }
        return Ok(());
    }
    if format.output == OutputFormat::Json {
        return output::render_json(disasters);
    }
    if disasters.is_empty() {
        println!("{}", "No disasters found".dim());
        return Ok(());
    }

    let mut table = Table::new(vec!["ID", "TITLE", "SEVERITY", "LOCATION", "TAGS", "CREATED"]);
    for disaster in disasters {
        table.push(vec![
            disaster.id.clone(),
            output::optional(disaster.title.as_deref()),
            disaster
                .severity
                .map_or_else(|| "-".to_string(), |severity| severity.to_string()),
            output::optional(disaster.location_name.as_deref()),
            output::joined(&disaster.tags),
            disaster.created_at.map_or_else(
                || "-".to_string(),
                |at| at.format("%Y-%m-%d").to_string(),
            ),
        ]);
    }
    table.print();
    Ok(())
}

async fn show(workspace: &Workspace, id: String, output: OutputFormat) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::Disaster(id.clone())).await?;
    let disaster = store.api().disaster(&id).await?;

    if output == OutputFormat::Json {
        return output::render_json(&disaster);
    }

    println!(
        "{}",
        disaster.title.as_deref().unwrap_or("(untitled)").info()
    );
    println!("{}", "──".repeat(20).dim());
    output::field("Id", Some(&disaster.id));
    output::field("Severity", disaster.severity);
    output::field("Location", disaster.location_name.as_deref());
    output::field(
        "Coordinates",
        disaster
            .latitude
            .zip(disaster.longitude)
            .map(|(lat, lon)| format!("{lat:.4}, {lon:.4}")),
    );
    output::field(
        "Tags",
        (!disaster.tags.is_empty()).then(|| output::joined(&disaster.tags)),
    );
    output::field(
        "Created",
        disaster.created_at.map(|at| at.format("%Y-%m-%d %H:%M UTC")),
    );
    if let Some(description) = &disaster.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

async fn create(workspace: &Workspace, fields: Fields) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::CreateDisaster).await?;
    let api = store.api();
    let locate = fields.locate;
    let mut draft = fields.draft(None);
    if locate {
        locate_draft(api, &mut draft).await?;
    }

    let disaster = perform("Creating disaster", || api.create_disaster(&draft)).await?;

    println!(
        "{}",
        format!("✅ Created disaster {}", disaster.id).success()
    );
    Ok(())
}

async fn update(workspace: &Workspace, id: String, fields: Fields) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::EditDisaster(id.clone())).await?;
    let api = store.api();
    let current = api.disaster(&id).await?;
    let locate = fields.locate;
    let mut draft = fields.draft(Some(&current));
    if locate {
        locate_draft(api, &mut draft).await?;
    }

    perform("Updating disaster", || api.update_disaster(&id, &draft)).await?;

    println!("{}", format!("✅ Updated disaster {id}").success());
    Ok(())
}

async fn delete(workspace: &Workspace, id: String, yes: bool) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::DeleteDisaster(id.clone())).await?;
    if !terminal::confirm(yes, &format!("Delete disaster {id}?"))? {
        println!("{}", "Cancelled".dim());
        return Ok(());
    }

    let api = store.api();
    perform("Deleting disaster", || api.delete_disaster(&id)).await?;

    println!("{}", format!("✅ Deleted disaster {id}").success());
    Ok(())
}

async fn updates(
    workspace: &Workspace,
    id: String,
    filters: &Filters,
    format: &Format,
) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::OfficialUpdates(id.clone())).await?;
    let mut updates = store.api().official_updates(&id).await?;
    filter::newest_first(&mut updates);
    filter::retain(&mut updates, &filters.criteria());

    if format.quiet {
        for update in &updates {
            println!("{}", output::optional(update.id.as_deref()));
        }
        return Ok(());
    }
    if format.output == OutputFormat::Json {
        return output::render_json(&updates);
    }
    if updates.is_empty() {
        println!("{}", "No official updates".dim());
        return Ok(());
    }

    let mut table = Table::new(vec!["PUBLISHED", "CATEGORY", "SOURCE", "TITLE"]);
    for update in &updates {
        table.push(update_row(update));
    }
    table.print();
    Ok(())
}

fn update_row(update: &OfficialUpdate) -> Vec<String> {
    vec![
        update.published_at.map_or_else(
            || "-".to_string(),
            |at| at.format("%Y-%m-%d %H:%M").to_string(),
        ),
        update
            .category
            .as_ref()
            .map_or_else(|| "-".to_string(), |category| category.to_string()),
        output::optional(update.source.as_deref()),
        output::optional(update.title.as_deref()),
    ]
}

/// Complete a draft's location from its description.
async fn locate_draft(api: &relief::ApiClient, draft: &mut DisasterDraft) -> anyhow::Result<()> {
    let spinner = terminal::spinner("Locating");
    let found = api.geolocate(&draft.description).await;
    spinner.finish_and_clear();
    let found = found?;

    if draft.location_name.trim().is_empty() {
        if let Some(name) = found.location_name {
            draft.location_name = name;
        }
    }
    if draft.latitude.is_none() && draft.longitude.is_none() {
        draft.latitude = found.latitude;
        draft.longitude = found.longitude;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Disaster {
        serde_json::from_value(serde_json::json!({
            "id": "d1",
            "title": "River flood",
            "location_name": "Riverside",
            "description": "Levee breach",
            "severity": "HIGH",
            "tags": ["flood"],
            "latitude": 40.0,
            "longitude": -73.0,
        }))
        .unwrap()
    }

    #[test]
    fn update_keeps_omitted_fields() {
        let fields = Fields {
            severity: Some(Severity::Critical),
            ..Fields::default()
        };

        let draft = fields.draft(Some(&current()));

        assert_eq!(draft.title, "River flood");
        assert_eq!(draft.location_name, "Riverside");
        assert_eq!(draft.severity, Severity::Critical);
        assert_eq!(draft.tags.len(), 1);
        assert_eq!(draft.latitude, Some(40.0));
    }

    #[test]
    fn given_tags_replace_current_tags() {
        let fields = Fields {
            tags: vec!["urgent".to_string(), "evacuation".to_string()],
            ..Fields::default()
        };

        let draft = fields.draft(Some(&current()));

        assert!(draft.tags.contains("urgent"));
        assert!(!draft.tags.contains("flood"));
    }

    #[test]
    fn new_draft_defaults_to_medium() {
        let fields = Fields {
            title: Some("Wildfire".to_string()),
            ..Fields::default()
        };

        let draft = fields.draft(None);

        assert_eq!(draft.severity, Severity::Medium);
        assert!(draft.validated().is_err());
    }
}
