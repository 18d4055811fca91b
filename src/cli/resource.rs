use relief::{
    Route,
    api::NearbyQuery,
    domain::{Resource, ResourceDraft, ResourceStatus, ResourceType},
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
    command: ResourceCommand,
}

#[derive(Debug, clap::Parser)]
enum ResourceCommand {
    /// List resources
    List {
        #[command(flatten)]
        filters: Filters,

        /// Keep resources of these types (comma-separated)
        #[arg(long = "type", value_delimiter = ',', value_name = "TYPE")]
        kinds: Vec<String>,

        #[command(flatten)]
        format: Format,
    },

    /// Show a single resource
    Show {
        id: String,

        /// Output format (default: table).
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Register a new resource
    Create(Fields),

    /// Change the details of a resource
    ///
    /// Fields that are not given keep their current value.
    Update {
        id: String,

        #[command(flatten)]
        fields: Fields,
    },

    /// Delete a resource
    Delete {
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Resources within a radius of a point
    Nearby {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,

        /// Search radius (the backend default applies if omitted)
        #[arg(long)]
        radius: Option<f64>,

        #[command(flatten)]
        format: Format,
    },
}

/// Resource details given on the command line.
#[derive(Debug, Clone, Default, clap::Args)]
struct Fields {
    /// Display name
    #[arg(long)]
    name: Option<String>,

    /// supplies, personnel, vehicle, facility, medical, shelter, or any other kind
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<ResourceType>,

    /// How many units are held (new resources default to 1)
    #[arg(long)]
    quantity: Option<u32>,

    /// Where the resource is
    #[arg(long)]
    location: Option<String>,

    /// available, deployed, active, standby or depleted
    #[arg(long)]
    status: Option<ResourceStatus>,

    /// Free-text description
    #[arg(long)]
    description: Option<String>,

    /// The disaster to attach the resource to
    #[arg(long = "disaster", value_name = "ID")]
    disaster_id: Option<String>,
}

impl Fields {
    /// The draft to send, keeping `current` values for omitted fields.
    fn draft(self, current: Option<&Resource>) -> ResourceDraft {
        let base = current.map_or_else(
            || ResourceDraft {
                quantity: 1,
                ..ResourceDraft::default()
            },
            ResourceDraft::from,
        );
        ResourceDraft {
            name: self.name.unwrap_or(base.name),
            kind: self.kind.unwrap_or(base.kind),
            quantity: self.quantity.unwrap_or(base.quantity),
            location: self.location.unwrap_or(base.location),
            status: self.status.unwrap_or(base.status),
            description: self.description.or(base.description),
            disaster_id: self.disaster_id.or(base.disaster_id),
        }
    }
}

impl Command {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self.command {
            ResourceCommand::List {
                filters,
                kinds,
                format,
            } => {
                let store = auth::enter(workspace, Route::Resources).await?;
                let mut resources = store.api().resources().await?;
                filter::retain(&mut resources, &filters.criteria().kinds(&kinds));
                render(&resources, &format)
            }
            ResourceCommand::Show { id, output } => show(workspace, id, output).await,
            ResourceCommand::Create(fields) => create(workspace, fields).await,
            ResourceCommand::Update { id, fields } => update(workspace, id, fields).await,
            ResourceCommand::Delete { id, yes } => delete(workspace, id, yes).await,
            ResourceCommand::Nearby {
                latitude,
                longitude,
                radius,
                format,
            } => {
                let store = auth::enter(workspace, Route::NearbyResources).await?;
                let query = NearbyQuery {
                    latitude,
                    longitude,
                    radius,
                };
                let resources = store.api().nearby_resources(&query).await?;
                render(&resources, &format)
            }
        }
    }
}

pub fn render(resources: &[Resource], format: &Format) -> anyhow::Result<()> {
    if format.quiet {
        for resource in resources {
            println!("{}", resource.id);
        }
        return Ok(());
    }
    if format.output == OutputFormat::Json {
        return output::render_json(resources);
    }
    if resources.is_empty() {
        println!("{}", "No resources found".dim());
        return Ok(());
    }

    let mut table = Table::new(vec!["ID", "NAME", "TYPE", "QTY", "STATUS", "LOCATION"]);
    for resource in resources {
        table.push(vec![
            resource.id.clone(),
            output::optional(resource.name.as_deref()),
            resource
                .kind
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            resource.quantity.to_string(),
            resource
                .status
                .map_or_else(|| "-".to_string(), |status| status.to_string()),
            output::optional(resource.location.as_deref()),
        ]);
    }
    table.print();
    Ok(())
}

async fn show(workspace: &Workspace, id: String, output: OutputFormat) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::Resource(id.clone())).await?;
    let resource = store.api().resource(&id).await?;

    if output == OutputFormat::Json {
        return output::render_json(&resource);
    }

    println!(
        "{}",
        resource.name.as_deref().unwrap_or("(unnamed)").info()
    );
    println!("{}", "──".repeat(20).dim());
    output::field("Id", Some(&resource.id));
    output::field("Type", resource.kind.as_ref());
    output::field("Quantity", Some(resource.quantity));
    output::field("Status", resource.status);
    output::field("Location", resource.location.as_deref());
    output::field("Disaster", resource.disaster_id.as_deref());
    if let Some(description) = &resource.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

async fn create(workspace: &Workspace, fields: Fields) -> anyhow::Result<()> {
    let route = fields
        .disaster_id
        .clone()
        .map_or(Route::CreateResource, Route::CreateDisasterResource);
    let store = auth::enter(workspace, route).await?;
    let api = store.api();
    let draft = fields.draft(None);

    let resource = perform("Creating resource", || api.create_resource(&draft)).await?;

    println!(
        "{}",
        format!("✅ Created resource {}", resource.id).success()
    );
    Ok(())
}

async fn update(workspace: &Workspace, id: String, fields: Fields) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::EditResource(id.clone())).await?;
    let api = store.api();
    let current = api.resource(&id).await?;
    let draft = fields.draft(Some(&current));

    perform("Updating resource", || api.update_resource(&id, &draft)).await?;

    println!("{}", format!("✅ Updated resource {id}").success());
    Ok(())
}

async fn delete(workspace: &Workspace, id: String, yes: bool) -> anyhow::Result<()> {
    let store = auth::enter(workspace, Route::DeleteResource(id.clone())).await?;
    if !terminal::confirm(yes, &format!("Delete resource {id}?"))? {
        println!("{}", "Cancelled".dim());
        return Ok(());
    }

    let api = store.api();
    perform("Deleting resource", || api.delete_resource(&id)).await?;

    println!("{}", format!("✅ Deleted resource {id}").success());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_resource_defaults() {
        let fields = Fields {
            name: Some("Water".to_string()),
            location: Some("Depot 4".to_string()),
            ..Fields::default()
        };

        let draft = fields.draft(None);

        assert_eq!(draft.kind, ResourceType::Supplies);
        assert_eq!(draft.status, ResourceStatus::Available);
        assert_eq!(draft.quantity, 1);
        assert!(draft.validated().is_ok());
    }

    #[test]
    fn update_keeps_current_values() {
        let current: Resource = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "name": "Field hospital",
            "type": "medical",
            "quantity": 3,
            "location": "Stadium",
            "status": "deployed",
            "disaster_id": "d1",
        }))
        .unwrap();
        let fields = Fields {
            status: Some(ResourceStatus::Depleted),
            ..Fields::default()
        };

        let draft = fields.draft(Some(&current));

        assert_eq!(draft.name, "Field hospital");
        assert_eq!(draft.kind, ResourceType::Medical);
        assert_eq!(draft.quantity, 3);
        assert_eq!(draft.status, ResourceStatus::Depleted);
        assert_eq!(draft.disaster_id.as_deref(), Some("d1"));
    }
}
