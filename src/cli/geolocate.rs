use tracing::instrument;

use crate::cli::{
    output::{self, OutputFormat},
    terminal::{self, Colorize},
    workspace::Workspace,
};

#[derive(Debug, clap::Parser)]
pub struct Geolocate {
    /// Free-text description mentioning a place
    #[arg(required = true, num_args = 1..)]
    description: Vec<String>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

impl Geolocate {
    #[instrument(skip_all)]
    pub async fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let client = workspace.client()?;
        let description = self.description.join(" ");

        let spinner = terminal::spinner("Locating");
        let found = client.geolocate(&description).await;
        spinner.finish_and_clear();
        let found = found?;

        if self.output == OutputFormat::Json {
            return output::render_json(&found);
        }
        if found.location_name.is_none() && found.latitude.is_none() {
            println!("{}", "No location found".warning());
            return Ok(());
        }
        output::field("Location", found.location_name.as_deref());
        output::field(
            "Coordinates",
            found
                .latitude
                .zip(found.longitude)
                .map(|(lat, lon)| format!("{lat:.4}, {lon:.4}")),
        );
        Ok(())
    }
}
