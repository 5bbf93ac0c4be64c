use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "gar-registrar",
    version,
    about = "Register Google Artifact Registry repositories with CrowdStrike Falcon"
)]
pub struct Args {
    /// Remove every GAR registration from Falcon and delete the scanner service account
    #[arg(long)]
    pub deprovision: bool,

    /// Skip the confirmation prompt when deprovisioning
    #[arg(short, long)]
    pub yes: bool,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
