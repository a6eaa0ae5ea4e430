mod commands;
mod logging;

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use product_video_ads::base_config::ConfigField;
use product_video_ads::base_config::ConfigGroup;

#[derive(Parser)]
#[command(
    name = "pva",
    version,
    about = "Validates video ad campaigns and exports render jobs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Campaign database file
    #[arg(long, env = "PVA_DATABASE", default_value = "pva.duckdb", global = true)]
    database: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// OAuth access token for Cloud Storage, Merchant Center and YouTube
    #[arg(long, env = "PVA_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the Base Config layout and every table sheet
    Init,
    /// Fill the sheets with an example campaign
    Populate,
    /// Delete every sheet
    Reset,
    /// Replace the sheets with those of an .xlsx or .ods workbook
    Import {
        /// Local path or http(s) URL of the workbook
        workbook: String,
        /// Only import sheets matching these glob patterns
        #[arg(long = "sheet")]
        sheets: Vec<String>,
    },
    /// Validate the config tables without exporting
    Validate,
    /// Compile changed ad groups and upload them for rendering
    Export {
        /// Write to a local directory instead of the configured bucket
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },
    /// Import products from Merchant Center into Offers Feed
    FeedImport,
    /// Publish rendered videos and record their ids
    UploadVideos {
        /// Read videos from a local directory instead of the configured bucket
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },
    /// Print the Status ledger
    Status,
    /// Read or change a Base Config setting
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a setting
    Get { group: ConfigGroup, field: ConfigField },
    /// Change a setting
    Set {
        group: ConfigGroup,
        field: ConfigField,
        value: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let database = cli.database.as_path();
    let token = cli.access_token.as_deref();
    match cli.command {
        Commands::Init => commands::setup::init(database),
        Commands::Populate => commands::setup::populate(database),
        Commands::Reset => commands::setup::reset(database),
        Commands::Import { workbook, sheets } => commands::import::execute(database, &workbook, &sheets),
        Commands::Validate => commands::export::validate(database),
        Commands::Export { local_dir } => commands::export::execute(database, local_dir.as_deref(), token),
        Commands::FeedImport => commands::feed::execute(database, token),
        Commands::UploadVideos { local_dir } => commands::videos::execute(database, local_dir.as_deref(), token),
        Commands::Status => commands::status::execute(database),
        Commands::Config { action } => match action {
            ConfigAction::Get { group, field } => commands::config::get(database, group, field),
            ConfigAction::Set { group, field, value } => commands::config::set(database, group, field, &value),
        },
    }
}
