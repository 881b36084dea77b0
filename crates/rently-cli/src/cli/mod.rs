//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rently_core::api::ApiClient;
use rently_core::auth::AuthController;
use rently_core::config::Config;
use rently_core::session::FsSessionStore;

mod commands;

use commands::Controller;

#[derive(Parser)]
#[command(name = "rently")]
#[command(version = "0.1")]
#[command(about = "Rental marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Signup {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Confirmation password (prompted when omitted)
        #[arg(long)]
        confirm: Option<String>,

        /// Optional contact phone number
        #[arg(long)]
        phone: Option<String>,
    },

    /// Log out and clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show or update the user profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Search listings by district and city
    Search {
        #[arg(long)]
        district: Option<String>,

        #[arg(long)]
        city: Option<String>,
    },

    /// List your own listings
    Mine,

    /// Publish a new listing
    Add {
        /// Listing type (e.g. 1BHK, 2BHK)
        #[arg(long = "type", value_name = "TYPE")]
        kind: String,

        /// Contact phone number
        #[arg(long)]
        phone: String,

        #[arg(long)]
        district: String,

        #[arg(long)]
        city: String,

        /// Path to the listing image (required)
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
    },

    /// Delete one of your listings
    Delete {
        #[arg(value_name = "ID")]
        id: i64,
    },

    /// Download a listing image
    Image {
        #[arg(value_name = "ID")]
        id: i64,

        /// Output file (defaults to house-<ID>.jpg)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List known districts
    Districts {
        /// Read the location document from a local file
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// List the cities of a district
    Cities {
        #[arg(value_name = "DISTRICT")]
        district: String,

        /// Read the location document from a local file
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Show the profile of the signed-in user
    Show,
    /// Update the contact phone number
    SetPhone {
        #[arg(value_name = "PHONE")]
        phone: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RENTLY_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the process-wide controller: one API client, the file-backed
/// session store, and the settled auth state.
fn connect(config: &Config) -> Result<Controller> {
    let api = ApiClient::from_config(config).context("configure API client")?;
    let mut controller = AuthController::new(api, FsSessionStore::open_default());
    controller.restore_session();
    tracing::debug!(authenticated = controller.state().is_authenticated(), "session restored");
    Ok(controller)
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    match cli.command {
        Commands::Login { username, password } => {
            let mut controller = connect(&config)?;
            commands::auth::login(&mut controller, username, password).await
        }

        Commands::Signup {
            username,
            email,
            password,
            confirm,
            phone,
        } => {
            let mut controller = connect(&config)?;
            commands::auth::signup(
                &mut controller,
                commands::auth::SignupArgs {
                    username,
                    email,
                    password,
                    confirm,
                    phone,
                },
            )
            .await
        }

        Commands::Logout => {
            let mut controller = connect(&config)?;
            commands::auth::logout(&mut controller)
        }

        Commands::Whoami => {
            let controller = connect(&config)?;
            commands::auth::whoami(&controller)
        }

        Commands::Profile { command } => {
            let mut controller = connect(&config)?;
            match command {
                ProfileCommands::Show => commands::profile::show(&mut controller).await,
                ProfileCommands::SetPhone { phone } => {
                    commands::profile::set_phone(&mut controller, &phone).await
                }
            }
        }

        Commands::Search { district, city } => {
            let controller = connect(&config)?;
            commands::listings::search(&controller, district.as_deref(), city.as_deref()).await
        }

        Commands::Mine => {
            let mut controller = connect(&config)?;
            commands::listings::mine(&mut controller).await
        }

        Commands::Add {
            kind,
            phone,
            district,
            city,
            image,
        } => {
            let mut controller = connect(&config)?;
            commands::listings::add(
                &mut controller,
                commands::listings::AddArgs {
                    kind,
                    phone,
                    district,
                    city,
                    image,
                },
            )
            .await
        }

        Commands::Delete { id } => {
            let mut controller = connect(&config)?;
            commands::listings::delete(&mut controller, id).await
        }

        Commands::Image { id, output } => {
            let controller = connect(&config)?;
            commands::listings::image(&controller, id, output).await
        }

        Commands::Districts { file } => {
            commands::locations::districts(&config, file.as_deref()).await
        }

        Commands::Cities { district, file } => {
            commands::locations::cities(&config, &district, file.as_deref()).await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
