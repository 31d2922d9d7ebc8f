#![deny(unused_must_use)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use auth::authenticator::AuthError;
use backend::{readiness::RequiredArtifacts, Backend, BackendOptions};
use bridge::handle::FrontendHandle;
use clap::{Parser, Subcommand};

use crate::progress::ProgressRenderer;

pub mod panic;
pub mod progress;

const PASSWORD_ENV: &str = "EMINIUM_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "eminium_launcher", version, about = "Downloads, repairs and launches the Eminium modpack")]
struct Cli {
    /// Launcher data directory
    #[arg(long, env = "EMINIUM_HOME", global = true)]
    root: Option<PathBuf>,
    /// Modpack archive shipped with the launcher
    #[arg(long, global = true)]
    bundled_archive: Option<PathBuf>,
    /// Leave folders from older launcher versions untouched
    #[arg(long, global = true)]
    skip_migration: bool,
    /// Hide progress bars
    #[arg(long, short, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ensure every game file is present and valid
    Prepare {
        /// Run every step even when all required files exist
        #[arg(long)]
        full: bool,
    },
    /// Report whether the required files are present, without touching anything
    Check,
    /// Delete corrupt library archives so the next prepare downloads them again
    Sweep,
    /// Download the modpack and merge it into the game directory
    SyncBundle {
        /// Download again even if the cached archive matches
        #[arg(long)]
        force: bool,
    },
    /// Sign in to the platform. The password is read from EMINIUM_PASSWORD or stdin
    Login {
        #[arg(long)]
        email: String,
        /// Two-factor code
        #[arg(long)]
        code: Option<String>,
    },
    /// Forget the signed-in profile
    Logout,
    /// Show the signed-in profile
    Profile,
    /// Show server status and platform latency
    Status,
    /// Print the configuration handed to the game launch routine
    LaunchConfig,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    crate::panic::install_hook();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to initialize Tokio runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let (sender, receiver) = FrontendHandle::channel();
    let renderer = ProgressRenderer::spawn(receiver, cli.quiet);

    let backend = Backend::new(BackendOptions {
        root: cli.root,
        bundled_archive: cli.bundled_archive,
        skip_migration: cli.skip_migration,
    }, sender)?;

    let result = execute(&backend, cli.command).await;
    renderer.finish();
    result
}

async fn execute(backend: &Backend, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Prepare { full } => {
            let preparer = backend.preparer();
            let outcome = if full {
                preparer.ensure_all().await
            } else {
                preparer.prepare_game().await
            };
            println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
            Ok(exit_code(outcome.is_ok()))
        },
        Command::Check => {
            let settings = backend.settings();
            let required = RequiredArtifacts::resolve(backend.directories(), settings.minecraft_version, settings.forge_version);
            let missing = required.missing();
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "ready": missing.is_empty(),
                "missing": missing,
            }))?);
            Ok(exit_code(missing.is_empty()))
        },
        Command::Sweep => {
            let removed = backend.sweep().await;
            println!("Removed {removed} corrupt archives");
            Ok(ExitCode::SUCCESS)
        },
        Command::SyncBundle { force } => {
            backend.directories().create_all()?;
            match backend.sync_bundle(force).await? {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => println!("No modpack URL is configured"),
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::Login { email, code } => {
            let password = read_password()?;
            match backend.login(&email, &password, code.as_deref()).await {
                Ok(profile) => {
                    println!("Signed in as {} ({})", profile.name, profile.uuid);
                    Ok(ExitCode::SUCCESS)
                },
                Err(AuthError::TwoFactorRequired) => {
                    eprintln!("A two-factor code is required, run again with --code");
                    Ok(ExitCode::FAILURE)
                },
                Err(error) => Err(error).context("Sign in failed"),
            }
        },
        Command::Logout => {
            backend.logout()?;
            println!("Signed out");
            Ok(ExitCode::SUCCESS)
        },
        Command::Profile => {
            let Some(profile) = backend.profile() else {
                println!("Not signed in");
                return Ok(ExitCode::FAILURE);
            };
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "name": profile.name,
                "uuid": profile.uuid,
                "email": profile.email,
                "role": profile.role,
                "grade": profile.grade,
                "grade_color": profile.grade_color,
                "banned": profile.banned,
                "obtained_at": profile.obtained_at,
            }))?);
            Ok(ExitCode::SUCCESS)
        },
        Command::Status => {
            match backend.ping().await {
                Ok(latency) => println!("Platform reachable in {} ms", latency.as_millis()),
                Err(error) => println!("Platform unreachable: {error}"),
            }
            for server in backend.server_status().await? {
                let name = server.name.as_deref().unwrap_or("server");
                let state = if server.online { "online" } else { "offline" };
                println!("{name}: {state} ({}/{})", server.players, server.max_players);
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::LaunchConfig => {
            let configuration = backend.launch_configuration().await?;
            println!("{}", serde_json::to_string_pretty(&configuration)?);
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut password = String::new();
    std::io::stdin().read_line(&mut password).context("Failed to read password")?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}
