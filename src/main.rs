// NeuroSuite - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading and logging initialisation (debug mode support)
// 3. Session restoration, awaited before any command that needs a session
// 4. Dispatch to the analysis screens and result rendering
//
// Exit codes: 0 success, 2 when the user must log in, 1 for anything else.

use clap::{Parser, Subcommand};
use neurosuite::app::screens::{Analyzer, Screen, ScreenSpec};
use neurosuite::app::session::SessionManager;
use neurosuite::app::workflow::SubmitOutcome;
use neurosuite::core::model::{
    AnalysisKind, ClassificationResult, Credentials, SessionUser, SignUpRequest, SleepStageInfo,
    UploadFile,
};
use neurosuite::core::report;
use neurosuite::platform::config::{self, AppConfig, PlatformPaths};
use neurosuite::platform::fs::candidate_from_path;
use neurosuite::platform::http::HttpApi;
use neurosuite::platform::token_store::FileTokenStore;
use neurosuite::util;
use neurosuite::util::error::{Result, ValidationError};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// NeuroSuite - EEG analysis from the command line.
#[derive(Parser, Debug)]
#[command(name = "neurosuite", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Service base URL; overrides config.toml.
    #[arg(long = "api-url", env = "NEUROSUITE_API_URL", global = true)]
    api_url: Option<String>,

    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and keep the session for later commands.
    Login {
        #[arg(short, long)]
        email: String,

        /// Taken from NEUROSUITE_PASSWORD, or prompted for on stdin.
        #[arg(long, env = "NEUROSUITE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log into it.
    Signup {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        full_name: String,

        #[arg(long)]
        organization: Option<String>,

        #[arg(long)]
        role: Option<String>,

        /// Taken from NEUROSUITE_PASSWORD, or prompted for (twice) on stdin.
        #[arg(long, env = "NEUROSUITE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Accept the Terms and Conditions.
        #[arg(long)]
        agree_terms: bool,
    },

    /// Forget the stored session.
    Logout,

    #[command(flatten)]
    Restored(RestoredCommand),
}

/// Commands that run after the stored session has been restored.
#[derive(Subcommand, Debug)]
enum RestoredCommand {
    /// Show the logged-in user.
    Whoami,

    /// Decode brain activity from an EEG recording (.csv, .txt, .edf).
    Decode { file: PathBuf },

    /// Classify the sleep stage of an EDF recording.
    Sleep {
        file: PathBuf,

        /// EEG channel index to classify.
        #[arg(short, long, default_value_t = util::constants::DEFAULT_SLEEP_CHANNEL)]
        channel: u32,

        /// Show the file's channels and recording details instead.
        #[arg(long)]
        info: bool,
    },

    /// Recognise the emotional state in an EDF recording.
    Emotion { file: PathBuf },

    /// List the sleep stages the classifier distinguishes.
    Stages,

    /// Describe the emotion recognition model.
    Emotions,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = PlatformPaths::resolve();
    let (mut app_config, mut warnings) = config::load_config(&paths.config_dir);
    if let Some(raw) = cli.api_url.as_deref() {
        warnings.extend(app_config.override_base_url(raw));
    }

    util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    for warning in &warnings {
        tracing::warn!("{}", warning);
        eprintln!("Warning: {warning}");
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        api = %app_config.api_base_url,
        debug = cli.debug,
        "NeuroSuite starting"
    );

    match run(cli, &app_config, &paths).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {e}");
            if e.is_auth_failure() {
                eprintln!("Run `neurosuite login` to sign in.");
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli, app_config: &AppConfig, paths: &PlatformPaths) -> Result<()> {
    let http = Arc::new(HttpApi::from_config(app_config)?);
    let store = Arc::new(FileTokenStore::new(paths.token_file()));
    let session = Arc::new(SessionManager::new(http.clone(), store));
    let analyzer = Arc::new(Analyzer::new(session.clone(), http));
    let json = cli.json;

    match cli.command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Password")?,
            };
            let user = session.sign_in(&Credentials::new(email, password)).await?;
            print_user(&user, json, "Logged in as");
        }

        Command::Signup {
            email,
            full_name,
            organization,
            role,
            password,
            agree_terms,
        } => {
            let (password, confirm_password) = match password {
                Some(p) => (p.clone(), p),
                None => (prompt("Password")?, prompt("Confirm password")?),
            };
            let request = SignUpRequest {
                email,
                full_name,
                password,
                confirm_password,
                organization,
                role,
                agreed_to_terms: agree_terms,
            };
            let user = session.sign_up(&request).await?;
            print_user(&user, json, "Account created. Logged in as");
        }

        Command::Logout => {
            session.logout();
            println!("Logged out");
        }

        Command::Restored(command) => {
            session.restore_session().await;
            run_with_session(command, app_config, &session, &analyzer, json).await?;
        }
    }
    Ok(())
}

async fn run_with_session(
    command: RestoredCommand,
    app_config: &AppConfig,
    session: &SessionManager,
    analyzer: &Arc<Analyzer>,
    json: bool,
) -> Result<()> {
    let screen = |kind| Screen::new(ScreenSpec::for_kind(kind, app_config), analyzer.clone());

    match command {
        RestoredCommand::Whoami => {
            let user = session.require_user()?;
            print_user(&user, json, "Logged in as");
        }

        RestoredCommand::Decode { file } => {
            session.require_user()?;
            let result = submit_file(&screen(AnalysisKind::EegDecoder), &file).await?;
            print_result(&result, &[], json);
        }

        RestoredCommand::Sleep {
            file,
            channel,
            info,
        } => {
            session.require_user()?;
            let screen = screen(AnalysisKind::SleepStage).with_channel(channel);
            if info {
                let candidate = screen.select_file(Some(load_candidate(&file)?))?;
                let details = analyzer.sleep_file_info(&candidate).await?;
                emit(|out| {
                    if json {
                        report::write_json(&details, out)
                    } else {
                        report::write_file_info(&details, out)
                    }
                });
            } else {
                let result = submit_file(&screen, &file).await?;
                // Stage descriptions are a nicety; a failure here does not
                // hide the classification.
                let stages = analyzer.sleep_stages().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Sleep stage descriptions unavailable");
                    Vec::new()
                });
                print_result(&result, &stages, json);
            }
        }

        RestoredCommand::Emotion { file } => {
            session.require_user()?;
            let result = submit_file(&screen(AnalysisKind::Emotion), &file).await?;
            print_result(&result, &[], json);
        }

        RestoredCommand::Stages => {
            let stages = analyzer.sleep_stages().await?;
            emit(|out| {
                if json {
                    return report::write_json(&stages, out);
                }
                for stage in &stages {
                    writeln!(out, "{:<3} {:<6} {}", stage.id, stage.name, stage.description)?;
                }
                Ok(())
            });
        }

        RestoredCommand::Emotions => {
            let info = analyzer.emotion_info().await?;
            emit(|out| report::write_json(&info, out));
        }
    }
    Ok(())
}

fn load_candidate(path: &Path) -> Result<UploadFile> {
    candidate_from_path(path).map_err(|e| {
        ValidationError::FileUnreadable {
            file_name: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Select `path` on `screen` and run its classify function.
async fn submit_file(screen: &Screen, path: &Path) -> Result<ClassificationResult> {
    screen.select_file(Some(load_candidate(path)?))?;
    match screen.submit().await? {
        SubmitOutcome::Done(result) => Ok(result),
        SubmitOutcome::AlreadySubmitting | SubmitOutcome::Discarded => {
            Err(ValidationError::SubmissionInProgress.into())
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    let read = || -> io::Result<String> {
        eprint!("{label}: ");
        io::stderr().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    };
    read().map_err(|e| {
        ValidationError::Form {
            field: "password",
            reason: format!("Could not read password: {e}"),
        }
        .into()
    })
}

/// Render into a buffer, then print it in one piece.
fn emit(render: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) {
    let mut buf = Vec::new();
    match render(&mut buf) {
        Ok(()) => print!("{}", String::from_utf8_lossy(&buf)),
        Err(e) => tracing::error!(error = %e, "Could not render output"),
    }
}

fn print_result(result: &ClassificationResult, stages: &[SleepStageInfo], json: bool) {
    emit(|out| {
        if json {
            report::write_json(result, out)
        } else {
            report::write_text(result, stages, out)
        }
    });
}

fn print_user(user: &SessionUser, json: bool, heading: &str) {
    emit(|out| {
        if json {
            return report::write_json(user, out);
        }
        writeln!(out, "{heading} {} <{}>", user.display_name(), user.email)?;
        if let Some(org) = &user.organization {
            writeln!(out, "  Organization: {org}")?;
        }
        if let Some(role) = &user.role {
            writeln!(out, "  Role: {role}")?;
        }
        Ok(())
    });
}
