use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use authshell::account::CallbackOutcome;
use authshell::bootstrap::AuthStatus;
use authshell::client::ClientError;
use authshell::config::{load_config, schema_json};
use authshell::navigation::RecordingNavigator;
use authshell::routes::{decide, RouteDecision};
use authshell::startup;
use authshell::state::ShellState;
use authshell::utils::logger::init_logging;

#[derive(Parser)]
#[command(name = "authshell")]
#[command(about = "Session shell for the travel API: sign-in state, token refresh and route gating")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long, global = true, default_value = "./config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the session and print who is signed in
    Status,
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
    },
    /// Start an OAuth sign-in and print the provider URL to open
    Oauth,
    /// Complete an OAuth sign-in from the callback query string
    Callback { query: String },
    /// Send an authenticated GET request and print the body
    Get { path: String },
    /// Show what the route gate decides for a path
    Route { path: String },
    /// Sign out
    Logout,
    /// Delete the account
    Withdraw,
    /// Print the JSON schema of the configuration file
    Schema,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::Schema = cli.command {
        return match schema_json() {
            Ok(schema) => {
                println!("{}", schema);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Could not render configuration schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&cli.config) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    let navigator = Arc::new(RecordingNavigator::new());
    let (state, _) = match startup::run(config, navigator.clone()).await {
        Ok(started) => started,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = execute(&state, cli.command).await;

    println!("status: {}", describe(state.bootstrap.status()));
    if let Some(location) = navigator.last_redirect() {
        println!("redirect: {}", location);
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.server_message() {
                Some(message) => eprintln!("error: {} ({})", message, e),
                None => eprintln!("error: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(state: &ShellState, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Status => {
            let session = state.session.snapshot();
            if let Some(email) = session.email {
                println!("email: {}", email);
            }
            if let Some(full_name) = session.full_name {
                println!("name: {}", full_name);
            }
            Ok(())
        }
        Command::Login { email, password } => {
            let grant = state.account.login(&email, &password).await?;
            println!("signed in as {}", grant.email.as_deref().unwrap_or(&email));
            Ok(())
        }
        Command::Register {
            email,
            password,
            full_name,
        } => {
            state.account.register(&email, &password, &full_name).await?;
            println!("registered {}, sign in to continue", email);
            Ok(())
        }
        Command::Callback { query } => {
            match state.account.complete_oauth_callback(&query).await {
                CallbackOutcome::SignedIn(session) => {
                    println!(
                        "signed in as {}",
                        session.email.as_deref().unwrap_or("unknown user")
                    );
                }
                CallbackOutcome::MissingToken => {
                    println!("no token in callback");
                    println!("redirect: {}", state.client.login_entry());
                }
                CallbackOutcome::Expired => println!("token was rejected, sign in again"),
            }
            Ok(())
        }
        Command::Oauth => {
            let target = state.account.begin_oauth_login()?;
            println!("continue at {}", target);
            Ok(())
        }
        Command::Get { path } => {
            let response = state.client.get(&path).await?;
            println!("{}", response.body);
            Ok(())
        }
        Command::Route { path } => {
            match decide(&path, state.bootstrap.status()) {
                RouteDecision::Placeholder => println!("route: loading"),
                RouteDecision::Render => println!("route: render {}", path),
                RouteDecision::Redirect(target) => println!("route: redirect {}", target),
            }
            Ok(())
        }
        Command::Logout => state.account.logout().await,
        Command::Withdraw => state.account.withdraw().await,
        Command::Schema => Ok(()),
    }
}

fn describe(status: AuthStatus) -> &'static str {
    match status {
        AuthStatus::Loading => "loading",
        AuthStatus::Authenticated => "authenticated",
        AuthStatus::Unauthenticated => "unauthenticated",
    }
}
