// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use inquire::{Password, PasswordDisplayMode, Text};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use votegate::auth::{AccountClass, AuthController, AuthOutcome, LockoutDecision, RemainingTime};
use votegate::error::format_error;
use votegate::guard::{self, Access};
use votegate::store::FileStore;
use votegate::Config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Login succeeded / command completed
    pub const SUCCESS: i32 = 0;
    /// Login rejected or locked out
    pub const DENIED: i32 = 1;
    /// Internal software error - store or validator failure
    pub const SOFTWARE: i32 = 70;
    /// Configuration error - invalid or missing config
    pub const CONFIG: i32 = 78;
}

/// VoteGate - login throttling and session control for the voting client.
#[derive(Parser)]
#[command(name = "votegate")]
#[command(version = VERSION)]
#[command(about = "Attempt-throttled login and session control for the VoteGate voting client.")]
#[command(long_about = "VoteGate - login throttling and session control\n\n\
    Sign in:          votegate login alice@example.org\n\
    Sign out:         votegate logout\n\
    Inspect state:    votegate status\n\
    Check a route:    votegate guard /dashboard\n\n\
    Admin accounts get 5 attempts per 5 minutes; voters get 3 per 15 minutes.")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.votegate/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store file (overrides the config's store_path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Verbose mode: debug logging to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one login attempt
    ///
    /// Examples:
    ///   votegate login alice@example.org
    ///   votegate login admin@votegate.local --password '...'
    Login {
        /// Email address (prompted if omitted)
        identifier: Option<String>,
        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show the session and attempt counters
    Status,

    /// Clear attempt counters (operator recovery)
    ///
    /// Examples:
    ///   votegate reset
    ///   votegate reset --class admin
    Reset {
        /// Only reset this class
        #[arg(long, value_enum)]
        class: Option<ClassArg>,
    },

    /// Check whether the current session may open a route
    ///
    /// Example:
    ///   votegate guard /admin/election/3/results
    Guard {
        /// Route path
        path: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective configuration (secret redacted)
    Show,
    /// Print the config file path
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClassArg {
    Admin,
    User,
}

impl From<ClassArg> for AccountClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Admin => AccountClass::Privileged,
            ClassArg::User => AccountClass::Standard,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "votegate=debug" } else { "votegate=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            let inspect = format!("Inspect {}", config_path.display());
            eprintln!(
                "{}",
                format_error(
                    &format!("Failed to load configuration: {:#}", e),
                    &["Malformed JSON in the config file", "A lockout value of zero"],
                    &[inspect.as_str(), "Delete the file to fall back to defaults"],
                )
            );
            std::process::exit(exit_codes::CONFIG);
        }
    };

    let code = match run(cli, &config_path, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!(
                "{}",
                format_error(
                    &format!("{:#}", e),
                    &[
                        "The store file is locked by another process",
                        "The store directory is not writable",
                    ],
                    &["Retry the command", "Pass --store with a writable path"],
                )
            );
            exit_codes::SOFTWARE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, config_path: &Path, config: Config) -> Result<i32> {
    let store_path = cli.store.clone().unwrap_or_else(|| config.resolved_store_path());
    let store = Arc::new(FileStore::new(&store_path));
    let auth = config.build_controller(store);

    match cli.command {
        Commands::Login { identifier, password } => login(&auth, identifier, password),
        Commands::Logout => {
            auth.logout().context("Failed to clear session")?;
            println!("{} Signed out", "[✓]".green());
            Ok(exit_codes::SUCCESS)
        }
        Commands::Status => {
            show_status(&auth)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Reset { class } => {
            let classes: Vec<AccountClass> = match class {
                Some(c) => vec![c.into()],
                None => AccountClass::ALL.to_vec(),
            };
            for class in classes {
                auth.reset_attempts(class)
                    .with_context(|| format!("Failed to reset {} attempts", class))?;
                println!("{} Reset {} attempt counter", "[✓]".green(), class);
            }
            Ok(exit_codes::SUCCESS)
        }
        Commands::Guard { path } => {
            let session = auth.current_session().context("Failed to read session")?;
            match guard::check(&path, session.as_ref()) {
                Access::Granted => {
                    println!("{} {} granted", "[✓]".green(), path);
                    Ok(exit_codes::SUCCESS)
                }
                Access::Redirect(to) => {
                    println!("{} {} -> redirect to {}", "[!]".yellow(), path, to);
                    Ok(exit_codes::DENIED)
                }
                Access::NotFound => {
                    println!("{} {} is not a known route", "[✗]".red(), path);
                    Ok(exit_codes::DENIED)
                }
            }
        }
        Commands::Config { command } => {
            match command {
                ConfigCommands::Show => {
                    println!("{}", "Configuration".bold());
                    println!("  file:                  {}", config_path.display());
                    println!("  store:                 {}", store_path.display());
                    println!("  privileged identifier: {}", config.privileged_identifier);
                    println!(
                        "  privileged secret:     {}",
                        if config.privileged_secret.is_some() { "set" } else { "not set" }
                    );
                    let configs = config.class_configs();
                    for class in AccountClass::ALL {
                        let lockout = configs.for_class(class);
                        println!(
                            "  {:<10} lockout:    {} attempts / {} ({:?})",
                            class.to_string(),
                            lockout.max_attempts,
                            RemainingTime::new(lockout.window_ms),
                            lockout.anchor
                        );
                    }
                    println!("  minimum secret length: {}", config.min_secret_len);
                }
                ConfigCommands::Path => println!("{}", config_path.display()),
            }
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn login(
    auth: &AuthController,
    identifier: Option<String>,
    password: Option<String>,
) -> Result<i32> {
    let identifier = match identifier {
        Some(id) => id,
        None => Text::new("Email address:").prompt().context("Login cancelled")?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new("Password:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Login cancelled")?,
    };

    let outcome = auth.submit(identifier.trim(), &password);
    match &outcome {
        AuthOutcome::Authenticated { session } => {
            println!("{} {}", "[✓]".green(), outcome.message());
            println!("    Signed in as {} ({})", session.subject_id.bold(), session.role);
            println!("    Continue at {}", session.role.landing_path().cyan());
            Ok(exit_codes::SUCCESS)
        }
        AuthOutcome::LockedOut { .. } => {
            println!("{} {}", "[!]".yellow(), outcome.message());
            Ok(exit_codes::DENIED)
        }
        AuthOutcome::Rejected(_) => {
            println!("{} {}", "[✗]".red(), outcome.message());
            Ok(exit_codes::DENIED)
        }
    }
}

fn show_status(auth: &AuthController) -> Result<()> {
    println!("{}", "Session".bold());
    match auth.current_session().context("Failed to read session")? {
        Some(session) => {
            println!("  subject:     {}", session.subject_id);
            println!("  role:        {}", session.role);
            println!("  established: {}", session.established_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => println!("  {}", "not signed in".dimmed()),
    }

    println!();
    println!("{}", "Attempts".bold());
    for class in AccountClass::ALL {
        let (record, decision) = auth
            .attempt_status(class)
            .with_context(|| format!("Failed to read {} attempts", class))?;
        let max = auth.configs().for_class(class).max_attempts;
        let state = match decision {
            LockoutDecision::Locked { remaining_ms } => {
                format!("locked for {}", RemainingTime::new(remaining_ms)).red().to_string()
            }
            LockoutDecision::Allowed { window_lapsed: true } if !record.is_clear() => {
                "window lapsed".dimmed().to_string()
            }
            LockoutDecision::Allowed { .. } => "open".green().to_string(),
        };
        println!("  {:<10} {}/{}  {}", class.to_string(), record.attempt_count, max, state);
    }
    Ok(())
}
