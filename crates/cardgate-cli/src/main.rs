//! Cardgate CLI - mock smart cards and a kiosk poll loop
//!
//! `cardgate card ...` manages a file-backed mock card reader. `cardgate watch`
//! runs either auth engine against that reader the way a kiosk host does:
//! polling on a fixed interval, printing each new status as JSON, and reading
//! operator commands from stdin.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cardgate_auth::{AuthConfig, DippedCardAuth, FileCard, InsertedCardAuth, ProgramCardInput};
use cardgate_core::{
    encode_user, generate_pin, AuthStatus, ElectionHash, LockoutPolicy, MachineState, Passcode,
    User, UserRole, DIPPED_CARD_ROLES, INSERTED_CARD_ROLES,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cardgate")]
#[command(about = "Smart-card operator authentication for election kiosks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mock card reader commands
    #[command(subcommand)]
    Card(CardCommands),

    /// Run an auth engine against a mock card reader
    Watch {
        /// Mock card file
        #[arg(short, long)]
        file: PathBuf,

        /// Card presence contract
        #[arg(short, long, value_enum)]
        mode: Mode,

        /// Engine configuration file (defaults to $CARDGATE_CONFIG)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Election the machine is configured for
        #[arg(long)]
        election_hash: Option<ElectionHash>,

        /// Roles the machine accepts (defaults to every role the engine supports)
        #[arg(long, value_delimiter = ',')]
        roles: Vec<UserRole>,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// Seat a programmed card
    Insert {
        /// Mock card file
        #[arg(short, long)]
        file: PathBuf,

        /// Role to program
        #[arg(short, long)]
        role: UserRole,

        /// Election the card is bound to (election managers and poll workers)
        #[arg(long)]
        election_hash: Option<ElectionHash>,

        /// PIN for PIN-bearing roles (generated if omitted)
        #[arg(long)]
        pin: Option<String>,

        /// File written as the card's long payload
        #[arg(long)]
        election_data: Option<PathBuf>,

        /// Seat the card write protected
        #[arg(long)]
        write_protected: bool,
    },

    /// Seat a blank card
    Blank {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Remove the card from the reader
    Remove {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Put the reader into its error state
    Fault {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show the reader state and decoded card
    Show {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Dipped,
    Inserted,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only statuses
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Card(cmd) => handle_card_command(cmd).await,
        Commands::Watch {
            file,
            mode,
            config,
            election_hash,
            roles,
        } => {
            let config = load_config(config)?;
            let default_roles = match mode {
                Mode::Dipped => DIPPED_CARD_ROLES,
                Mode::Inserted => INSERTED_CARD_ROLES,
            };
            let roles = if roles.is_empty() {
                default_roles.to_vec()
            } else {
                roles
            };
            let machine_state = MachineState {
                election_hash,
                ..Default::default()
            }
            .with_allowed_roles(&roles);
            watch(FileCard::new(file), mode, config, machine_state).await
        }
    }
}

/// Load the engine config, creating a default file on first use
fn load_config(path: Option<PathBuf>) -> Result<AuthConfig> {
    let Some(path) = path.or_else(|| std::env::var_os("CARDGATE_CONFIG").map(PathBuf::from))
    else {
        return Ok(AuthConfig::default());
    };

    if path.exists() {
        return AuthConfig::load(&path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let config = AuthConfig::default();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    config.save(&path)?;
    info!("Created default config at {:?}", path);
    Ok(config)
}

async fn handle_card_command(cmd: CardCommands) -> Result<()> {
    match cmd {
        CardCommands::Insert {
            file,
            role,
            election_hash,
            pin,
            election_data,
            write_protected,
        } => {
            let pin = match pin {
                Some(pin) => Some(Passcode::new(pin)?),
                None if role.requires_pin() => {
                    let pin = generate_pin();
                    println!("Generated PIN: {}", pin.as_str());
                    Some(pin)
                }
                None => None,
            };
            let user = build_user(role, election_hash, pin)?;
            let long_value = match election_data {
                Some(path) => std::fs::read(&path)
                    .with_context(|| format!("Failed to read election data from {:?}", path))?,
                None => Vec::new(),
            };

            let card = FileCard::new(&file);
            card.insert(Some(encode_user(&user)?), &long_value, write_protected)
                .await?;
            println!("✓ Inserted {} card into {}", role, file.display());
        }

        CardCommands::Blank { file } => {
            FileCard::new(&file).blank().await?;
            println!("✓ Inserted blank card into {}", file.display());
        }

        CardCommands::Remove { file } => {
            FileCard::new(&file).remove().await?;
            println!("✓ Removed card from {}", file.display());
        }

        CardCommands::Fault { file } => {
            FileCard::new(&file).fault().await?;
            println!("✓ Reader {} is now in its error state", file.display());
        }

        CardCommands::Show { file } => show_card(&file).await?,
    }

    Ok(())
}

fn build_user(
    role: UserRole,
    election_hash: Option<ElectionHash>,
    pin: Option<Passcode>,
) -> Result<User> {
    let user = match (role, election_hash, pin) {
        (UserRole::SystemAdministrator, _, Some(passcode)) => {
            User::SystemAdministrator { passcode }
        }
        (UserRole::ElectionManager, Some(election_hash), Some(passcode)) => {
            User::ElectionManager {
                election_hash,
                passcode,
            }
        }
        (UserRole::PollWorker, Some(election_hash), _) => User::PollWorker { election_hash },
        (UserRole::SystemAdministrator, _, None) | (UserRole::ElectionManager, Some(_), None) => {
            bail!("{} cards require a PIN", role)
        }
        (UserRole::ElectionManager | UserRole::PollWorker, None, _) => {
            bail!("{} cards require --election-hash", role)
        }
    };
    Ok(user)
}

async fn show_card(file: &Path) -> Result<()> {
    use cardgate_auth::CardReader;

    let card = FileCard::new(file);
    let summary = card.read_summary().await?;
    println!("Reader: {}", file.display());
    println!("  Summary: {}", serde_json::to_string(&summary)?);

    if let Some(short_value) = summary.short_value() {
        match cardgate_core::parse_user(short_value) {
            Ok(user) => {
                println!("  Role: {}", user.role());
                if let Some(hash) = user.election_hash() {
                    println!("  Election: {}", hash.short());
                }
            }
            Err(e) => println!("  Short payload does not decode to a user: {}", e),
        }
    }
    if summary.is_ready() {
        match card.read_long_value().await {
            Ok(bytes) => println!("  Long payload: {} bytes", bytes.len()),
            Err(e) => println!("  Long payload unreadable: {}", e),
        }
    }
    Ok(())
}

/// Either engine, driven by the same host loop
enum Kiosk {
    Dipped(DippedCardAuth<FileCard>),
    Inserted(InsertedCardAuth<FileCard>),
}

impl Kiosk {
    fn lockout_policy(&self) -> Option<&LockoutPolicy> {
        match self {
            Kiosk::Dipped(auth) => auth.config().pin_lockout.as_ref(),
            Kiosk::Inserted(auth) => auth.config().pin_lockout.as_ref(),
        }
    }

    async fn get_auth_status(&mut self, machine_state: &MachineState) -> AuthStatus {
        match self {
            Kiosk::Dipped(auth) => auth.get_auth_status(machine_state).await,
            Kiosk::Inserted(auth) => auth.get_auth_status(machine_state).await,
        }
    }

    async fn check_pin(&mut self, machine_state: &MachineState, pin: &str) {
        match self {
            Kiosk::Dipped(auth) => auth.check_pin(machine_state, pin).await,
            Kiosk::Inserted(auth) => auth.check_pin(machine_state, pin).await,
        }
    }

    /// Run one operator command read from stdin
    async fn handle_command(&mut self, machine_state: &MachineState, line: &str) -> Result<()> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(());
        };

        if command.chars().all(|c| c.is_ascii_digit()) {
            self.check_pin(machine_state, command).await;
            return Ok(());
        }

        match (self, command) {
            (Kiosk::Dipped(auth), "logout") => auth.log_out(machine_state),
            (Kiosk::Dipped(auth), "program") => {
                let role: UserRole = words
                    .next()
                    .context("usage: program <role> [election-data-file]")?
                    .parse()?;
                let mut input = ProgramCardInput::new(role);
                if let Some(path) = words.next() {
                    input = input.with_election_data(
                        std::fs::read(path)
                            .with_context(|| format!("Failed to read {}", path))?,
                    );
                }
                let outcome = auth.program_card(machine_state, input).await?;
                match outcome.pin {
                    Some(pin) => println!("Programmed {} card, PIN {}", role, pin.as_str()),
                    None => println!("Programmed {} card", role),
                }
            }
            (Kiosk::Dipped(auth), "unprogram") => {
                auth.unprogram_card(machine_state).await?;
                println!("Card unprogrammed");
            }
            (Kiosk::Inserted(auth), "read") => match auth.read_card_data_as_string().await? {
                Some(data) => println!("Card data: {}", data),
                None => println!("No card data"),
            },
            (Kiosk::Inserted(auth), "write") => {
                let json = line.trim_start().trim_start_matches("write").trim();
                let value: serde_json::Value =
                    serde_json::from_str(json).context("usage: write <json>")?;
                auth.write_card_data(&value).await?;
                println!("Card data written and verified");
            }
            (Kiosk::Inserted(auth), "clear") => {
                auth.clear_card_data().await?;
                println!("Card data cleared");
            }
            (_, other) => bail!("Unknown command: {}", other),
        }
        Ok(())
    }
}

async fn watch(
    card: FileCard,
    mode: Mode,
    config: AuthConfig,
    machine_state: MachineState,
) -> Result<()> {
    let mut interval = tokio::time::interval(config.poll_interval());
    let mut kiosk = match mode {
        Mode::Dipped => Kiosk::Dipped(DippedCardAuth::new(card, config)),
        Mode::Inserted => Kiosk::Inserted(InsertedCardAuth::new(card, config)),
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_status: Option<AuthStatus> = None;

    info!("Watching card reader in {:?} mode", mode);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let status = kiosk.get_auth_status(&machine_state).await;
                if last_status.as_ref() != Some(&status) {
                    print_status(&status, kiosk.lockout_policy())?;
                    last_status = Some(status);
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if let Err(e) = kiosk.handle_command(&machine_state, &line).await {
                            warn!("Command failed: {:#}", e);
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}

fn print_status(status: &AuthStatus, lockout: Option<&LockoutPolicy>) -> Result<()> {
    println!("{}", redacted_status_json(status)?);
    if let AuthStatus::CheckingPin {
        incorrect_pin_attempts,
        locked_out_until,
        ..
    } = status
    {
        if let (Some(policy), true) = (lockout, *incorrect_pin_attempts > 0) {
            println!("{}", policy.describe_lockout(*incorrect_pin_attempts));
        }
        if let Some(until) = locked_out_until {
            let remaining = (*until - Utc::now()).num_seconds();
            if remaining > 0 {
                println!("PIN entry locked for {} more seconds", remaining);
            }
        }
    }
    Ok(())
}

/// Status JSON with every passcode removed, nested programmed users included
fn redacted_status_json(status: &AuthStatus) -> Result<String> {
    let mut value = serde_json::to_value(status)?;
    strip_passcodes(&mut value);
    Ok(serde_json::to_string(&value)?)
}

fn strip_passcodes(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.remove("passcode");
            map.values_mut().for_each(strip_passcodes);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_passcodes),
        _ => {}
    }
}
