//! RUFW - Rust front end for ufw
//!
//! Browse, search, add, edit and delete ufw rules from the terminal.
//!
//! # Safety
//!
//! - Every new or edited rule is dry-run before it is applied
//! - An edited rule is only deleted once its replacement has passed the dry run
//! - Delete, disable and reset ask for confirmation unless `--yes` is given
//! - Every command that changes the firewall is written to the audit log
//!
//! # Usage
//!
//! ```bash
//! rufw                                     # Numbered listing
//! rufw list --canonical                    # One canonical row per rule
//! rufw search 'ssh|22/'                    # Case-insensitive regex over rows
//! rufw add --port 22 --proto tcp --comment SSH
//! rufw add --action "allow fwd" --interface eth0 --interface-out eth1 --to 10.0.0.5
//! rufw edit 3 --interactive                # Prompt for every field of rule 3
//! rufw delete 3
//! rufw config --ufw-command /usr/sbin/ufw
//! ```

mod console;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rufw::audit::AuditLog;
use rufw::config::{self, AppConfig};
use rufw::core::decode::decode;
use rufw::core::error::{Error, MutationError};
use rufw::core::rule::{Action, Protocol};
use rufw::core::runner::ShellRunner;
use rufw::core::session::{MutationOutcome, Session};
use rufw::core::synth::{CommandBuilder, FormInput};
use rufw::utils;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

#[derive(Parser)]
#[command(name = "rufw", version)]
#[command(about = "Rust front end for ufw - browse, search and edit firewall rules", long_about = None)]
struct Cli {
    /// Log at DEBUG level
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Log file (default: the configured log file, else rufw.log in the state directory)
    #[arg(long, global = true, value_name = "PATH")]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the numbered rule listing (the default)
    List {
        /// Print canonical rows instead of a table
        #[arg(long)]
        canonical: bool,
    },
    /// Show rules matching a case-insensitive regular expression
    Search {
        pattern: String,
        #[arg(long)]
        canonical: bool,
    },
    /// Add a rule
    Add {
        #[command(flatten)]
        rule: RuleArgs,
        /// Insert at this row instead of appending
        #[arg(long, value_name = "ROW")]
        position: Option<usize>,
    },
    /// Replace a numbered rule, starting from its current fields
    Edit {
        row: usize,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Delete a numbered rule
    Delete {
        row: usize,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Enable the firewall
    Enable,
    /// Disable the firewall
    Disable {
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove every rule and disable the firewall
    Reset {
        #[arg(short, long)]
        yes: bool,
    },
    /// List network interfaces that rules can name
    Interfaces,
    /// Show or change saved preferences
    Config {
        /// Command used to run ufw
        #[arg(long, value_name = "COMMAND")]
        ufw_command: Option<String>,
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
        /// Record mutating commands in the audit log
        #[arg(long)]
        audit: Option<Toggle>,
        /// Ask before delete, disable and reset
        #[arg(long)]
        confirm: Option<Toggle>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProtoArg {
    Tcp,
    Udp,
    Any,
}

impl ProtoArg {
    fn protocol(self) -> Option<Protocol> {
        match self {
            ProtoArg::Tcp => Some(Protocol::Tcp),
            ProtoArg::Udp => Some(Protocol::Udp),
            ProtoArg::Any => None,
        }
    }
}

/// Rule fields; unset flags keep the value being edited
#[derive(Args)]
struct RuleArgs {
    /// Destination address or network (`any` for all)
    #[arg(long, value_name = "ADDRESS")]
    to: Option<String>,
    /// Port, list or range (22, 80,443, 8000:9000)
    #[arg(long)]
    port: Option<String>,
    /// Interface the traffic enters on (leaves on, for OUT rules)
    #[arg(long, value_name = "NAME")]
    interface: Option<String>,
    /// Interface forwarded traffic leaves on
    #[arg(long, value_name = "NAME")]
    interface_out: Option<String>,
    #[arg(long)]
    proto: Option<ProtoArg>,
    /// Action such as "allow in", "deny out" or "allow fwd"
    #[arg(long)]
    action: Option<Action>,
    /// Source address or network (`any` for all)
    #[arg(long, value_name = "ADDRESS")]
    from: Option<String>,
    #[arg(long)]
    comment: Option<String>,
    /// Prompt for every field
    #[arg(short, long)]
    interactive: bool,
}

impl RuleArgs {
    fn apply_to(&self, mut form: FormInput) -> FormInput {
        if let Some(to) = &self.to {
            form.to.clone_from(to);
        }
        if let Some(port) = &self.port {
            form.port.clone_from(port);
        }
        if let Some(interface) = &self.interface {
            form.interface.clone_from(interface);
        }
        if let Some(interface_out) = &self.interface_out {
            form.interface_out = Some(interface_out.clone()).filter(|s| !s.is_empty());
        }
        if let Some(proto) = self.proto {
            form.protocol = proto.protocol();
        }
        if let Some(action) = self.action {
            form.action = action;
        }
        if let Some(from) = &self.from {
            form.from.clone_from(from);
        }
        if let Some(comment) = &self.comment {
            form.comment.clone_from(comment);
        }
        form
    }

    /// Applies the flags, then prompts when `--interactive` was given
    fn complete(&self, form: FormInput) -> Outcome<FormInput> {
        let form = self.apply_to(form);
        if !self.interactive {
            return Ok(form);
        }
        console::edit_form(form, &utils::known_interfaces()).map_err(|e| report(&Error::Io(e)))
    }
}

/// A failure that has already been shown to the operator
struct Reported;

type Outcome<T = ()> = std::result::Result<T, Reported>;

fn report(err: &Error) -> Reported {
    console::print_error(err);
    Reported
}

fn report_mutation(err: &MutationError) -> Reported {
    console::print_mutation_error(err);
    Reported
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Reported) => ExitCode::FAILURE,
    }
}

fn init_logging(path: Option<PathBuf>, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let path = path.or_else(|| utils::get_state_dir().map(|dir| dir.join("rufw.log")));
    let file = path.and_then(|p| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(p)
            .ok()
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_max_level(level)
            .init(),
        None => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init(),
    }
}

async fn run(cli: Cli) -> Outcome {
    if let Err(e) = utils::ensure_dirs() {
        eprintln!("Warning: could not create data directories: {e}");
    }
    let config = config::load_config().await;
    init_logging(cli.log.or_else(|| config.log_file.clone()), cli.verbose);

    let mut session = Session::new(
        ShellRunner,
        CommandBuilder::new(config.effective_ufw_command()),
    );
    if config.audit_enabled {
        match AuditLog::new() {
            Ok(audit) => session = session.with_audit(audit),
            Err(e) => warn!("Audit log unavailable: {}", e),
        }
    }

    let command = cli
        .command
        .unwrap_or(Commands::List { canonical: false });
    handle_command(command, &session, config).await
}

async fn handle_command(
    command: Commands,
    session: &Session<ShellRunner>,
    config: AppConfig,
) -> Outcome {
    let confirm = |question: String, yes: bool| -> Outcome<bool> {
        if yes || !config.confirm_destructive {
            return Ok(true);
        }
        console::confirm(&question).map_err(|e| report(&Error::Io(e)))
    };

    match command {
        Commands::List { canonical } => {
            let listing = session.load_listing().await.map_err(|e| report(&e))?;
            console::print_listing(&listing, canonical);
        }
        Commands::Search { pattern, canonical } => {
            let lines = session.search(&pattern).await.map_err(|e| report(&e))?;
            if lines.is_empty() {
                println!("No rules match '{pattern}'.");
            } else {
                console::print_lines(&lines, canonical);
            }
        }
        Commands::Add { rule, position } => {
            let mut form = rule.complete(FormInput::default())?;
            form.position = position;
            check_form(&form)?;

            let outcome = session
                .create_rule(&form)
                .await
                .map_err(|e| report_mutation(&e))?;
            print_outcome(&outcome);
        }
        Commands::Edit { row, rule } => {
            let listing = session.load_listing().await.map_err(|e| report(&e))?;
            let line = listing
                .editable_line(row)
                .map_err(|e| report_mutation(&e))?;
            let Some(current) = decode(&line.row) else {
                eprintln!("✗ Rule {row} could not be read: {}", line.raw);
                return Err(Reported);
            };

            println!("Editing: {}", line.row);
            let form = rule.complete(FormInput::from_rule(&current))?;
            check_form(&form)?;

            if !confirm(format!("Replace rule {row}?"), false)? {
                println!("Cancelled.");
                return Ok(());
            }
            let outcome = session
                .replace_rule(&listing, row, &form)
                .await
                .map_err(|e| report_mutation(&e))?;
            print_outcome(&outcome);
        }
        Commands::Delete { row, yes } => {
            let listing = session.load_listing().await.map_err(|e| report(&e))?;
            let Some(line) = listing.line(row) else {
                return Err(report_mutation(&MutationError::UnknownRow(row)));
            };

            if !confirm(format!("Delete rule {}?", line.row), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            let output = session.delete_rule(row).await.map_err(|e| report(&e))?;
            print!("{}", output.stdout);
        }
        Commands::Enable => {
            let output = session.enable().await.map_err(|e| report(&e))?;
            print!("{}", output.stdout);
        }
        Commands::Disable { yes } => {
            if !confirm("Disable the firewall?".to_string(), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            let output = session.disable().await.map_err(|e| report(&e))?;
            print!("{}", output.stdout);
        }
        Commands::Reset { yes } => {
            if !confirm(
                "Delete EVERY rule and disable the firewall?".to_string(),
                yes,
            )? {
                println!("Cancelled.");
                return Ok(());
            }
            let output = session.reset().await.map_err(|e| report(&e))?;
            print!("{}", output.stdout);
        }
        Commands::Interfaces => {
            for name in utils::known_interfaces().iter().filter(|n| !n.is_empty()) {
                println!("{name}");
            }
        }
        Commands::Config {
            ufw_command,
            log_file,
            audit,
            confirm,
        } => {
            let unchanged =
                ufw_command.is_none() && log_file.is_none() && audit.is_none() && confirm.is_none();
            let mut config = config.clone();
            if let Some(cmd) = ufw_command {
                config.ufw_command = cmd;
            }
            if let Some(path) = log_file {
                config.log_file = Some(path).filter(|p| !p.as_os_str().is_empty());
            }
            if let Some(audit) = audit {
                config.audit_enabled = audit.enabled();
            }
            if let Some(confirm) = confirm {
                config.confirm_destructive = confirm.enabled();
            }

            if !unchanged {
                config::save_config(&config)
                    .await
                    .map_err(|e| report(&Error::Io(e)))?;
            }
            let json = serde_json::to_string_pretty(&config).map_err(|e| report(&e.into()))?;
            println!("{json}");
            if let Some(path) = config::config_path() {
                println!("({})", path.display());
            }
        }
    }
    Ok(())
}

fn check_form(form: &FormInput) -> Outcome {
    form.validate().map_err(|errors| {
        console::print_form_errors(&errors);
        Reported
    })
}

fn print_outcome(outcome: &MutationOutcome) {
    match outcome {
        MutationOutcome::Skipped => {
            println!("Nothing to do: the rule names no port, protocol, interface or address.");
        }
        MutationOutcome::Applied(applied) => {
            if let Some(deleted) = &applied.deleted {
                println!("Replaced: {deleted}");
            }
            println!("✓ {}", applied.commands.apply);
            print!("{}", applied.output);
        }
    }
}
