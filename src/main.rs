//! signchat CLI
//!
//! Usage:
//!   signchat simulate                         # Two scripted agents over a simulated link
//!   signchat simulate --responder vocabulary  # Canned replies, runs to the round limit
//!   signchat simulate --miss-rate 0.2         # Noisy recognition
//!   signchat simulate --camera-faults 3       # Every third camera read fails
//!   signchat simulate --responder mailbox --mailbox /tmp/chat
//!                                             # Replies from files written by someone else
//!   signchat simulate --json                  # Session reports as JSON
//!   signchat config                           # Print the effective configuration

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use signchat::config::Config;
use signchat::core::loopback::{SCREEN_HEIGHT, SCREEN_WIDTH};
use signchat::core::{
    run_pair, screen_link, Cancellation, Classifier, Collaborators, CommandResponder,
    ConversationOrchestrator, FileMailbox, GlyphClassifier, MailboxResponder, NoisyClassifier,
    Responder, ScriptResponder, VocabularyResponder,
};
use signchat::types::{Role, SessionReport};
use signchat::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "signchat",
    version = VERSION,
    about = "Turn-based letter chat between two agents over a screen-to-camera channel",
    long_about = "signchat runs two agents that talk by spelling letters on a screen\n\
                  the other agent watches. Turns are handed over with a colored border:\n\n  \
                  GREEN - speaking, a letter may be on screen\n  \
                  RED   - done speaking, your turn\n  \
                  CYAN  - listening"
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run two agents against each other over a simulated screen link
    Simulate(SimulateArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ResponderKind {
    /// Fixed scripts, one message per turn
    Script,
    /// Canned replies to known words
    Vocabulary,
    /// External command, prompt passed as last argument
    Command,
    /// Prompt and reply files in `--mailbox`, answered by an outside decider
    Mailbox,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Speaking turns per agent (overrides the config)
    #[arg(short, long)]
    rounds: Option<u32>,

    #[arg(long, value_enum, default_value_t = ResponderKind::Script)]
    responder: ResponderKind,

    /// Comma separated script for the first agent
    #[arg(long)]
    script_a: Option<String>,

    /// Comma separated script for the second agent
    #[arg(long)]
    script_b: Option<String>,

    /// Command line for `--responder command`
    #[arg(long = "exec")]
    exec: Option<String>,

    /// Directory for `--responder mailbox`: a_prompt.json / a_reply.txt, same for b
    #[arg(long)]
    mailbox: Option<PathBuf>,

    /// Multiply every duration by this factor
    #[arg(long, default_value_t = 0.1)]
    speed: f64,

    /// Probability a recognized letter is missed
    #[arg(long, default_value_t = 0.0)]
    miss_rate: f64,

    /// Probability a recognized letter is replaced by a random one
    #[arg(long, default_value_t = 0.0)]
    substitute_rate: f64,

    /// Every n-th camera read fails (0 = never)
    #[arg(long, default_value_t = 0)]
    camera_faults: u32,

    /// Every n-th classification fails (0 = never)
    #[arg(long, default_value_t = 0)]
    classifier_faults: u32,

    /// Seed for recognition noise
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// First agent waits for the second to listen before speaking
    #[arg(long)]
    handshake: bool,

    /// Output reports as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("signchat={}", cli.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Simulate(args) => run_simulate(config, &args).await,
    }
}

/// Run two agents over a pair of simulated screen links
async fn run_simulate(mut config: Config, args: &SimulateArgs) -> Result<()> {
    if !(args.speed.is_finite() && args.speed > 0.0) {
        bail!("--speed must be positive");
    }
    let rates = [
        ("--miss-rate", args.miss_rate),
        ("--substitute-rate", args.substitute_rate),
    ];
    for (flag, rate) in rates {
        if !(0.0..=1.0).contains(&rate) {
            bail!("{} must be between 0 and 1", flag);
        }
    }
    if let Some(rounds) = args.rounds {
        config.conversation.max_rounds = rounds;
    }
    if args.handshake {
        config.turn.handshake = true;
    }
    let config = config.scaled(args.speed);
    config.validate().context("invalid configuration after scaling")?;

    if args.no_color {
        colored::control::set_override(false);
    }

    let (responder_a, responder_b) = build_responders(&config, args)?;

    // A's screen is watched by B's camera and the other way round
    let (display_a, camera_b) = screen_link(SCREEN_WIDTH, SCREEN_HEIGHT);
    let (display_b, camera_a) = screen_link(SCREEN_WIDTH, SCREEN_HEIGHT);

    let (cancel_handle, cancel) = Cancellation::channel();
    let interrupt = cancel_handle.clone();
    let mut finished = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("interrupted, stopping both agents");
                    interrupt.cancel();
                }
            }
            _ = finished.cancelled() => {}
        }
    });

    let agent_a = ConversationOrchestrator::new(
        config.clone(),
        Role::Speaker,
        Collaborators {
            camera: Box::new(camera_a.with_failures(args.camera_faults)),
            display: Box::new(display_a),
            classifier: build_classifier(&config, args, args.seed),
            responder: responder_a,
        },
        cancel.clone(),
    )?;
    let agent_b = ConversationOrchestrator::new(
        config.clone(),
        Role::Listener,
        Collaborators {
            camera: Box::new(camera_b.with_failures(args.camera_faults)),
            display: Box::new(display_b),
            classifier: build_classifier(&config, args, args.seed.wrapping_add(1)),
            responder: responder_b,
        },
        cancel,
    )?;

    info!(speed = args.speed, rounds = config.conversation.max_rounds, "simulation starting");
    let (report_a, report_b) = run_pair(agent_a, agent_b, cancel_handle).await;

    if args.json {
        let reports = serde_json::json!({ "a": report_a, "b": report_b });
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_report("Agent A", &report_a, args.no_color);
        print_report("Agent B", &report_b, args.no_color);
    }
    Ok(())
}

fn build_responders(
    config: &Config,
    args: &SimulateArgs,
) -> Result<(Box<dyn Responder>, Box<dyn Responder>)> {
    let responders: (Box<dyn Responder>, Box<dyn Responder>) = match args.responder {
        ResponderKind::Script => {
            let a = args
                .script_a
                .as_deref()
                .map(ScriptResponder::parse)
                .unwrap_or_else(ScriptResponder::demo_a);
            let b = args
                .script_b
                .as_deref()
                .map(ScriptResponder::parse)
                .unwrap_or_else(ScriptResponder::demo_b);
            (Box::new(a), Box::new(b))
        }
        ResponderKind::Vocabulary => (
            Box::new(VocabularyResponder::new(config.conversation.clone())),
            Box::new(VocabularyResponder::new(config.conversation.clone())),
        ),
        ResponderKind::Command => {
            let line = args
                .exec
                .as_deref()
                .context("--responder command needs --exec")?;
            let build = || {
                CommandResponder::from_command_line(line, config.conversation.clone())
                    .context("--exec is empty")
            };
            (Box::new(build()?), Box::new(build()?))
        }
        ResponderKind::Mailbox => {
            let dir = args
                .mailbox
                .as_deref()
                .context("--responder mailbox needs --mailbox")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create mailbox dir {}", dir.display()))?;
            let build = |name: &str| {
                let mailbox = FileMailbox::in_dir(dir, name);
                info!(
                    agent = name,
                    prompt = %mailbox.input_path().display(),
                    reply = %mailbox.response_path().display(),
                    "mailbox ready"
                );
                MailboxResponder::new(mailbox, None)
            };
            (Box::new(build("a")), Box::new(build("b")))
        }
    };
    Ok(responders)
}

fn build_classifier(config: &Config, args: &SimulateArgs, seed: u64) -> Box<dyn Classifier> {
    if args.miss_rate > 0.0 || args.substitute_rate > 0.0 || args.classifier_faults > 0 {
        let noisy = NoisyClassifier::new(
            GlyphClassifier,
            args.miss_rate,
            args.substitute_rate,
            &config.conversation.alphabet,
            seed,
        );
        Box::new(noisy.with_faults(args.classifier_faults))
    } else {
        Box::new(GlyphClassifier)
    }
}

fn print_report(name: &str, report: &SessionReport, no_color: bool) {
    let header = format!(
        "{} ({}) - {} after {} round(s)",
        name, report.role, report.outcome, report.rounds
    );
    println!();
    println!("{}", header.bold());
    println!("{}", "-".repeat(header.len()));

    let lines = if no_color {
        report.to_parseable_lines()
    } else {
        report.to_terminal_lines()
    };
    if lines.is_empty() {
        println!("  (nothing exchanged)");
    }
    for line in lines {
        println!("{}", line);
    }
}
