use clap::{Parser, Subcommand};
use colloquy::cli::{self, Command, OutputMode};
use colloquy::config::DataLayerConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "colloquy-admin", version, about = "Inspect colloquy configuration, local mirror and codec", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, COLLOQUY_CONFIG and the default locations are searched.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Override the mirror directory (takes precedence over config/env)")]
    mirror_dir: Option<PathBuf>,
    #[arg(long, help = "Print JSON instead of human-readable text")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Print the effective configuration")]
    Config,
    #[command(subcommand, about = "Inspect or clear the local mirror")]
    Mirror(MirrorCommands),
    #[command(about = "Report how the configured codec would store a file")]
    Codec {
        #[arg(help = "File whose contents are encoded")]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum MirrorCommands {
    #[command(about = "List the conversations mirrored for a user")]
    Conversations {
        #[arg(help = "User id")]
        user: String,
    },
    #[command(about = "List the messages mirrored for a conversation")]
    Messages {
        #[arg(help = "Conversation id")]
        conversation: String,
    },
    #[command(about = "Remove every mirrored record of a user")]
    Clear {
        #[arg(help = "User id")]
        user: String,
    },
}

// Precedence: CLI > env > config file > defaults
fn load_config(cli: &Cli) -> Result<DataLayerConfig, colloquy::DataError> {
    let mut cfg = match &cli.config {
        Some(path) => {
            let mut cfg = DataLayerConfig::load(path)?;
            cfg.apply_env()?;
            cfg
        }
        None => DataLayerConfig::discover()?,
    };
    if let Some(dir) = &cli.mirror_dir {
        cfg.mirror.dir = Some(dir.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() {
    if let Err(e) = colloquy::init() {
        eprintln!("warning: logging not configured: {e}");
    }
    let args = Cli::parse();
    let cfg = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    let cmd = match args.command {
        Commands::Config => Command::ShowConfig,
        Commands::Mirror(MirrorCommands::Conversations { user }) => Command::MirrorConversations { user_id: user },
        Commands::Mirror(MirrorCommands::Messages { conversation }) => {
            Command::MirrorMessages { conversation_id: conversation }
        }
        Commands::Mirror(MirrorCommands::Clear { user }) => Command::MirrorClear { user_id: user },
        Commands::Codec { file } => Command::Codec { file },
    };
    let mode = if args.json { OutputMode::Json } else { OutputMode::Human };
    let r = cli::run_with_format(&cfg, cmd, mode, &mut std::io::stdout().lock());
    if let Err(e) = r {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
