use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use copyforge::ai::ensure_key_selected;
use copyforge::cli::CommandContext;
use copyforge::cli::commands::generate::{ImageArgs, ScriptArgs, VideoArgs};
use copyforge::cli::commands::{config, generate};
use copyforge::{CopyError, Tone};

#[derive(Parser)]
#[command(name = "copyforge")]
#[command(
    version,
    about = "AI-driven sales copy, ad image, objection and video-ad generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Output directory for generated media")]
    output: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        global = true,
        default_value = "text",
        help = "Output format: text, json"
    )]
    format: String,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a persuasive sales script
    Script {
        #[arg(help = "Product or topic name")]
        product: String,
        #[arg(long, short, help = "Target audience")]
        audience: String,
        #[arg(long = "benefit", short, help = "Key benefit (repeatable)")]
        benefits: Vec<String>,
        #[arg(long, short, default_value = "professional", help = "Tone: professional, aggressive, empathetic, humorous")]
        tone: Tone,
        #[arg(long, short, help = "Additional context")]
        context: Option<String>,
        #[arg(long, help = "One script per persuasion angle")]
        variants: bool,
    },

    /// Generate ad images (five styles by default)
    Images {
        #[arg(help = "Visual description of the ad")]
        description: String,
        #[arg(long, help = "Generate a single image instead of five styles")]
        single: bool,
        #[arg(long, short, help = "Reference image guiding the composition")]
        reference: Option<PathBuf>,
        #[arg(long, help = "Aspect ratio for a single image (e.g. 1:1, 9:16)")]
        aspect_ratio: Option<String>,
    },

    /// Generate an ad image plus social post text
    Pack {
        #[arg(help = "Product or campaign description")]
        description: String,
        #[arg(long, help = "One pack per ad style")]
        all: bool,
    },

    /// Get a rebuttal for a customer objection
    Objection {
        #[arg(help = "What the customer said")]
        text: String,
        #[arg(long, short, help = "Product or sale context")]
        context: Option<String>,
    },

    /// Write a short-form video ad script
    VideoScript {
        #[arg(help = "Product or idea")]
        product: String,
        #[arg(long, short, help = "Goal of the video")]
        goal: Option<String>,
    },

    /// Render a video ad (long-running)
    Video {
        #[arg(help = "Product to advertise")]
        product: String,
        #[arg(long, help = "Resolution: 720p, 1080p")]
        resolution: Option<String>,
        #[arg(long, help = "Aspect ratio: 16:9, 9:16")]
        aspect_ratio: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mCopyForge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CopyError>() {
                Some(err) => {
                    eprintln!("\x1b[31mError:\x1b[0m {}", err.user_message());
                    tracing::debug!(error = %err, "Command failed");
                }
                None => eprintln!("\x1b[31mError:\x1b[0m {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format;
    let output_dir = cli.output;

    let command = match cli.command {
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { global } => config::show(global, &format)?,
                ConfigAction::Path => config::path()?,
                ConfigAction::Init { global, force } => config::init(global, force)?,
            }
            return Ok(());
        }
        other => other,
    };

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                on_interrupt.cancel();
            }
        });

        let ctx = CommandContext::load(cancel, output_dir)?;
        ensure_key_selected(ctx.selector.as_ref()).await;

        match command {
            Commands::Script {
                product,
                audience,
                benefits,
                tone,
                context,
                variants,
            } => {
                generate::script(
                    &ctx,
                    ScriptArgs {
                        product,
                        audience,
                        benefits,
                        tone,
                        context,
                        variants,
                    },
                    &format,
                )
                .await?
            }
            Commands::Images {
                description,
                single,
                reference,
                aspect_ratio,
            } => {
                generate::images(
                    &ctx,
                    ImageArgs {
                        description,
                        single,
                        reference,
                        aspect_ratio,
                    },
                )
                .await?
            }
            Commands::Pack { description, all } => {
                generate::pack(&ctx, &description, all, &format).await?
            }
            Commands::Objection { text, context } => {
                generate::objection(&ctx, text, context, &format).await?
            }
            Commands::VideoScript { product, goal } => {
                generate::video_script(&ctx, product, goal, &format).await?
            }
            Commands::Video {
                product,
                resolution,
                aspect_ratio,
            } => {
                generate::video(
                    &ctx,
                    VideoArgs {
                        product,
                        resolution,
                        aspect_ratio,
                    },
                )
                .await?
            }
            Commands::Config { .. } => {}
        }

        Ok::<(), anyhow::Error>(())
    })
}
