//! CLI entry point for learncheck

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use learncheck_core::config::{Config, ConfigLoader};
use learncheck_core::init_logging;
use learncheck_flow::{
    HairCheckScreen, JoinOutcome, LearningCheck, SystemMediaProbe,
};
use learncheck_session::{ChapterContext, HttpConversationClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "learncheck")]
#[command(about = "Drive a learning-check conversation session from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe local camera and microphone and print a hair-check report
    Devices,
    /// Run a learning check for a chapter
    Run {
        /// Chapter id sent to the conversation API
        #[arg(long)]
        chapter_id: String,
        /// Chapter title the conversation is scoped to
        #[arg(long)]
        chapter_title: String,
        /// Course id, if the chapter belongs to one
        #[arg(long)]
        course_id: Option<String>,
        /// Session time limit in seconds (defaults from config)
        #[arg(short, long)]
        time_limit: Option<u32>,
    },
    /// Show resolved configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Devices => {
            // Probing is local only; fall back to defaults when no valid
            // config (e.g. no API key yet) exists.
            let config = config_loader.load().unwrap_or_default();
            let _guard = init_logging(&config.logging);
            run_devices(&config)?;
        }
        Commands::Run {
            chapter_id,
            chapter_title,
            course_id,
            time_limit,
        } => {
            let config = config_loader.load()?;
            let _guard = init_logging(&config.logging);
            info!("Running learning check for chapter {}", chapter_id);
            run_learning_check(&config, chapter_id, chapter_title, course_id, time_limit).await?;
        }
        Commands::Status => {
            let config = config_loader.load()?;
            run_status(&config_loader, &config)?;
        }
    }

    Ok(())
}

fn run_devices(config: &Config) -> Result<()> {
    let screen = HairCheckScreen::new(
        Box::new(SystemMediaProbe::from_config(&config.devices)),
        &config.devices,
    );
    let report = screen.report();

    println!("{}", style("Hair check").bold());
    print_device("Camera", &report.camera, config.devices.require_camera);
    print_device(
        "Microphone",
        &report.microphone,
        config.devices.require_microphone,
    );

    match screen.ensure_ready() {
        Ok(_) => println!("\n{}", style("Ready to join a session").green()),
        Err(err) => println!("\n{} {}", style("Not ready:").red(), err),
    }
    Ok(())
}

fn print_device(
    label: &str,
    result: &std::result::Result<learncheck_flow::DeviceInfo, learncheck_flow::DeviceError>,
    required: bool,
) {
    let requirement = if required { "required" } else { "optional" };
    match result {
        Ok(info) => println!(
            "  {} {} ({}, {})",
            style("✓").green(),
            label,
            info.name,
            requirement
        ),
        Err(err) => println!("  {} {} ({}): {}", style("✗").red(), label, requirement, err),
    }
}

async fn run_learning_check(
    config: &Config,
    chapter_id: String,
    chapter_title: String,
    course_id: Option<String>,
    time_limit: Option<u32>,
) -> Result<()> {
    let mut chapter = ChapterContext::new(chapter_id, chapter_title.clone());
    if let Some(course_id) = course_id {
        chapter = chapter.with_course(course_id);
    }

    let client = HttpConversationClient::from_config(config);
    let screen = HairCheckScreen::new(
        Box::new(SystemMediaProbe::from_config(&config.devices)),
        &config.devices,
    );

    let mut flow = LearningCheck::new(chapter, Arc::new(client), screen);
    if let Some(seconds) = time_limit {
        flow = flow.with_time_limit(seconds);
    }

    println!(
        "{} {}",
        style("Learning check:").bold(),
        style(&chapter_title).cyan()
    );

    flow.start()?;
    println!("Running hair check and creating conversation session...");

    match flow.join().await {
        JoinOutcome::Joined(handle) => {
            println!("{}", style("Session created").green());
            println!("  Conversation URL: {}", style(&handle.conversation_url).underlined());
            if let Some(expires_at) = handle.expires_at {
                println!("  Expires at:       {}", expires_at);
            }
            println!("\nOpen the URL in a browser to talk to the avatar.");

            let leave_now = Confirm::new()
                .with_prompt("Leave the session?")
                .default(true)
                .interact()
                .unwrap_or(true);
            if !leave_now {
                println!("Leaving anyway; the remote session is time-boxed.");
            }
            flow.leave().await;
            println!("{}", style("Session ended").green());
        }
        JoinOutcome::DeviceBlocked(err) => {
            println!("{} {}", style("Device check failed:").red(), err);
            println!("Run `learncheck devices` for a full report.");
            flow.cancel()?;
        }
        JoinOutcome::Failed(message) => {
            println!("{} {}", style("Could not create session:").red(), message);
        }
        JoinOutcome::AlreadyPending | JoinOutcome::InvalidState(_) => {
            // Single-shot CLI flow; these cannot occur here.
        }
    }

    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("learncheck status").bold());
    println!("  Config dir:   {}", loader.config_dir().display());
    println!("  API base URL: {}", config.session.base_url);
    println!("  API key:      {}", redact(&config.session.api_key));
    if config.session.persona_id.is_empty() {
        println!("  Persona:      (server default)");
    } else {
        println!("  Persona:      {}", config.session.persona_id);
    }
    println!(
        "  Time limit:   {}s",
        config.learning_check.default_time_limit_secs
    );
    println!(
        "  Devices:      camera {}, microphone {}",
        requirement(config.devices.require_camera),
        requirement(config.devices.require_microphone)
    );
    Ok(())
}

fn requirement(required: bool) -> &'static str {
    if required {
        "required"
    } else {
        "optional"
    }
}

fn redact(key: &str) -> String {
    if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}{}", &key[..4], "*".repeat(key.len() - 4))
    }
}
