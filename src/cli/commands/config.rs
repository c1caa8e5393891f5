use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(
            long,
            short = 'g',
            help = "Create global config instead of project config"
        )]
        global: bool,
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path {
        #[arg(long, help = "Show all possible config paths")]
        all: bool,
    },
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { global, force } => handle_init(global, force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path { all } => handle_path(all),
    }
}

fn handle_init(global: bool, force: bool, formatter: &dyn Formatter) -> Result<()> {
    let (config_path, scope) = if global {
        let path = Config::global_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        (path, "global")
    } else {
        let path = Config::project_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine project directory"))?;
        (path, "project")
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} config already exists at: {}\nUse --force to overwrite.",
            scope,
            config_path.display()
        );
    }

    Config::default()
        .save_to(&config_path)
        .with_context(|| format!("failed to create {} config", scope))?;
    print!(
        "{}",
        formatter.format_message(&format!(
            "Created {} config at: {}",
            scope,
            config_path.display()
        ))
    );

    Ok(())
}

/// Copy of the config with credentials replaced, safe to print.
fn masked(config: &Config) -> Config {
    let mut config = config.clone();
    let mask = |key: &mut Option<String>| {
        if key.is_some() {
            *key = Some("********".to_string());
        }
    };
    mask(&mut config.embedding.api_key);
    mask(&mut config.vector_store.api_key);
    config
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let resolved = Config::load()?;
    let config = masked(&resolved.config);

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": config,
            "path": resolved.path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match resolved.path {
        Some(ref path) => println!("# Loaded from: {}", path.display()),
        None => println!("# No config file found, using defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn handle_path(show_all: bool) -> Result<()> {
    let active = Config::find_config();

    println!("Configuration paths:");
    println!();

    for (label, path) in [
        ("Project config", Config::project_path()),
        ("Global config", Config::global_path()),
    ] {
        let Some(path) = path else { continue };
        if active.as_ref() == Some(&path) {
            println!("{} (active): {}", label, path.display());
        } else if path.exists() {
            println!("{} (shadowed): {}", label, path.display());
        } else if show_all {
            println!("{} (would be): {}", label, path.display());
        }
    }

    if show_all && let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        if env_path.exists() {
            println!(".env file (active): {}", env_path.display());
        } else {
            println!(".env file (would be): {}", env_path.display());
        }
    }

    Ok(())
}
