//! Privacy Please CLI
//!
//! CLI tool for resolving redirects and managing settings files.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use pp_core::{defaults::default_registry, Resolution, Settings};
use pp_settings::{normalize_settings, parse_settings, to_json};

mod store;

use store::{finish, open_store};

#[derive(Parser)]
#[command(name = "pp-cli")]
#[command(about = "Privacy Please redirect resolver and settings tools")]
struct Cli {
    /// Settings file to read and update
    #[arg(short, long, global = true, default_value = "settings.json")]
    settings: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve request URLs against the settings
    Resolve {
        /// URLs to resolve
        urls: Vec<String>,

        /// File with one URL per line
        #[arg(short, long)]
        input: Option<String>,

        /// Print one JSON object per URL
        #[arg(long)]
        json: bool,
    },

    /// Validate a settings document
    Validate {
        /// Document to check (defaults to --settings)
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Summarize the settings
    Info,

    /// Print the built-in default settings
    Defaults {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Enable redirection for a site
    Enable { domain: String },

    /// Disable redirection for a site
    Disable { domain: String },

    /// Set the preferred instance for a site
    Prefer { domain: String, instance: String },

    /// Go back to the site's default instance
    ResetInstance { domain: String },

    /// Add a custom instance to a site
    AddInstance { domain: String, instance: String },

    /// Remove a custom instance from a site
    RemoveInstance { domain: String, instance: String },

    /// Turn the extension on or off
    Global {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Replace all site settings with the built-in defaults
    Reset,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let path = cli.settings.as_path();
    let result = match cli.command {
        Commands::Resolve { urls, input, json } => cmd_resolve(path, &urls, input.as_deref(), json),
        Commands::Validate { input } => cmd_validate(input.as_deref().map(Path::new).unwrap_or(path)),
        Commands::Info => cmd_info(path),
        Commands::Defaults { output } => cmd_defaults(output.as_deref()),
        Commands::Enable { domain } => cmd_set_enabled(path, &domain, true),
        Commands::Disable { domain } => cmd_set_enabled(path, &domain, false),
        Commands::Prefer { domain, instance } => cmd_prefer(path, &domain, &instance),
        Commands::ResetInstance { domain } => cmd_reset_instance(path, &domain),
        Commands::AddInstance { domain, instance } => cmd_add_instance(path, &domain, &instance),
        Commands::RemoveInstance { domain, instance } => cmd_remove_instance(path, &domain, &instance),
        Commands::Global { state } => cmd_global(path, matches!(state, Switch::On)),
        Commands::Reset => cmd_reset(path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_resolve(path: &Path, urls: &[String], input: Option<&str>, json: bool) -> Result<(), String> {
    let mut all: Vec<String> = urls.to_vec();
    if let Some(input) = input {
        let content = fs::read_to_string(input)
            .map_err(|e| format!("Failed to read '{}': {}", input, e))?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    if all.is_empty() {
        return Err("No URLs specified".to_string());
    }

    let store = open_store(path)?;
    let mut redirected = 0usize;
    for url in &all {
        let resolution = store.resolve(url);
        if resolution.is_redirect() {
            redirected += 1;
        }
        if json {
            println!("{}", resolution_json(url, &resolution));
        } else {
            println!("{}", resolution_line(url, &resolution));
        }
    }

    if !json && all.len() > 1 {
        println!();
        println!("Resolved {} URLs, {} redirected", all.len(), redirected);
    }

    Ok(())
}

fn resolution_line(url: &str, resolution: &Resolution) -> String {
    match resolution.redirect_url.as_deref() {
        Some(target) => format!("{} -> {} ({})", url, target, resolution.reason.as_str()),
        None => format!("{} (no redirect: {})", url, resolution.reason.as_str()),
    }
}

fn resolution_json(url: &str, resolution: &Resolution) -> serde_json::Value {
    serde_json::json!({
        "url": url,
        "redirect": resolution.is_redirect(),
        "redirectUrl": resolution.redirect_url,
        "site": resolution.site,
        "handler": resolution.handler,
        "reason": resolution.reason.as_str(),
    })
}

fn cmd_validate(input: &Path) -> Result<(), String> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let parsed = parse_settings(&text).map_err(|e| format!("Invalid settings: {}", e))?;
    let mut settings = parsed.settings;
    let stats = normalize_settings(&mut settings);

    println!("Settings '{}' are valid", input.display());
    println!("  Format:            {:?}", parsed.format);
    println!("  Sites:             {}", stats.sites);
    println!("  Extension:         {}", on_off(settings.extension_enabled()));
    if parsed.instances_filled > 0 {
        println!("  Instances filled:  {}", parsed.instances_filled);
    }
    if stats.changed() {
        println!("  Sites added:       {}", stats.sites_added);
        println!("  Handlers restored: {}", stats.handlers_restored);
        println!("  Sites repaired:    {} ({:?})", stats.repaired_sites, stats.repairs);
    }

    Ok(())
}

fn cmd_info(path: &Path) -> Result<(), String> {
    let store = open_store(path)?;
    let settings = store.snapshot();

    println!("Settings: {}", path.display());
    println!("  Extension:   {}", on_off(settings.extension_enabled()));
    println!("  Sites:       {}", settings.registry.len());
    println!();

    println!("{:<22} {:<4} {:>5} {:>7} {:>9}  Preferred", "Site", "On", "Inst", "Custom", "Handlers");
    for (domain, entry) in settings.registry.iter() {
        println!(
            "{:<22} {:<4} {:>5} {:>7} {:>9}  {}",
            domain,
            on_off(entry.enabled),
            entry.instances.len(),
            entry.custom_instances.len(),
            entry.path_handlers.len(),
            entry.effective_instance().unwrap_or("-"),
        );
    }

    Ok(())
}

fn cmd_defaults(output: Option<&str>) -> Result<(), String> {
    let settings = Settings::defaults();
    let json = to_json(&settings).map_err(|e| format!("Failed to serialize defaults: {}", e))?;

    match output {
        Some(output) => {
            fs::write(output, &json).map_err(|e| format!("Failed to write '{}': {}", output, e))?;
            println!("Wrote {} default sites to '{}'", default_registry().len(), output);
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn cmd_set_enabled(path: &Path, domain: &str, enabled: bool) -> Result<(), String> {
    let store = open_store(path)?;
    finish(path, store.set_enabled(domain, enabled))?;
    println!("{} redirection for {}", if enabled { "Enabled" } else { "Disabled" }, domain);
    Ok(())
}

fn cmd_prefer(path: &Path, domain: &str, instance: &str) -> Result<(), String> {
    let store = open_store(path)?;
    finish(path, store.set_preferred_instance(domain, instance))?;
    println!("Preferred instance for {}: {}", domain, preferred(&store.snapshot(), domain));
    Ok(())
}

fn cmd_reset_instance(path: &Path, domain: &str) -> Result<(), String> {
    let store = open_store(path)?;
    finish(path, store.reset_to_default_instance(domain))?;
    println!("Preferred instance for {}: {}", domain, preferred(&store.snapshot(), domain));
    Ok(())
}

fn cmd_add_instance(path: &Path, domain: &str, instance: &str) -> Result<(), String> {
    let store = open_store(path)?;
    finish(path, store.add_custom_instance(domain, instance))?;
    let count = store
        .snapshot()
        .registry
        .get(domain)
        .map(|entry| entry.custom_instances.len())
        .unwrap_or(0);
    println!("Added custom instance for {} ({} custom)", domain, count);
    Ok(())
}

fn cmd_remove_instance(path: &Path, domain: &str, instance: &str) -> Result<(), String> {
    let store = open_store(path)?;
    let before = preferred(&store.snapshot(), domain);
    finish(path, store.remove_custom_instance(domain, instance))?;
    println!("Removed custom instance from {}", domain);
    let after = preferred(&store.snapshot(), domain);
    if after != before {
        println!("  Preferred instance reset to {}", after);
    }
    Ok(())
}

fn cmd_global(path: &Path, enabled: bool) -> Result<(), String> {
    let store = open_store(path)?;
    finish(path, Ok(store.set_global_enabled(enabled)))?;
    println!("Extension {}", on_off(enabled));
    Ok(())
}

fn cmd_reset(path: &Path) -> Result<(), String> {
    let store = open_store(path)?;
    finish(path, Ok(store.reset_to_defaults()))?;
    println!("Reset {} sites to defaults", store.snapshot().registry.len());
    Ok(())
}

fn preferred(settings: &Settings, domain: &str) -> String {
    settings
        .registry
        .get(domain)
        .and_then(|entry| entry.effective_instance())
        .unwrap_or("-")
        .to_string()
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
