use clap::{Arg, Command};
use log::LevelFilter;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;
use unsubscriber::config::{Config, Mode, DEFAULT_CONFIG_PATH};
use unsubscriber::{run, GmailClient, RunSettings, UnsubscribeExecutor};

#[tokio::main]
async fn main() {
    let matches = Command::new("unsubscriber")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Finds and follows the unsubscribe link in labeled Gmail messages")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and print the effective settings")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("nuke")
                .long("nuke")
                .help("Process every inbox message mentioning unsubscribe")
                .conflicts_with("marked")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("marked")
                .long("marked")
                .help("Process only messages carrying the source label")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max")
                .long("max")
                .value_name("N")
                .help("Maximum number of messages to process in this run")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Resolve unsubscribe actions without executing them or relabeling")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .help("Skip the nuke mode confirmation prompt")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);

    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("nuke") {
        config.mode = Mode::Nuke;
    } else if matches.get_flag("marked") {
        config.mode = Mode::Marked;
    }
    if let Some(max) = matches.get_one::<usize>("max") {
        config.max_messages_per_run = *max;
    }

    if let Err(e) = config.validate() {
        eprintln!("❌ Invalid configuration: {e}");
        process::exit(1);
    }

    if matches.get_flag("test-config") {
        print_settings(&config);
        println!("✅ Configuration is valid");
        return;
    }

    if config.is_nuke() {
        println!("*** NUKE MODE ***");
        println!("This will unsubscribe from ALL emails containing 'unsubscribe' in your inbox!");
        if !matches.get_flag("yes") && !confirm() {
            println!("Aborted.");
            return;
        }
        println!();
    } else {
        println!(
            "MARKED MODE - Processing only emails labeled '{}'",
            config.source_label
        );
        println!();
    }

    log::info!("Starting unsubscriber");
    log::info!("Mode: {:?}", config.mode);
    log::info!("Label Name: {}", config.processed_label);

    let gmail = match GmailClient::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::error!("{e:#}");
            process::exit(1);
        }
    };

    let executor = match UnsubscribeExecutor::new(
        gmail.clone(),
        config.http_timeout(),
        &config.http.user_agent,
    ) {
        Ok(executor) => executor,
        Err(e) => {
            log::error!("Failed to create HTTP client: {e}");
            process::exit(1);
        }
    };

    let mut settings = RunSettings::from_config(&config);
    settings.dry_run = matches.get_flag("dry-run");

    println!("Searching for messages...");
    println!();

    match run(gmail.as_ref(), &executor, &settings).await {
        Ok(summary) => {
            println!(
                "Done: {} processed, {} without unsubscribe info, {} failed",
                summary.processed, summary.failed_no_directive, summary.failed_execution
            );
            if settings.dry_run {
                println!("Dry run: {} unsubscribe actions not executed", summary.planned);
            }
            log::info!("Unsubscriber completed");
        }
        Err(e) => {
            log::error!("Run aborted: {e:#}");
            process::exit(1);
        }
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn print_settings(config: &Config) {
    println!("Mode: {:?}", config.mode);
    println!("Search query: {}", config.active_query());
    match config.source_label_in_effect() {
        Some(label) => println!("Source label: {label}"),
        None => println!("Source label: (none)"),
    }
    println!("Processed label: {}", config.processed_label);
    println!("Failed label: {}", config.failed_label);
    println!("Max messages per run: {}", config.max_messages_per_run);
    println!("HTTP timeout: {}s", config.http.timeout_seconds);
    println!("Gmail API: {}", config.gmail.api_base);
}

fn confirm() -> bool {
    print!("\nAre you sure? (yes/no): ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("yes"),
        Err(_) => false,
    }
}
