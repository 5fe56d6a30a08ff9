mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet)?;

    // Config subcommands must work even when the stored config is broken
    if let Commands::Config { show, reset } = &args.command {
        if *reset {
            AppConfig::reset(args.config.as_deref())?;
            println!("✓ Configuration reset to defaults");
        } else if *show {
            let config = AppConfig::load(args.config.as_deref())?;
            println!("{}", config.show()?);
        } else {
            println!("Use --show to display current configuration or --reset to reset to defaults");
        }
        return Ok(());
    }

    if let Commands::Completions { shell } = &args.command {
        use clap::CommandFactory;
        use clap_complete::generate;

        let mut cmd = Args::command();
        let bin_name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load(args.config.as_deref())?;
    debug!("Starting chlist with config: {:?}", config);

    let timeout = config.timeout(args.timeout);
    let retries = config.retries(args.retries);
    let default_output = config.output;
    let proxy = config
        .proxy
        .resolve(args.proxy, args.proxy_username, args.proxy_password);
    let executor = CommandExecutor::new(config, proxy, args.adaptive)?;

    match args.command {
        Commands::List {
            channel,
            path,
            url,
            output,
            output_file,
        } => {
            executor
                .list_folder(
                    &channel,
                    path.as_deref(),
                    url.as_deref(),
                    output.unwrap_or(default_output),
                    output_file.as_deref(),
                    timeout,
                )
                .await?;
        }

        Commands::Search {
            channel,
            query,
            output,
            output_file,
        } => {
            executor
                .search(
                    &channel,
                    &query,
                    output.unwrap_or(default_output),
                    output_file.as_deref(),
                    timeout,
                )
                .await?;
        }

        Commands::Resolve {
            url,
            channel,
            cookies,
            output,
            output_file,
            quality,
            format,
            auto_select,
        } => {
            executor
                .resolve(
                    &url,
                    channel.as_deref(),
                    cookies.as_deref(),
                    output_file.as_deref(),
                    quality.as_deref(),
                    format.as_deref(),
                    auto_select,
                    output.unwrap_or(default_output),
                    timeout,
                    retries,
                )
                .await?;
        }

        Commands::Channels { detailed, output } => {
            executor
                .list_channels(detailed, &output.unwrap_or(default_output))
                .await?;
        }

        Commands::Completions { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .with(filter)
        .init();

    Ok(())
}
