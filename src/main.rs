use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::{Value, json};

use fsjson::Storage;
use fsjson::cli::{Cli, Command, OutputFormat};
use fsjson::config::{MountConfig, parse_utc_offset};
use fsjson::fs::HostFileSystem;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    fsjson::logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fsjson: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn mount_config(cli: &Cli) -> anyhow::Result<MountConfig> {
    let mut config = MountConfig::new(cli.medium, &cli.root);
    config.format_if_failed = !cli.no_format;
    config.utc_offset = parse_utc_offset(&cli.utc_offset)?;
    if let Some(capacity) = cli.capacity {
        config.capacity_bytes = capacity;
    }
    Ok(config)
}

fn print_json(value: &Value, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = mount_config(&cli)?;
    let storage = Storage::mount(&config)
        .await
        .with_context(|| format!("cannot mount {}", config.root.display()))?;

    execute(&storage, cli.command).await
}

async fn execute(storage: &Storage<HostFileSystem>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Tree {
            path,
            level,
            format: OutputFormat::Json,
            pretty,
        } => {
            let document = storage.list_dir_json(&path, level).await?;
            print_json(&document, pretty)
        }
        Command::Tree {
            path,
            level,
            format: OutputFormat::Text,
            ..
        } => {
            let mut stdout = std::io::stdout().lock();
            storage.print_dir(&mut stdout, &path, level).await?;
            Ok(stdout.flush()?)
        }
        Command::Ls { path, pretty } => print_json(&storage.list_files_json(&path).await, pretty),
        Command::Count { path } => {
            println!("{}", storage.count_files(&path).await);
            Ok(())
        }
        Command::Cat { path } => {
            let content = storage.read_file(&path).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            Ok(stdout.flush()?)
        }
        Command::Write {
            path,
            content,
            create,
            append,
        } => {
            if append {
                storage.append_file(&path, &content).await?;
            } else {
                storage.write_file(&path, &content, create).await?;
            }
            Ok(())
        }
        Command::Mkdir { path } => Ok(storage.create_dir(&path).await?),
        Command::Rm { path } => {
            let removed = storage.remove_files(&path).await?;
            println!("{removed}");
            Ok(())
        }
        Command::Df => {
            let document = json!({
                "totalBytes": storage.total_bytes()?,
                "usedBytes": storage.used_bytes().await?,
                "freeBytes": storage.free_bytes().await?,
            });
            print_json(&document, false)
        }
    }
}
