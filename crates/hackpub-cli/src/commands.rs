use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use hackpub_server::{HackpubServer, PublishConfig, ServerConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    config.validate()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(HackpubServer::new(config).serve())?;
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = load_config(Some(&args.path))?;
    println!("{} {} is valid", "✓".green().bold(), args.path.display().to_string().bold());
    println!("  Listen: {}", config.bind_addr.to_string().cyan());
    for line in describe_routes(&config) {
        println!("  {line}");
    }
    Ok(())
}

fn describe_service(publish: &PublishConfig) -> String {
    let cors = publish.allow_origins.as_deref().unwrap_or("off");
    let ppx = if publish.enable_ppx { "on" } else { "off" };
    format!(
        "max payload {} bytes, cors {cors}, ppx {ppx}",
        publish.max_payload_size
    )
}

/// One line per mount point, root first.
fn describe_routes(config: &ServerConfig) -> Vec<String> {
    let mut lines = vec![format!(
        "/ -> {} ({})",
        config.url_base,
        describe_service(&config.publish)
    )];
    if let Some(mux) = &config.multiplexer {
        for (name, service) in &mux.services {
            lines.push(format!(
                "/{}/{name}/ -> {} ({})",
                mux.prefix,
                service.url_base,
                describe_service(&service.publish)
            ));
        }
    }
    lines
}
