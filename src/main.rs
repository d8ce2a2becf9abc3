mod client;
mod config;
mod gateway;
mod generation;
mod logging;
mod session;
mod types;

use client::cli::{CliClient, LineSource, Terminal, TurnReporter};
use config::{Args, Config};
use gateway::ToolGateway;
use generation::{OpenAiBackend, ToolLoop};
use session::Session;

use anyhow::{Context, Result, bail};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(args.debug);

    let mut terminal = Terminal::new();
    let api_key = match args.api_key() {
        Some(key) => key.to_owned(),
        None => read_api_key(&mut terminal).await?,
    };
    let config = Config::new(args, api_key);

    let (gateway, tools) =
        ToolGateway::connect_best_effort(&config.server_url, config.bearer_token.as_deref()).await;
    match &gateway {
        Some(gateway) => println!(
            "Connected to {} ({} tools: {})",
            gateway.server_name().unwrap_or(gateway.url()),
            tools.len(),
            tools.names().join(", ")
        ),
        None => println!("Tool server unavailable, continuing without tools."),
    }
    println!("Chatting with {}. Type 'exit' or 'quit' to leave.", config.session.model);

    let generator = ToolLoop::new(OpenAiBackend::new(&config.session));
    let session = Session::new(config.session.clone(), generator, tools);
    let mut cli_client = CliClient::new(session, gateway, terminal, TurnReporter::new(config.debug));
    cli_client.chat().await?;
    Ok(())
}

async fn read_api_key(terminal: &mut Terminal) -> Result<String> {
    let line = terminal
        .read_line("Enter your OpenAI API key: ")
        .await
        .context("failed to read the API key")?;
    match line.map(|key| key.trim().to_owned()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => bail!("an OpenAI API key is required"),
    }
}
