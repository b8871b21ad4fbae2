//! memagent command implementations

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use memagent_agent::{MemoryAgent, ToolUse};
use memagent_api::AppState;
use memagent_config::{self, Config};
use memagent_provider::GeminiProvider;
use memagent_session::{ConversationStore, FileStore, MemoryStore};

use crate::client::ApiClient;

/// Config plus the credential check every agent-backed command needs
async fn load_config() -> Result<Config> {
    let config = Config::load().await.context("Failed to load configuration")?;
    config.require_api_key()?;
    Ok(config)
}

async fn build_store(config: &Config) -> Result<Arc<dyn ConversationStore>> {
    match &config.store.dir {
        Some(dir) => {
            let store = FileStore::open(dir)
                .await
                .with_context(|| format!("Cannot open thread directory {}", dir.display()))?;
            info!("Threads persisted under {}", dir.display());
            Ok(Arc::new(store))
        }
        None => {
            info!("Threads kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn build_agent(config: &Config) -> Result<MemoryAgent<GeminiProvider>> {
    let provider = GeminiProvider::new(
        &config.model.api_key,
        config.model.api_base.clone(),
        Some(config.model.model.clone()),
    )
    .with_timeout(Duration::from_secs(config.model.timeout_secs));
    let store = build_store(config).await?;

    Ok(MemoryAgent::new(provider, store, config))
}

fn format_tools(tools: &[ToolUse]) -> String {
    tools
        .iter()
        .map(|t| format!("{}({})", t.name, t.args))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read line from stdin; `None` at end of input
fn read_line() -> Result<Option<String>> {
    read_line_from(&mut std::io::stdin().lock())
}

fn read_line_from(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut input = String::new();
    if reader.read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Read password from stdin (masked input)
fn read_password() -> Result<String> {
    match rpassword::read_password() {
        Ok(key) => Ok(key.trim().to_string()),
        Err(_) => Ok(read_line()?.unwrap_or_default()),
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

fn is_exit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "salir")
}

/// Start the HTTP service
pub async fn serve_command(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config().await?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let agent = build_agent(&config).await?;
    info!(
        "Agent ready: model={} max_tool_iterations={}",
        agent.model(),
        config.agent.max_tool_iterations
    );

    let state = AppState::new();
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;

    state.set_agent(Arc::new(agent));
    memagent_api::serve(listener, state)
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Chat with the agent in-process
pub async fn engage_command(message: Option<String>, thread: String) -> Result<()> {
    let config = load_config().await?;
    let agent = build_agent(&config).await?;

    if let Some(msg) = message {
        let outcome = agent.chat(&msg, &thread).await?;
        println!("{}", outcome.response);
        if !outcome.tools_used.is_empty() {
            println!("[tools: {}]", format_tools(&outcome.tools_used));
        }
        return Ok(());
    }

    println!("Interactive mode on thread '{}' (type 'exit' to quit)", thread);
    loop {
        prompt("> ")?;
        let Some(input) = read_line()? else {
            println!();
            break;
        };
        if input.is_empty() {
            continue;
        }
        if is_exit(&input) {
            break;
        }

        match agent.chat(&input, &thread).await {
            Ok(outcome) => {
                println!("\n{}", outcome.response);
                if !outcome.tools_used.is_empty() {
                    println!("[tools: {}]", format_tools(&outcome.tools_used));
                }
                println!();
            }
            Err(e) => println!("Error: {}\n", e),
        }
    }

    Ok(())
}

/// Interactive chat against a running server
pub async fn remote_command(url: String, thread: String) -> Result<()> {
    let client = ApiClient::new(&url);
    let health = client.health().await?;
    println!(
        "Connected to {} (version {}), thread '{}'. Type 'exit' to quit.",
        url, health.version, thread
    );

    loop {
        prompt("> ")?;
        let Some(input) = read_line()? else {
            println!();
            break;
        };
        if input.is_empty() {
            continue;
        }
        if is_exit(&input) {
            break;
        }

        match client.chat(&input, &thread).await {
            Ok(reply) => {
                println!("\n{}", reply.response);
                if !reply.tools_used.is_empty() {
                    println!("[tools: {}]", format_tools(&reply.tools_used));
                }
                println!();
            }
            Err(e) => println!("Error: {:#}\n", e),
        }
    }

    Ok(())
}

/// Scripted end-to-end check of a running server
pub async fn smoke_command(url: String) -> Result<()> {
    let client = ApiClient::new(&url);
    let memory_thread = "smoke_memory";
    let other_thread = "smoke_other";

    println!("1. Health");
    let health = client.health().await?;
    println!(
        "   status={} agent_ready={} version={}",
        health.status, health.agent_ready, health.version
    );
    if !health.agent_ready {
        bail!("agent is not ready");
    }

    // leftovers from an earlier aborted run
    for thread in ["smoke_single", memory_thread, other_thread] {
        client.clear(thread).await?;
    }

    println!("2. Tools");
    let tools = client.tools().await?;
    for tool in &tools.tools {
        println!("   {}: {}", tool.name, tool.description);
    }

    println!("3. Single operation");
    let reply = client.chat("What is 15 plus 25?", "smoke_single").await?;
    println!("   {}", reply.response);
    println!("   tools: {}", format_tools(&reply.tools_used));

    println!("4. Memory, part 1");
    let first = client.chat("Multiply 6 by 7", memory_thread).await?;
    println!("   {}", first.response);

    println!("5. Memory, part 2");
    let second = client
        .chat("Now divide that result by 3", memory_thread)
        .await?;
    println!("   {}", second.response);
    if second.message_count <= first.message_count {
        bail!(
            "thread did not grow: {} then {}",
            first.message_count,
            second.message_count
        );
    }

    println!("6. History");
    let history = client.history(memory_thread).await?;
    println!("   {} messages on '{}'", history.message_count, history.thread_id);
    if history.message_count != second.message_count {
        warn!(
            "history has {} messages, last turn reported {}",
            history.message_count, second.message_count
        );
    }

    println!("7. Thread separation");
    let other = client
        .chat("What was my last calculation?", other_thread)
        .await?;
    println!("   {}", other.response);
    if other.message_count != client.history(other_thread).await?.message_count {
        bail!("separate thread picked up foreign history");
    }

    println!("8. Cleanup");
    for thread in ["smoke_single", memory_thread, other_thread] {
        client.clear(thread).await?;
    }
    if client.history(memory_thread).await?.message_count != 0 {
        bail!("thread '{}' still has history after clear", memory_thread);
    }

    println!("All checks passed");
    Ok(())
}

/// Contents of the generated `.env`
fn render_env_file(api_key: Option<&str>) -> String {
    let key = api_key
        .filter(|k| !k.trim().is_empty())
        .unwrap_or("your_google_api_key_here");
    format!(
        "# memagent configuration\n\
         \n\
         # Gemini API key (required)\n\
         {}={}\n\
         \n\
         # Server (optional)\n\
         HOST=0.0.0.0\n\
         PORT=8000\n\
         LOG_LEVEL=info\n",
        memagent_config::API_KEY_VAR,
        key
    )
}

async fn write_env_file(path: &Path, api_key: Option<&str>, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    tokio::fs::write(path, render_env_file(api_key))
        .await
        .with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(true)
}

/// Write a `.env` in the current directory
pub async fn setup_command(api_key: Option<String>, force: bool) -> Result<()> {
    let path = memagent_config::env_file_path();
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(());
    }

    let api_key = match api_key {
        Some(key) => key,
        None => {
            println!("A Google API key is needed for Gemini: https://aistudio.google.com/app/apikey");
            prompt("Enter your Google API key (empty to set it later): ")?;
            read_password()?
        }
    };

    write_env_file(&path, Some(&api_key), force).await?;
    if api_key.trim().is_empty() {
        println!("Wrote {}; edit it to add your API key", path.display());
    } else {
        println!("Wrote {} with your API key", path.display());
    }
    println!();
    println!("Next steps:");
    println!("  memagent serve");
    println!("  memagent smoke");
    println!("  memagent remote");

    Ok(())
}

/// Show resolved configuration
pub async fn status_command() -> Result<()> {
    let config = Config::load().await.context("Failed to load configuration")?;
    let config_path = std::env::var(memagent_config::CONFIG_PATH_VAR)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| memagent_config::config_path());

    println!("memagent status");
    println!(
        "Config file:  {} {}",
        config_path.display(),
        if config_path.exists() { "[OK]" } else { "[Not found]" }
    );
    println!(
        "API key:      {}",
        config
            .masked_api_key()
            .unwrap_or_else(|| "[Missing]".to_string())
    );
    println!("Model:        {}", config.model.model);
    println!("Temperature:  {}", config.model.temperature);
    println!("Max steps:    {}", config.agent.max_tool_iterations);
    println!("Listen:       {}", config.bind_address());
    println!("Log level:    {}", config.server.log_level);
    match &config.store.dir {
        Some(dir) => println!("Threads:      {}", dir.display()),
        None => println!("Threads:      in memory"),
    }

    Ok(())
}
