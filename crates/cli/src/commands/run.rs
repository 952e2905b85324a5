//! `conductor run` — drive an agent from a scripted provider.
//!
//! The script is a JSON array of provider responses, consumed one per
//! provider call:
//!
//! ```json
//! [
//!   {"tool_calls": [{"id": "c1", "name": "add", "arguments": {"a": 5, "b": 3}}]},
//!   {"content": "5 + 3 = 8"}
//! ]
//! ```

use super::breakpoints::{StdinBreakpoints, read_line};
use super::tools::demo_tools;
use async_trait::async_trait;
use conductor_agent::breakpoint::parse_edit;
use conductor_agent::{Agent, spawn_console};
use conductor_config::AppConfig;
use conductor_core::error::ProviderError;
use conductor_core::provider::{Provider, ProviderRequest, ProviderResponse};
use conductor_telemetry::JsonFileBehaviorLog;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// JSON file with the scripted provider responses
    #[arg(short, long)]
    script: PathBuf,

    /// Send a single prompt instead of entering interactive mode
    #[arg(short, long)]
    message: Option<String>,

    /// Override the configured iteration limit
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Pause at breakpoints
    #[arg(long)]
    debug: bool,

    /// Also pause before this tool (repeatable)
    #[arg(long = "break-on", value_name = "TOOL")]
    break_on: Vec<String>,

    /// Print the execution trace after each answer
    #[arg(long)]
    trace: bool,

    /// Print the execution trace as JSON after each answer
    #[arg(long)]
    trace_json: bool,

    /// Render every tool call field by field
    #[arg(long)]
    verbose_tools: bool,

    /// Hide progress lines
    #[arg(short, long)]
    quiet: bool,
}

/// A provider that replays canned responses in order.
#[derive(Debug)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
}

impl ScriptedProvider {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let responses: Vec<ProviderResponse> = serde_json::from_str(json)?;
        Ok(Self {
            responses: Mutex::new(responses.into()),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read script {}: {e}", path.display()))?;
        Ok(Self::from_json(&content)
            .map_err(|e| format!("Failed to parse script {}: {e}", path.display()))?)
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        let mut response = responses.pop_front().ok_or_else(|| {
            ProviderError::InvalidResponse("script exhausted: no responses left".into())
        })?;
        if response.model.is_empty() {
            response.model = request.model;
        }
        Ok(response)
    }
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max) = args.max_iterations {
        config.max_iterations = max;
    }
    config.debug.enabled |= args.debug;
    config.debug.breakpoints.extend(args.break_on.iter().cloned());
    config.trace.verbose |= args.verbose_tools;
    config.validate()?;

    let provider = Arc::new(ScriptedProvider::from_file(&args.script)?);
    tracing::debug!(responses = provider.remaining(), script = %args.script.display(), "Loaded provider script");
    let mut agent = Agent::from_config(provider, &config)
        .with_tools(demo_tools())
        .with_breakpoint_handler(Arc::new(StdinBreakpoints));
    if config.behavior_log.enabled {
        let log = JsonFileBehaviorLog::open(config.behavior_log.resolved_path());
        agent = agent.with_behavior_log(Arc::new(log));
    }

    let console = (!args.quiet).then(|| {
        spawn_console(&agent.event_bus(), config.trace.preview_chars, std::io::stderr())
    });

    let outcome = match &args.message {
        Some(message) => single(&mut agent, message, &args, &config).await,
        None => interactive(&mut agent, &args, &config).await,
    };

    if let Some(console) = console {
        console.abort();
    }
    outcome
}

async fn single(
    agent: &mut Agent,
    message: &str,
    args: &RunArgs,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let answer = agent.input(message).await?;
    // Let the console drain before the answer lands on stdout
    tokio::task::yield_now().await;
    println!("{answer}");
    print_trace(agent, args, config)
}

async fn interactive(
    agent: &mut Agent,
    args: &RunArgs,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  Conductor — Interactive Mode");
    println!();
    println!("  Model:       {}", config.model);
    println!("  Tools:       {}", agent.tools().names().join(", "));
    println!(
        "  Debugging:   {}",
        if agent.is_debugging() { "on" } else { "off" }
    );
    println!();
    println!("  Commands: :trace  :json  :replay <tool> [json]  :reset  exit");
    println!();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            ":trace" => println!("{}", agent.trace().render(config.trace.preview_chars)),
            ":json" => println!("{}", agent.trace().to_json()?),
            ":reset" => {
                agent.reset();
                println!("  Conversation and trace cleared.");
            }
            _ if line.starts_with(":replay") => replay(agent, line, config).await,
            prompt => match agent.input(prompt).await {
                Ok(answer) => {
                    tokio::task::yield_now().await;
                    println!();
                    for line in answer.lines() {
                        println!("  Assistant > {line}");
                    }
                    println!();
                    print_trace(agent, args, config)?;
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            },
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

async fn replay(agent: &Agent, line: &str, config: &AppConfig) {
    let rest = line.trim_start_matches(":replay").trim();
    let (tool, overrides) = match rest.split_once(char::is_whitespace) {
        Some((tool, json)) => (tool, json.trim()),
        None => (rest, ""),
    };
    if tool.is_empty() {
        eprintln!("  usage: :replay <tool> [{{\"arg\": value}}]");
        return;
    }

    let overrides = if overrides.is_empty() {
        serde_json::Map::new()
    } else {
        match parse_edit(&serde_json::Value::String(overrides.to_string())) {
            Ok(map) => map,
            Err(e) => {
                eprintln!("  [Error] overrides must be a JSON object: {e}");
                return;
            }
        }
    };

    match agent.replay(tool, overrides).await {
        Some(result) => println!(
            "  ↻ {tool} → {}",
            conductor_telemetry::preview(&result.to_content(), config.trace.preview_chars)
        ),
        None => eprintln!("  [Error] '{tool}' has not been called yet"),
    }
}

fn print_trace(
    agent: &Agent,
    args: &RunArgs,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.trace {
        eprintln!("{}", agent.trace().render(config.trace.preview_chars));
    }
    if args.trace_json {
        println!("{}", agent.trace().to_json()?);
    }
    Ok(())
}
