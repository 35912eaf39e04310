use anyhow::Result;
use botlink_core::{agent, config, link, providers, router, state, tools};
use clap::{Parser, Subcommand};
use console::style;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "botlink")]
#[command(about = "botlink - put an LLM agent on a live game server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single goal and exit
    Run { goal: String },
    /// Interactive session; goals share one conversation
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    let config = config::Config::load_or_init()?;
    let provider = providers::create_provider(&config)?;

    let game_state = Arc::new(state::GameState::with_event_buffer(config.link.event_buffer));
    let message_router = router::MessageRouter::new(game_state.clone());
    let message_link = Arc::new(link::MessageLink::new(
        config.link.addr.clone(),
        message_router,
        Box::new(link::FixedBackoff::from_secs(config.link.reconnect_secs)),
    ));

    let link_task = {
        let message_link = message_link.clone();
        tokio::spawn(async move { message_link.connect().await })
    };

    let registry = Arc::new(agent::ToolRegistry::new());
    registry.register(Arc::new(tools::SendCommandTool::new(message_link.clone())));
    registry.register(Arc::new(tools::QueryStateTool::new(game_state)));

    let directive = agent::DirectiveBuilder::new().build();
    let mut agent_loop = agent::AgentLoop::new(provider, registry, directive)
        .with_max_rounds(config.max_rounds);

    let outcome = match command {
        Commands::Run { goal } => run_goal(&mut agent_loop, &goal).await,
        Commands::Chat => chat(&mut agent_loop).await,
    };

    message_link.stop().await;
    link_task.abort();

    outcome
}

async fn run_goal(agent_loop: &mut agent::AgentLoop, goal: &str) -> Result<()> {
    match agent_loop.run(goal).await {
        Ok(answer) => {
            println!("{}", answer);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            Err(e)
        }
    }
}

async fn chat(agent_loop: &mut agent::AgentLoop) -> Result<()> {
    println!("{}", style("botlink").cyan().bold());
    println!("Goal per line (Ctrl+D to exit):\n");

    use std::io::{self, BufRead};
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    loop {
        print!("> ");
        let _ = stdout_lock.flush();

        let mut input = String::new();
        let mut reader = stdin.lock();

        match reader.read_line(&mut input) {
            Ok(0) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                match agent_loop.run(input).await {
                    Ok(answer) => println!("\n{}\n", answer),
                    Err(e) => eprintln!("\n{} {}\n", style("error:").red().bold(), e),
                }
            }
            Err(_) => {
                println!("\n👋 Goodbye!");
                break;
            }
        }
    }

    Ok(())
}
