use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;

use ragchat_chat::{Engine, SessionController};
use ragchat_cli::{init_logging, CommonArgs};

#[derive(Parser, Debug)]
#[command(name = "ragchat", about = "Ask questions about a local text corpus, with conversation memory")]
struct ChatCli {
    #[command(flatten)]
    common: CommonArgs,
}

async fn start(cli: &ChatCli) -> anyhow::Result<SessionController> {
    let settings = cli.common.settings()?;
    init_logging(&settings.logging.level);

    println!("🚀 Initializing Q&A system...");
    println!("📖 Loading documents from {}", settings.data.source);
    let base_dir = std::env::current_dir().context("failed to read current directory")?;
    let engine = Engine::bootstrap(&settings, &base_dir, !cli.common.no_progress).await?;
    println!("📄 Indexed {} document fragments", engine.status().fragments);
    println!("✅ System initialized successfully!");
    Ok(SessionController::new(engine))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ChatCli::parse();
    let mut controller = match start(&cli).await {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("💥 Application failed to start: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = controller.run(stdin, tokio::io::stdout()).await {
        eprintln!("❌ Session ended unexpectedly: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
