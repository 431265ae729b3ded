use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ragchat_chat::{llm_from_settings, ConversationState, Engine};
use ragchat_cli::{init_logging, CommonArgs};
use ragchat_core::config::Settings;
use ragchat_core::source::InlineSource;
use ragchat_core::traits::{Embedder, LanguageModel};
use ragchat_embed::embedder_from_settings;
use ragchat_vector::RetrieverConfig;

const DEMO_TEXTS: [&str; 5] = [
    "司徒永聪是一名软件开发者，专注于系统运维和前端开发。",
    "他经营个人博客 situ2001.com/blog，分享技术实践。",
    "他擅长 QNAP NAS 调优和自动化脚本开发。",
    "他使用 GTD、Obsidian、Logseq 等工具提升生产力。",
    "他喜欢旅行，记录生活体验和技术成长。",
];

#[derive(Parser, Debug)]
#[command(
    name = "ragchat-retrieve",
    about = "Compare retrieval strategies on one question, optionally answering it"
)]
struct RetrieveCli {
    /// Question to retrieve fragments for
    #[arg(default_value = "司徒永聪的技术专长是什么？")]
    question: String,

    /// Index the five built-in demo sentences instead of the configured corpus
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Also answer the question with the configured retriever
    #[arg(long, default_value_t = false)]
    answer: bool,

    /// With --answer, print the rendered prompt instead of calling the model
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn strategies() -> Vec<(&'static str, RetrieverConfig)> {
    vec![
        ("default similarity", RetrieverConfig::similarity(4)),
        ("top 3 by similarity", RetrieverConfig::similarity(3)),
        ("mmr (k=2, fetch_k=4, lambda=0.5)", RetrieverConfig::mmr(2, 4, 0.5)),
        ("similarity, threshold 0.7", RetrieverConfig::similarity(3).with_score_threshold(0.7)),
    ]
}

async fn build_engine(cli: &RetrieveCli, settings: &Settings) -> Result<Engine> {
    let show_progress = !cli.common.no_progress;
    if cli.demo {
        let source = InlineSource::new(DEMO_TEXTS);
        let embedder: Arc<dyn Embedder> = embedder_from_settings(settings)?;
        let llm: Arc<dyn LanguageModel> = llm_from_settings(settings)?;
        return Ok(Engine::build(&source, embedder, llm, settings, show_progress).await?);
    }
    let base_dir = std::env::current_dir().context("failed to read current directory")?;
    Ok(Engine::bootstrap(settings, &base_dir, show_progress).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RetrieveCli::parse();
    if cli.dry_run && !cli.answer {
        bail!("--dry-run only applies together with --answer");
    }
    let settings = cli.common.settings()?;
    init_logging(&settings.logging.level);

    let engine = build_engine(&cli, &settings).await.context("failed to initialize the engine")?;
    println!("=== Retrieval strategy comparison ===");
    println!("Question: {}", cli.question);
    println!("Corpus: {} fragments\n", engine.status().fragments);

    for (label, config) in strategies() {
        let retriever = engine.retriever_with(config)?;
        println!("--- {label} ---");
        match retriever.retrieve_scored(&cli.question).await {
            Ok(hits) if hits.is_empty() => println!("  (no fragments passed the filters)"),
            Ok(hits) => {
                for (rank, hit) in hits.iter().enumerate() {
                    println!("  {}. [{:.4}] {}", rank + 1, hit.score, hit.fragment.content);
                }
            }
            Err(e) => println!("  ❌ {e}"),
        }
        println!();
    }

    if cli.answer {
        let mut conversation = ConversationState::new();
        conversation.begin_turn();
        let pipeline = engine.pipeline();
        if cli.dry_run {
            let prompt = pipeline.prepare(&cli.question, &conversation).await?;
            println!("--- Rendered prompt ---\n{prompt}");
            println!("dry-run enabled; skipping model call.");
        } else {
            let answer = pipeline.invoke(&cli.question, &conversation).await?;
            println!("🤖 Answer:\n{answer}");
        }
    }
    Ok(())
}
