use clap::Parser;
use ragbook_core::config::Config;
use ragbook_embed::get_default_embedder;
use ragbook_llm::get_default_completion;
use ragbook_rag::build_index;
use ragbook_server::{logging, serve, AppState};

#[derive(Parser, Debug)]
#[command(name = "ragbook-server", about = "Serve the chat lessons and the RAG endpoints over HTTP")]
struct Cli {
    /// Address to bind (host:port). Defaults to `server.host`:`server.port`.
    #[arg(long, env = "RAGBOOK_BIND")]
    bind: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;
    logging::init(&settings.logging.filter);

    let embedder = get_default_embedder(&settings.embedding)?;
    let completion = get_default_completion(&settings.completion)?;
    // The index is ready before the listener binds; a failure here is fatal.
    let index = build_index(&settings, embedder.clone())?;
    let state = AppState::from_settings(&settings, index, embedder, completion)?;

    let addr = cli.bind.unwrap_or_else(|| format!("{}:{}", settings.server.host, settings.server.port));
    tokio::runtime::Runtime::new()?.block_on(serve(state, &addr))
}
