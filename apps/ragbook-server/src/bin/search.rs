use clap::Parser;
use ragbook_core::config::Config;
use ragbook_embed::get_default_embedder;
use ragbook_llm::get_default_completion;
use ragbook_rag::{build_index, RagPipeline};
use ragbook_server::logging;

#[derive(Parser, Debug)]
#[command(name = "ragbook-search", about = "Query the vector index from the command line")]
struct Cli {
    /// Query text. Defaults to `retrieval.default_query`.
    query: Option<String>,

    /// Number of chunks to retrieve.
    #[arg(long, short = 'k')]
    top_k: Option<usize>,

    /// Answer the query with the language model instead of listing hits.
    #[arg(long)]
    ask: bool,
}

fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max { flat } else { format!("{}...", flat.chars().take(max).collect::<String>()) }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;
    logging::init(&settings.logging.filter);

    let query = cli.query.unwrap_or_else(|| settings.retrieval.default_query.clone());
    let embedder = get_default_embedder(&settings.embedding)?;
    let index = build_index(&settings, embedder.clone())?;

    if cli.ask {
        let completion = get_default_completion(&settings.completion)?;
        let pipeline = RagPipeline::from_settings(&settings, index, embedder, completion)?;
        let answer = pipeline.answer(&query)?;
        println!("{}\n", answer.answer);
        for hit in &answer.sources {
            println!("  [{:.3}] {}", hit.score, hit.chunk.id);
        }
        return Ok(());
    }

    let top_k = cli.top_k.unwrap_or(settings.retrieval.top_k);
    let retriever = ragbook_vector::Retriever::new(index, embedder);
    let hits = retriever.search(&query, top_k)?;
    println!("Query: {query}\nFound {} results", hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {}\n   {}", rank + 1, hit.score, hit.chunk.id, preview(&hit.chunk.content, 160));
    }
    Ok(())
}
