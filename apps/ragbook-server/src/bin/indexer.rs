use clap::Parser;
use ragbook_core::config::Config;
use ragbook_embed::get_default_embedder;
use ragbook_rag::index_bootstrap;
use ragbook_server::logging;
use ragbook_vector::IndexSource;

#[derive(Parser, Debug)]
#[command(name = "ragbook-indexer", about = "Build the vector index snapshot from the document directory")]
struct Cli {
    /// Rebuild even when a snapshot already exists.
    #[arg(long)]
    force: bool,

    /// Hide the progress bar.
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;
    logging::init(&settings.logging.filter);

    let embedder = get_default_embedder(&settings.embedding)?;
    println!("ragbook indexer\n===============");
    println!("Documents: {} ({})", settings.documents.dir().display(), settings.documents.pattern);
    println!("Snapshot:  {}", settings.index.path().display());

    let outcome = index_bootstrap(&settings, embedder)?
        .with_force_rebuild(cli.force)
        .with_progress(!cli.quiet)
        .run()?;

    match outcome.source {
        IndexSource::Built => println!("\nIndexed {} chunks", outcome.index.len()),
        IndexSource::Loaded => println!("\nSnapshot already present ({} chunks); use --force to rebuild", outcome.index.len()),
    }
    Ok(())
}
