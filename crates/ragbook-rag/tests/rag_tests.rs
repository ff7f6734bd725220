use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use ragbook_core::config::{EmbeddingProvider, Settings};
use ragbook_core::error::{Error, Result};
use ragbook_core::traits::{CompletionService, Embedder};
use ragbook_core::types::{ChatMessage, DocumentChunk, Role, SearchHit};
use ragbook_embed::FakeEmbedder;
use ragbook_llm::{EchoCompletion, PromptLibrary, PromptTemplate};
use ragbook_rag::{build_index, ArtistSongs, Lessons, PromptAssembler, RagPipeline};

const JOHN: &str = "In the beginning was the Word, and the Word was with God, and the Word was God.";
const GENESIS: &str = "And God said, Let there be light: and there was light.";

struct Scripted {
    reply: String,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl Scripted {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: reply.to_string(), seen: Mutex::new(Vec::new()) })
    }
    fn last(&self) -> Vec<ChatMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl CompletionService for Scripted {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

fn workspace(root: &Path) -> Settings {
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("prompts")).unwrap();
    fs::write(root.join("data/john1.txt"), JOHN).unwrap();
    fs::write(root.join("data/genesis.txt"), GENESIS).unwrap();
    fs::write(root.join("prompts/rag-john.st"), "Use these documents:\n{documents}\nQuestion: {input}").unwrap();
    fs::write(root.join("prompts/john.st"), "Context: {context}\nWho is the Word?").unwrap();
    fs::write(root.join("prompts/youtube.st"), "Top 10 {genre} YouTube channels.").unwrap();
    fs::write(root.join("prompts/songs-list.st"), "Songs by {artist}.\n{format}").unwrap();
    fs::write(root.join("prompts/songs-map.st"), "Songs by {artist}.\n{format}").unwrap();
    fs::write(root.join("prompts/songs-bean.st"), "Songs by {artist}.\n{format}").unwrap();

    let mut settings = Settings::default();
    settings.documents.dir = root.join("data").display().to_string();
    settings.index.path = root.join("vectorstore.json").display().to_string();
    settings.prompts.dir = root.join("prompts").display().to_string();
    settings.prompts.context_file = root.join("data/john1.txt").display().to_string();
    settings.embedding.provider = EmbeddingProvider::Fake;
    settings
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(FakeEmbedder::new(256))
}

#[test]
fn build_index_writes_then_reuses_snapshot() {
    let tmp = TempDir::new().unwrap();
    let settings = workspace(tmp.path());

    let built = build_index(&settings, embedder()).expect("build");
    assert_eq!(built.len(), 2);
    assert!(tmp.path().join("vectorstore.json").is_file());

    fs::remove_file(tmp.path().join("data/genesis.txt")).unwrap();
    let loaded = build_index(&settings, embedder()).expect("load");
    assert_eq!(loaded.len(), 2, "snapshot is trusted as-is");
    assert_eq!(loaded.entries(), built.entries());
}

#[test]
fn build_index_without_documents_fails() {
    let tmp = TempDir::new().unwrap();
    let mut settings = workspace(tmp.path());
    settings.documents.pattern = "*.md".into();
    let err = build_index(&settings, embedder()).unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(_)), "got {err:?}");
}

#[test]
fn ask_conditions_the_prompt_on_retrieved_chunks() {
    let tmp = TempDir::new().unwrap();
    let settings = workspace(tmp.path());
    let index = build_index(&settings, embedder()).unwrap();
    let pipeline = RagPipeline::from_settings(&settings, index, embedder(), Arc::new(EchoCompletion)).unwrap();

    let hits = pipeline.search(JOHN, 1).unwrap();
    assert_eq!(hits[0].chunk.doc_id, "john1.txt");

    let answer = pipeline.answer("Who is The Word?").unwrap();
    assert!(answer.answer.starts_with("Use these documents:\n"));
    assert!(answer.answer.ends_with("Question: Who is The Word?"));
    assert!(answer.answer.contains(JOHN));
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.dropped, 0);

    assert!(matches!(pipeline.ask(" "), Err(Error::InvalidArgument(_))));
}

fn hit(text: &str) -> SearchHit {
    let chunk = DocumentChunk {
        id: format!("{text}:0"),
        doc_id: text.to_string(),
        content: text.to_string(),
        chunk_index: 0,
        total_chunks: 1,
        metadata: Default::default(),
    };
    SearchHit { chunk, score: 1.0 }
}

#[test]
fn assembler_drops_lowest_ranked_chunks_to_fit() {
    let template = PromptTemplate::new("rag", "{documents}|{input}");
    let hits = vec![hit("aaaa"), hit("bbbb"), hit("cccc")];

    let unbounded = PromptAssembler::new(template.clone(), "documents", "input", None).assemble("q", &hits).unwrap();
    assert_eq!(unbounded.text, "aaaa\nbbbb\ncccc|q");

    let bounded = PromptAssembler::new(template.clone(), "documents", "input", Some(7)).assemble("q", &hits).unwrap();
    assert_eq!(bounded.text, "aaaa|q");
    assert_eq!((bounded.included, bounded.dropped), (1, 2));

    let err = PromptAssembler::new(template, "documents", "input", Some(1)).assemble("q", &hits).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

fn lessons(root: &Path, completion: Arc<dyn CompletionService>) -> Lessons {
    Lessons::new(completion, PromptLibrary::new(root.join("prompts")), root.join("data/john1.txt"))
}

#[test]
fn dad_lessons_send_fixed_messages() {
    let tmp = TempDir::new().unwrap();
    workspace(tmp.path());
    let model = Scripted::new("Why did the scarecrow win an award?");
    let l = lessons(tmp.path(), model.clone());

    assert_eq!(l.dad_joke().unwrap(), "Why did the scarecrow win an award?");
    assert_eq!(model.last(), vec![ChatMessage::user("Tell me a dad joke")]);

    l.dad_persona().unwrap();
    let sent = model.last();
    assert_eq!(sent[0].role, Role::System);
    assert!(sent[0].content.starts_with("You're a Dad."));
    assert_eq!(sent[1].content, "Talk to me about the 100 year war in France");
}

#[test]
fn youtube_renders_genre() {
    let tmp = TempDir::new().unwrap();
    workspace(tmp.path());
    let l = lessons(tmp.path(), Arc::new(EchoCompletion));
    assert_eq!(l.youtube("tech").unwrap(), "Top 10 tech YouTube channels.");
    assert!(matches!(l.youtube("  "), Err(Error::InvalidArgument(_))));
}

#[test]
fn structured_lessons_parse_replies() {
    let tmp = TempDir::new().unwrap();
    workspace(tmp.path());

    let model = Scripted::new("1. Imagine\n2. Jealous Guy");
    let songs = lessons(tmp.path(), model.clone()).songs_list("John Lennon").unwrap();
    assert_eq!(songs, vec!["Imagine", "Jealous Guy"]);
    let prompt = &model.last()[0].content;
    assert!(prompt.starts_with("Songs by John Lennon."));
    assert!(prompt.contains("1. item"));

    let model = Scripted::new("{\"artist\": \"Queen\", \"songs\": [\"Bohemian Rhapsody\"]}");
    let bean = lessons(tmp.path(), model.clone()).songs_bean("Queen").unwrap();
    assert_eq!(bean, ArtistSongs { artist: "Queen".into(), songs: vec!["Bohemian Rhapsody".into()] });
    assert!(model.last()[0].content.contains("JSON Schema"));

    let map = lessons(tmp.path(), Scripted::new("{\"Queen\": [\"Radio Ga Ga\"]}")).songs_map("Queen").unwrap();
    assert!(map.contains_key("Queen"));

    let err = lessons(tmp.path(), Scripted::new("sorry, no idea")).songs_map("Queen").unwrap_err();
    assert_eq!(err.kind(), "MalformedOutputError");
}

#[test]
fn john_stuffs_the_context_document() {
    let tmp = TempDir::new().unwrap();
    workspace(tmp.path());
    let l = lessons(tmp.path(), Arc::new(EchoCompletion));
    assert_eq!(l.john_context().unwrap(), format!("Context: {JOHN}\nWho is the Word?"));

    fs::remove_file(tmp.path().join("data/john1.txt")).unwrap();
    assert!(matches!(l.john_context(), Err(Error::ResourceNotFound(_))));
}

fn repo_root() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).expect("workspace root").to_path_buf()
}

#[test]
fn shipped_prompts_have_expected_slots() {
    let library = PromptLibrary::new(repo_root().join("prompts"));
    assert_eq!(library.get("youtube").unwrap().variables(), vec!["genre"]);
    for name in ["songs-list", "songs-map", "songs-bean"] {
        assert_eq!(library.get(name).unwrap().variables(), vec!["artist", "format"], "{name}");
    }
    assert_eq!(library.get("john").unwrap().variables(), vec!["context"]);
    assert_eq!(library.get("rag-john").unwrap().variables(), vec!["input", "documents"]);
}

#[test]
fn shipped_corpus_chunks_and_answers_offline() {
    let root = repo_root();
    let tmp = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.documents.dir = root.join("data").display().to_string();
    settings.prompts.dir = root.join("prompts").display().to_string();
    settings.index.path = tmp.path().join("vectorstore.json").display().to_string();

    let index = build_index(&settings, embedder()).unwrap();
    assert!(index.len() > 1, "john1.txt spans several chunks");
    assert!(index.entries().iter().all(|e| e.chunk.doc_id == "john1.txt"));

    let pipeline = RagPipeline::from_settings(&settings, index, embedder(), Arc::new(EchoCompletion)).unwrap();
    let prompt = pipeline.ask("Who is The Word?").unwrap();
    assert!(prompt.contains("QUESTION:\nWho is The Word?"));
}
