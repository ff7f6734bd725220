use figment::Jail;

use ragbook_core::config::{
    expand_path, resolve_with_base, CompletionProvider, Config, EmbeddingProvider, StalenessPolicy, TokenizerKind,
};
use ragbook_core::error::Error;

#[test]
fn defaults_without_any_file() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        let settings = Config::load().expect("load").settings().expect("settings");
        assert_eq!(settings.documents.pattern, "*.txt");
        assert_eq!(settings.index.path, "vectorstore.json");
        assert_eq!(settings.index.staleness, StalenessPolicy::Trust);
        assert_eq!(settings.chunking.chunk_size, 300);
        assert_eq!(settings.retrieval.top_k, 2);
        assert_eq!(settings.retrieval.default_query, "Who is The Word?");
        assert_eq!(settings.tokenizer.kind, TokenizerKind::Whitespace);
        Ok(())
    });
}

#[test]
fn file_profile_and_env_layers_merge() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file(
            "config.toml",
            r#"
            [documents]
            dir = "corpus"

            [embedding]
            provider = "fake"
            fake_dim = 64

            [index]
            staleness = "warn"
            "#,
        )?;
        jail.create_file("config.test.toml", "[retrieval]\ntop_k = 4\n")?;
        jail.set_env("APP_INDEX__PATH", "/tmp/idx.json");
        jail.set_env("APP_COMPLETION__PROVIDER", "echo");

        let config = Config::load().expect("load");
        let settings = config.settings().expect("settings");
        assert_eq!(settings.documents.dir, "corpus");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Fake);
        assert_eq!(settings.embedding.fake_dim, 64);
        assert_eq!(settings.index.staleness, StalenessPolicy::Warn);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.index.path, "/tmp/idx.json");
        assert_eq!(settings.completion.provider, CompletionProvider::Echo);

        let dir: String = config.get("documents.dir").expect("get");
        assert_eq!(dir, "corpus");
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[chunking]\nchunk_size = 0\n")?;
        let err = Config::load().expect("load").settings().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");

        jail.create_file("config.toml", "[retrieval]\ntop_k = 0\n")?;
        assert!(Config::load().expect("load").settings().is_err());

        jail.create_file("config.toml", "[tokenizer]\nkind = \"huggingface\"\n")?;
        assert!(Config::load().expect("load").settings().is_err());
        Ok(())
    });
}

#[test]
fn production_rejects_fake_embeddings() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "prod");
        jail.set_env("APP_EMBEDDING__PROVIDER", "fake");
        assert!(matches!(Config::load(), Err(Error::InvalidConfig(_))));
        Ok(())
    });
}

#[test]
fn api_key_falls_back_to_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.set_env("OPENAI_API_KEY", "sk-env");
        let settings = Config::load().expect("load").settings().expect("settings");
        assert_eq!(settings.embedding.api_key().unwrap(), "sk-env");

        jail.set_env("APP_COMPLETION__API_KEY", "sk-config");
        let settings = Config::load().expect("load").settings().expect("settings");
        assert_eq!(settings.completion.api_key().unwrap(), "sk-config");
        Ok(())
    });
}

#[test]
fn path_helpers_expand_and_resolve() {
    Jail::expect_with(|jail| {
        jail.set_env("RAGBOOK_TEST_DIR", "/srv/ragbook");
        assert_eq!(expand_path("${RAGBOOK_TEST_DIR}/data"), std::path::PathBuf::from("/srv/ragbook/data"));
        let base = std::path::Path::new("/base");
        assert_eq!(resolve_with_base(base, "data"), base.join("data"));
        assert_eq!(resolve_with_base(base, "/abs/data"), std::path::PathBuf::from("/abs/data"));
        Ok(())
    });
}
