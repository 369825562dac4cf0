#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Configuration discovery through the home directory

use std::path::Path;

use serial_test::serial;
use tempfile::TempDir;

use context_rag::config::Config;

fn set_home(home: &Path) {
    // SAFETY: every test touching the environment is `#[serial]`
    unsafe {
        std::env::set_var("HOME", home);
    }
}

#[test]
#[serial]
fn defaults_live_under_home() {
    let home = TempDir::new().expect("Failed to create temp dir");
    set_home(home.path());

    let config = Config::load_default().expect("Failed to load defaults");
    assert_eq!(config.get_base_dir(), home.path().join(".context-rag"));
    assert_eq!(
        config.index_path(),
        home.path().join(".context-rag").join("index.db")
    );
    assert!(!config.config_file_path().exists());
}

#[test]
#[serial]
fn saved_settings_are_found_again() {
    let home = TempDir::new().expect("Failed to create temp dir");
    set_home(home.path());

    let mut config = Config::load_default().expect("Failed to load defaults");
    config.ollama.generation_model = "llama3.2".to_string();
    config.retrieval.default_top_k = 5;
    config.save().expect("Failed to save config");

    let reloaded = Config::load_default().expect("Failed to reload config");
    assert_eq!(reloaded, config);
    assert_eq!(reloaded.ollama.generation_model, "llama3.2");
}

#[test]
#[serial]
fn invalid_saved_settings_are_rejected() {
    let home = TempDir::new().expect("Failed to create temp dir");
    set_home(home.path());

    let config_dir = home.path().join(".context-rag");
    std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    std::fs::write(
        config_dir.join("config.toml"),
        "[retrieval]\ndefault_top_k = 0\n",
    )
    .expect("Failed to write config");

    assert!(Config::load_default().is_err());
}
