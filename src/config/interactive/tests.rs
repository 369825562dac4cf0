use super::*;

#[test]
fn model_name_must_not_be_blank() {
    assert!(non_empty(&"mistral".to_string()).is_ok());
    assert!(non_empty(&String::new()).is_err());
    assert!(non_empty(&"   ".to_string()).is_err());
}

#[test]
fn unreachable_ollama_reports_failure() {
    let ollama = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: 9,
        ..OllamaConfig::default()
    };

    assert!(!test_ollama_connection(&ollama));
}
