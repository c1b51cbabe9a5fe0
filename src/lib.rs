//! # formfill
//!
//! Declarative form auto-filler. Describe a web form in JSON — URL, login
//! steps, one answer map per page — and let the browser do the typing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formfill::{Engine, EngineOptions, FormSpec, Secrets};
//!
//! # #[tokio::main]
//! # async fn main() -> formfill::Result<()> {
//! let spec = FormSpec::load("configs/example.json")?;
//! let secrets = Secrets::new().with_env();
//! let mut engine = Engine::launch(EngineOptions::default()).await?;
//! let result = engine.run(&spec, &secrets).await;
//! engine.close().await?;
//! println!("answered {} question(s)", result?.questions_answered);
//! # Ok(())
//! # }
//! ```

pub mod dom;
pub mod engine;
pub mod provider;
pub mod spec;

pub use engine::{Engine, EngineOptions, RunResult};
pub use provider::{provider_for, AnswerSource, FormProvider, PromptSource};
pub use spec::{AnswerSpec, FormSpec, LoginStep, PageSpec, Secrets};

/// Result type for formfill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a form spec or answering a form.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unrecognized provider, unknown domain, malformed CLI parameter.
    #[error("config error: {0}")]
    Config(String),

    /// The spec file is not valid JSON.
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The spec file is missing or unreadable.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// A click or fill faulted in a way the fallback path could not absorb.
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// A page never stabilized within its wall-clock budget.
    #[error("timeout: {0}")]
    Timeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use spec::{ActionKind, Payload, Strategy};

    #[test]
    fn test_parse_minimal_spec() {
        let json = r#"{ "URL": "https://forms.office.com/r/abc" }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert_eq!(spec.url, "https://forms.office.com/r/abc");
        assert!(spec.form.is_none());
        assert!(spec.login.is_empty());
        assert!(spec.pages.is_empty());
    }

    #[test]
    fn test_parse_lowercase_url_key() {
        let json = r#"{ "url": "https://forms.gle/xyz" }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert_eq!(spec.url, "https://forms.gle/xyz");
    }

    #[test]
    fn test_parse_login_array_keeps_order() {
        let json = r#"{
            "URL": "https://forms.office.com/r/abc",
            "login": [
                { "func": "send_keys", "by": "id", "identifier": "email", "value": "<MAIL>" },
                { "func": "click", "by": "id", "identifier": "submit" }
            ]
        }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert_eq!(spec.login.len(), 2);
        assert_eq!(spec.login[0].func, ActionKind::SendKeys);
        assert_eq!(spec.login[0].identifier, "email");
        assert_eq!(spec.login[1].func, ActionKind::Click);
    }

    #[test]
    fn test_parse_login_object_sorted_by_key() {
        // Legacy shape: steps keyed by an ordering string, execution order is
        // the key order, resolved once at load time.
        let json = r#"{
            "URL": "https://forms.office.com/r/abc",
            "login": {
                "02": { "func": "click", "by": "id", "identifier": "second" },
                "01": { "func": "click", "by": "id", "identifier": "first" },
                "10": { "func": "click", "by": "id", "identifier": "third" }
            }
        }"#;
        let spec = FormSpec::parse(json).unwrap();
        let ids: Vec<&str> = spec.login.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_parse_login_payload_list() {
        let json = r#"{
            "URL": "https://forms.office.com/r/abc",
            "login": [
                { "func": "send_keys", "by": "name", "identifier": "user",
                  "value": ["<MAIL>", "@example.com"] }
            ]
        }"#;
        let spec = FormSpec::parse(json).unwrap();
        match spec.login[0].value {
            Some(Payload::Many(ref v)) => assert_eq!(v.len(), 2),
            ref other => panic!("expected list payload, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_strategies() {
        let json = r#"{
            "URL": "https://forms.office.com/r/abc",
            "login": [
                { "func": "click", "by": "css selector", "identifier": "button.go" },
                { "func": "click", "by": "class name", "identifier": "go" },
                { "func": "click", "by": "tag name", "identifier": "button" }
            ]
        }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert_eq!(spec.login[0].by, Strategy::Css);
        assert_eq!(spec.login[1].by, Strategy::ClassName);
        assert_eq!(spec.login[2].by, Strategy::TagName);
    }

    #[test]
    fn test_parse_page_with_next() {
        let json = r#"{
            "URL": "https://forms.office.com/r/abc",
            "answer": [
                {
                    "1": { "no": 1 },
                    "2": { "no": [1, 3] },
                    "next": { "func": "click", "by": "css selector",
                              "identifier": "button[title=\"Next\"]" }
                },
                { "3": { "no": 2, "text": "<PLACE>" } }
            ]
        }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert_eq!(spec.pages.len(), 2);

        let first = &spec.pages[0];
        assert_eq!(first.answers.len(), 2);
        assert!(first.next.is_some());
        assert_eq!(first.answers["1"].selection_indices(), vec![1]);
        assert_eq!(first.answers["2"].selection_indices(), vec![1, 3]);

        let second = &spec.pages[1];
        assert!(second.next.is_none());
        assert_eq!(second.answers["3"].text.as_deref(), Some("<PLACE>"));
    }

    #[test]
    fn test_parse_answer_val_variants() {
        let json = r#"{
            "URL": "https://forms.gle/xyz",
            "answer": [
                {
                    "101": { "val": "free text" },
                    "102": { "val": ["1", "3"] },
                    "103": { "val": ["<MAIL>", "<PASSWORD>"] },
                    "104": { "val": [2], "others": "something else" }
                }
            ]
        }"#;
        let spec = FormSpec::parse(json).unwrap();
        let page = &spec.pages[0];
        assert_eq!(page.answers["101"].text_payload(), vec!["free text"]);
        assert_eq!(page.answers["102"].selection_indices(), vec![1, 3]);
        assert_eq!(page.answers["103"].text_payload().len(), 2);
        assert_eq!(page.answers["104"].others.as_deref(), Some("something else"));
    }

    #[test]
    fn test_answer_indices_deduplicated() {
        let json = r#"{
            "URL": "https://forms.office.com/r/abc",
            "answer": [ { "1": { "no": [2, 4, 2] } } ]
        }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert_eq!(spec.pages[0].answers["1"].selection_indices(), vec![2, 4]);
    }

    #[test]
    fn test_validation_empty_url() {
        let json = r#"{ "URL": "" }"#;
        assert!(FormSpec::parse(json).is_err());
    }

    #[test]
    fn test_truncated_json_is_parse_error() {
        let json = r#"{ "URL": "https://forms.office.com/r/abc", "answer": [ { "1""#;
        match FormSpec::parse(json) {
            Err(Error::Json(_)) => {}
            other => panic!("expected Error::Json, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_provider_from_explicit_field() {
        let json = r#"{ "form": "google", "URL": "https://example.com/form" }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert_eq!(provider_for(&spec).unwrap().name(), "google");
    }

    #[test]
    fn test_provider_from_domain() {
        for (url, name) in [
            ("https://forms.gle/xyz", "google"),
            ("https://docs.google.com/forms/d/e/abc/viewform", "google"),
            ("https://forms.office.com/r/abc", "office"),
        ] {
            let spec = FormSpec::parse(&format!(r#"{{ "URL": "{url}" }}"#)).unwrap();
            assert_eq!(provider_for(&spec).unwrap().name(), name, "url: {url}");
        }
    }

    #[test]
    fn test_provider_unknown_domain_fails_fast() {
        let json = r#"{ "URL": "https://surveys.example.org/f/1" }"#;
        let spec = FormSpec::parse(json).unwrap();
        match provider_for(&spec) {
            Err(Error::Config(msg)) => assert!(msg.contains("surveys.example.org")),
            other => panic!("expected Error::Config, got {:?}", other.map(|p| p.name())),
        }
    }

    #[test]
    fn test_provider_unknown_id_fails_fast() {
        let json = r#"{ "form": "typeform", "URL": "https://example.com" }"#;
        let spec = FormSpec::parse(json).unwrap();
        assert!(matches!(provider_for(&spec), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_example_spec() {
        let spec = FormSpec::load("configs/example.json").unwrap();
        assert_eq!(spec.form.as_deref(), Some("office"));
        assert_eq!(spec.login.len(), 4);
        assert_eq!(spec.pages.len(), 1);
        assert!(spec.pages[0].next.is_some());
    }
}
