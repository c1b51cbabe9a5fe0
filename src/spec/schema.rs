use crate::{Error, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Top-level form description, loaded once and immutable for a run.
#[derive(Debug, Clone, Deserialize)]
pub struct FormSpec {
    /// Explicit provider id ("office", "google", "report"). When absent the
    /// provider is derived from the URL's domain.
    #[serde(default)]
    pub form: Option<String>,

    /// Entry URL. Accepts both "URL" and "url" keys.
    #[serde(alias = "URL")]
    pub url: String,

    /// Login steps, already in execution order. A JSON array is taken as-is;
    /// the legacy object shape is sorted by key here, never at execution time.
    #[serde(default, deserialize_with = "de_login_steps")]
    pub login: Vec<LoginStep>,

    /// One entry per form page, in navigation order.
    #[serde(default, rename = "answer")]
    pub pages: Vec<PageSpec>,
}

impl FormSpec {
    /// Load a spec from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a spec from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        let spec: FormSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::Config("URL is required".into()));
        }
        Ok(())
    }

    /// Total number of scripted answers across all pages.
    pub fn question_count(&self) -> usize {
        self.pages.iter().map(|p| p.answers.len()).sum()
    }
}

/// The single action kind a login/next step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    SendKeys,
}

/// Locator strategy, Selenium-style "by" names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Strategy {
    #[serde(rename = "css selector", alias = "css")]
    Css,
    #[serde(rename = "class name", alias = "class")]
    ClassName,
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "tag name", alias = "tag")]
    TagName,
}

/// Literal text or secret-placeholder tokens to type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    One(String),
    Many(Vec<String>),
}

impl Payload {
    pub fn fragments(&self) -> Vec<&str> {
        match self {
            Payload::One(s) => vec![s.as_str()],
            Payload::Many(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// One independent step of a login sequence, also the shape of a page's
/// "next" action.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginStep {
    pub func: ActionKind,
    pub by: Strategy,
    pub identifier: String,
    #[serde(default)]
    pub value: Option<Payload>,
}

/// One logical form page: an answer map plus how to advance past it.
#[derive(Debug, Clone)]
pub struct PageSpec {
    /// Question identifier -> answer. Identifiers are unique within a page.
    pub answers: HashMap<String, AnswerSpec>,
    /// How to reach the next page (or submit). Absent on the final page.
    pub next: Option<LoginStep>,
}

impl<'de> Deserialize<'de> for PageSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PageSpecVisitor)
    }
}

struct PageSpecVisitor;

impl<'de> Visitor<'de> for PageSpecVisitor {
    type Value = PageSpec;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a page object mapping question identifiers to answers")
    }

    fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut answers = HashMap::new();
        let mut next = None;

        while let Some(key) = map.next_key::<String>()? {
            // "next" is the one reserved key; everything else is a question.
            if key == "next" {
                next = Some(map.next_value()?);
            } else if answers
                .insert(key.clone(), map.next_value()?)
                .is_some()
            {
                return Err(de::Error::custom(format!(
                    "duplicate question identifier '{}'",
                    key
                )));
            }
        }

        Ok(PageSpec { answers, next })
    }
}

/// Scripted answer for one question. Which fields apply is decided live by the
/// question's rendered input kind, not declared here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnswerSpec {
    /// 1-based selection indices into the rendered option list.
    #[serde(default)]
    pub no: Option<OneOrMany<u32>>,

    /// Indices (checkbox) or text payload, depending on the rendered inputs.
    /// JSON numbers are accepted and coerced to their string form.
    #[serde(default, deserialize_with = "de_val")]
    pub val: Option<OneOrMany<String>>,

    /// Literal or token text for a text input selected via `no`.
    #[serde(default)]
    pub text: Option<String>,

    /// Free text typed when an "other" option reveals a follow-up input.
    #[serde(default)]
    pub others: Option<String>,
}

impl AnswerSpec {
    /// Selection indices, 1-based, deduplicated with order preserved.
    /// `no` wins over `val`; numeric strings in `val` count as indices.
    pub fn selection_indices(&self) -> Vec<u32> {
        let raw: Vec<u32> = match (&self.no, &self.val) {
            (Some(no), _) => no.items().copied().collect(),
            (None, Some(val)) => val
                .items()
                .filter_map(|s| s.trim().parse::<u32>().ok())
                .collect(),
            (None, None) => Vec::new(),
        };
        let mut seen = std::collections::HashSet::new();
        raw.into_iter().filter(|n| seen.insert(*n)).collect()
    }

    /// Text payload fragments, unresolved. `text` wins over `val`.
    pub fn text_payload(&self) -> Vec<&str> {
        if let Some(ref text) = self.text {
            return vec![text.as_str()];
        }
        match self.val {
            Some(ref val) => val.items().map(|s| s.as_str()).collect(),
            None => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.no.is_none() && self.val.is_none() && self.text.is_none() && self.others.is_none()
    }
}

/// A scalar or a list on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn items(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

/// Accept `val` entries as strings or JSON numbers; numbers are coerced to
/// their string form so `selection_indices()` can still treat them as indices.
fn de_val<'de, D>(deserializer: D) -> std::result::Result<Option<OneOrMany<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    impl Raw {
        fn into_string(self) -> String {
            match self {
                Raw::Text(s) => s,
                Raw::Number(n) => n.to_string(),
            }
        }
    }

    Ok(Option::<OneOrMany<Raw>>::deserialize(deserializer)?.map(|v| match v {
        OneOrMany::One(raw) => OneOrMany::One(raw.into_string()),
        OneOrMany::Many(items) => {
            OneOrMany::Many(items.into_iter().map(Raw::into_string).collect())
        }
    }))
}

/// Accept login steps as an ordered array, or as the legacy object keyed by an
/// ordering string. The object shape is normalized to a sorted sequence here
/// so execution never re-sorts.
fn de_login_steps<'de, D>(deserializer: D) -> std::result::Result<Vec<LoginStep>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(de::Error::custom))
            .collect(),
        serde_json::Value::Object(map) => {
            let mut keyed: Vec<(String, serde_json::Value)> = map.into_iter().collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            keyed
                .into_iter()
                .map(|(_, v)| serde_json::from_value(v).map_err(de::Error::custom))
                .collect()
        }
        serde_json::Value::Null => Ok(Vec::new()),
        _ => Err(de::Error::custom("login must be an array or an object")),
    }
}
