//! Provider capability set: the contract every form-hosting system's DOM
//! conventions are mapped onto, plus the shared answer-dispatch policy and the
//! provider registry.

pub mod google;
pub mod office;
pub mod report;
pub mod source;

pub use google::GoogleProvider;
pub use office::OfficeProvider;
pub use report::ReportProvider;
pub use source::{AnswerSource, NoFallback, PromptSource};

use crate::dom::Dom;
use crate::spec::{AnswerSpec, FormSpec, Secrets};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Input kind discovered live from the DOM. Anything that is not an
/// enumerable option (email, password, tel, ...) behaves as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Radio,
    Checkbox,
    #[serde(other)]
    Text,
}

/// One selectable or fillable element of a rendered question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputElement {
    /// Unique CSS selector for the clickable/fillable element.
    pub selector: String,
    pub kind: InputKind,
    /// Current `value` attribute, possibly empty.
    #[serde(default)]
    pub value: String,
    /// Visible label text for the option, possibly empty.
    #[serde(default)]
    pub label: String,
}

/// Raw per-question DOM snapshot produced by a provider's scan script.
/// `marker` carries whatever the provider derives identity from: ordinal text
/// for Office-style forms, the `data-params` attribute for Google Forms.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionScan {
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub title: String,
    /// CSS selector of the question container, for follow-up probes.
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub inputs: Vec<InputElement>,
}

/// A question as the engine sees it: identified, titled, with its discovered
/// inputs. Transient — recomputed on every poll, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuestion {
    pub identifier: String,
    pub title: String,
    pub container: String,
    pub inputs: Vec<InputElement>,
}

/// What applying one answer to one question amounts to.
#[derive(Debug, Clone, PartialEq)]
pub enum FillPlan {
    /// 0-based indices into the question's input list, each clicked once.
    Click(Vec<usize>),
    /// Resolved text typed into the input at the given 0-based index.
    Type { input: usize, text: String },
    /// Nothing applicable (no inputs, or an empty answer).
    Skip,
}

/// Shared dispatch policy: decide the question's effective input kind from its
/// rendered inputs and turn the answer into concrete clicks or typing.
pub fn plan_answer(inputs: &[InputElement], answer: &AnswerSpec, secrets: &Secrets) -> FillPlan {
    if inputs.is_empty() {
        return FillPlan::Skip;
    }

    let has_radio = inputs.iter().any(|i| i.kind == InputKind::Radio);
    let has_checkbox = inputs.iter().any(|i| i.kind == InputKind::Checkbox);

    if has_radio {
        // Exactly one option; 1-based index, defaulting to the first.
        let no = answer.selection_indices().first().copied().unwrap_or(1);
        return match checked_index(no, inputs.len()) {
            Some(i) => FillPlan::Click(vec![i]),
            None => FillPlan::Skip,
        };
    }

    if has_checkbox {
        let indices: Vec<usize> = answer
            .selection_indices()
            .into_iter()
            .filter_map(|no| checked_index(no, inputs.len()))
            .collect();
        if indices.is_empty() {
            return FillPlan::Skip;
        }
        return FillPlan::Click(indices);
    }

    let fragments = answer.text_payload();
    if fragments.is_empty() {
        return FillPlan::Skip;
    }
    let text = secrets.resolve_all(&fragments);
    let input = inputs
        .iter()
        .position(|i| i.kind == InputKind::Text)
        .unwrap_or(0);
    FillPlan::Type { input, text }
}

/// Execute a fill plan against the live DOM. A sentinel from the interaction
/// layer surfaces as an error so the engine leaves the question unanswered
/// and retries it on the next poll.
pub async fn apply_plan(
    dom: &Dom<'_>,
    question: &RenderedQuestion,
    plan: FillPlan,
) -> Result<()> {
    match plan {
        FillPlan::Click(indices) => {
            for i in indices {
                let input = &question.inputs[i];
                if !dom.click(&input.selector).await {
                    return Err(Error::Interaction(format!(
                        "could not click option {} of question '{}'",
                        i + 1,
                        question.identifier
                    )));
                }
            }
            Ok(())
        }
        FillPlan::Type { input, text } => {
            let element = &question.inputs[input];
            if !dom.send_keys(&element.selector, &text).await {
                return Err(Error::Interaction(format!(
                    "could not fill text input of question '{}'",
                    question.identifier
                )));
            }
            Ok(())
        }
        FillPlan::Skip => Ok(()),
    }
}

/// JS helper building a unique CSS selector for an element, shared by the
/// provider scan scripts.
pub(crate) const CSS_PATH_JS: &str = r#"
function cssPath(el) {
    if (el.id) return '#' + CSS.escape(el.id);
    const path = [];
    let node = el;
    while (node && node.nodeType === 1 && node !== document.body) {
        if (node.id) { path.unshift('#' + CSS.escape(node.id)); break; }
        let sel = node.tagName.toLowerCase();
        const siblings = Array.from(node.parentNode ? node.parentNode.children : []);
        if (siblings.length > 1) sel += ':nth-child(' + (siblings.indexOf(node) + 1) + ')';
        path.unshift(sel);
        node = node.parentNode;
    }
    return path.join(' > ');
}
"#;

fn checked_index(no: u32, len: usize) -> Option<usize> {
    // Indices are 1-based on the wire; 0 is as out of range as len + 1.
    match (no as usize).checked_sub(1) {
        Some(i) if i < len => Some(i),
        _ => {
            warn!("selection index {} out of range (have {} inputs)", no, len);
            None
        }
    }
}

/// The capability set every concrete form provider supplies.
#[async_trait]
pub trait FormProvider: Send + Sync {
    /// Stable provider id, also used for registry lookups.
    fn name(&self) -> &'static str;

    /// Form title, for the run trace. Sentinel on failure.
    async fn form_title(&self, dom: &Dom<'_>) -> String;

    /// Query the live DOM for currently visible questions. Fresh on every
    /// call.
    async fn scan(&self, dom: &Dom<'_>) -> Result<Vec<QuestionScan>>;

    /// Extract a per-question identifier that is stable across repeated DOM
    /// queries and unique within a page.
    fn identifier_of(&self, scan: &QuestionScan) -> Result<String>;

    fn title_of(&self, scan: &QuestionScan) -> String;

    /// Human-readable description of one selectable option, used by the
    /// interactive answer source.
    fn label_text(&self, input: &InputElement) -> String;

    /// Apply one answer to one rendered question.
    async fn answer_question(
        &self,
        dom: &Dom<'_>,
        question: &RenderedQuestion,
        answer: &AnswerSpec,
        secrets: &Secrets,
    ) -> Result<()>;

    /// Finalization hook after the last page. No-op by default.
    async fn finish(&self, _dom: &Dom<'_>) -> Result<()> {
        Ok(())
    }

    /// Scan and identify in one step. A question whose identifier cannot be
    /// extracted is dropped from this snapshot and will be retried on the
    /// next poll.
    async fn visible_questions(&self, dom: &Dom<'_>) -> Result<Vec<RenderedQuestion>> {
        let mut questions = Vec::new();
        for scan in self.scan(dom).await? {
            match self.identifier_of(&scan) {
                Ok(identifier) => questions.push(RenderedQuestion {
                    identifier,
                    title: self.title_of(&scan),
                    container: scan.container,
                    inputs: scan.inputs,
                }),
                Err(e) => warn!("skipping question without identifier: {}", e),
            }
        }
        Ok(questions)
    }
}

/// Domain suffixes with a known provider.
const DOMAIN_TABLE: &[(&str, &str)] = &[
    ("forms.gle", "google"),
    ("docs.google.com", "google"),
    ("forms.office.com", "office"),
];

/// Instantiate the provider for a spec: the explicit `form` field wins,
/// otherwise the URL's domain is matched against a fixed table. Unrecognized
/// providers fail fast, before any browser session exists.
pub fn provider_for(spec: &FormSpec) -> Result<Box<dyn FormProvider>> {
    let id = match spec.form {
        Some(ref id) => id.clone(),
        None => {
            let domain = domain_of(&spec.url)
                .ok_or_else(|| Error::Config(format!("not a valid form URL: '{}'", spec.url)))?;
            DOMAIN_TABLE
                .iter()
                .find(|(d, _)| domain == *d)
                .map(|(_, id)| id.to_string())
                .ok_or_else(|| {
                    Error::Config(format!("no provider registered for domain '{}'", domain))
                })?
        }
    };

    match id.as_str() {
        "google" => Ok(Box::new(GoogleProvider::new())),
        "office" => Ok(Box::new(OfficeProvider::new())),
        "report" => Ok(Box::new(ReportProvider::new())),
        other => Err(Error::Config(format!(
            "unknown form provider '{}' (expected one of: google, office, report)",
            other
        ))),
    }
}

fn domain_of(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..end];
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_inputs(kind: InputKind, n: usize) -> Vec<InputElement> {
        (1..=n)
            .map(|i| InputElement {
                selector: format!("#q input:nth-of-type({i})"),
                kind,
                value: format!("option {i}"),
                label: format!("Option {i}"),
            })
            .collect()
    }

    fn answer(json: &str) -> AnswerSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_radio_defaults_to_first_option() {
        let inputs = option_inputs(InputKind::Radio, 3);
        let plan = plan_answer(&inputs, &answer("{}"), &Secrets::new());
        assert_eq!(plan, FillPlan::Click(vec![0]));
    }

    #[test]
    fn test_radio_clicks_exactly_the_selected_index() {
        let inputs = option_inputs(InputKind::Radio, 3);
        let plan = plan_answer(&inputs, &answer(r#"{"no": 2}"#), &Secrets::new());
        assert_eq!(plan, FillPlan::Click(vec![1]));
    }

    #[test]
    fn test_checkbox_clicks_each_member_once() {
        let inputs = option_inputs(InputKind::Checkbox, 5);
        let plan = plan_answer(&inputs, &answer(r#"{"no": [2, 4]}"#), &Secrets::new());
        assert_eq!(plan, FillPlan::Click(vec![1, 3]));
    }

    #[test]
    fn test_checkbox_duplicate_indices_collapse() {
        let inputs = option_inputs(InputKind::Checkbox, 4);
        let plan = plan_answer(&inputs, &answer(r#"{"no": [3, 3, 1]}"#), &Secrets::new());
        assert_eq!(plan, FillPlan::Click(vec![2, 0]));
    }

    #[test]
    fn test_checkbox_accepts_numeric_val_strings() {
        let inputs = option_inputs(InputKind::Checkbox, 4);
        let plan = plan_answer(&inputs, &answer(r#"{"val": ["1", "3"]}"#), &Secrets::new());
        assert_eq!(plan, FillPlan::Click(vec![0, 2]));
    }

    #[test]
    fn test_out_of_range_index_dropped() {
        let inputs = option_inputs(InputKind::Checkbox, 2);
        let plan = plan_answer(&inputs, &answer(r#"{"no": [1, 9]}"#), &Secrets::new());
        assert_eq!(plan, FillPlan::Click(vec![0]));
    }

    #[test]
    fn test_zero_index_never_clicks() {
        let inputs = option_inputs(InputKind::Radio, 3);
        let plan = plan_answer(&inputs, &answer(r#"{"no": 0}"#), &Secrets::new());
        assert_eq!(plan, FillPlan::Skip);

        let inputs = option_inputs(InputKind::Checkbox, 3);
        let plan = plan_answer(&inputs, &answer(r#"{"no": [0, 2]}"#), &Secrets::new());
        assert_eq!(plan, FillPlan::Click(vec![1]));
    }

    #[test]
    fn test_text_resolves_secret_tokens_and_joins() {
        let inputs = option_inputs(InputKind::Text, 1);
        let secrets = Secrets::new().set("MAIL", "a@b.c");
        let plan = plan_answer(&inputs, &answer(r#"{"val": ["<MAIL>", "x"]}"#), &secrets);
        assert_eq!(
            plan,
            FillPlan::Type {
                input: 0,
                text: "a@b.c,x".to_string()
            }
        );
    }

    #[test]
    fn test_text_scalar_resolved_once() {
        let inputs = option_inputs(InputKind::Text, 2);
        let secrets = Secrets::new().set("PLACE", "Building 3");
        let plan = plan_answer(&inputs, &answer(r#"{"val": "<PLACE>"}"#), &secrets);
        assert_eq!(
            plan,
            FillPlan::Type {
                input: 0,
                text: "Building 3".to_string()
            }
        );
    }

    #[test]
    fn test_empty_answer_on_text_question_skips() {
        let inputs = option_inputs(InputKind::Text, 1);
        assert_eq!(plan_answer(&inputs, &answer("{}"), &Secrets::new()), FillPlan::Skip);
    }

    #[test]
    fn test_no_inputs_skips() {
        assert_eq!(
            plan_answer(&[], &answer(r#"{"no": 1}"#), &Secrets::new()),
            FillPlan::Skip
        );
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://forms.gle/xyz"), Some("forms.gle"));
        assert_eq!(
            domain_of("http://forms.office.com/r/a?b=c"),
            Some("forms.office.com")
        );
        assert_eq!(domain_of("not a url"), None);
    }
}
