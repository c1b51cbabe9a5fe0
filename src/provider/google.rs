//! Google Forms provider.
//!
//! Questions render as `.freebirdFormviewerViewNumberedItemContainer`
//! containers. Identity and title are not in visible text but encoded in a
//! `data-params` attribute of the container's first `<div>`, e.g.
//! `%.@.[1866273879,"Question title",...`. Options are `<label>` elements
//! wrapping the actual radio/checkbox input; selecting the "other" option
//! reveals a supplementary free-text input.

use super::{
    apply_plan, plan_answer, FormProvider, InputElement, InputKind, QuestionScan,
    RenderedQuestion, CSS_PATH_JS,
};
use crate::dom::Dom;
use crate::spec::{AnswerSpec, Secrets};
use crate::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"%\.@\.\[(\d+),"#).expect("identifier pattern"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"%\.@\.\[\d+,"(.+?)""#).expect("title pattern"));

const OTHER_INPUT_CLASSES: &[&str] = &[
    "freebirdFormviewerComponentsQuestionRadioOtherInputElement",
    "freebirdFormviewerComponentsQuestionCheckboxOtherInputElement",
];

const SCAN_JS_BODY: &str = r#"
const results = [];
for (const q of document.querySelectorAll('.freebirdFormviewerViewNumberedItemContainer')) {
    const paramsDiv = q.querySelector('div[data-params]');
    const labels = q.querySelectorAll('label');
    const inputs = [];
    if (labels.length > 0) {
        // Clicking the label is what toggles the option.
        for (const lab of labels) {
            const inner = lab.querySelector('input');
            inputs.push({
                selector: cssPath(lab),
                kind: inner ? (inner.getAttribute('type') || 'text') : 'text',
                value: inner ? (inner.getAttribute('value') || '') : '',
                label: (lab.textContent || '').trim(),
            });
        }
    } else {
        for (const el of q.querySelectorAll('input, textarea')) {
            const tag = el.tagName.toLowerCase();
            inputs.push({
                selector: cssPath(el),
                kind: tag === 'textarea' ? 'text' : (el.getAttribute('type') || 'text'),
                value: el.getAttribute('value') || '',
                label: '',
            });
        }
    }
    results.push({
        marker: paramsDiv ? (paramsDiv.getAttribute('data-params') || '') : '',
        title: '',
        container: cssPath(q),
        inputs,
    });
}
return JSON.stringify(results);
"#;

fn scan_script() -> String {
    format!("(() => {{ {} {} }})()", CSS_PATH_JS, SCAN_JS_BODY)
}

/// The other-input node is present whenever the question has an "Other"
/// option at all; it only becomes the active target once selecting "Other"
/// puts the focus marker on its class list.
fn other_input_active(class_attr: &str) -> bool {
    class_attr.contains("isFocused")
}

pub(crate) fn identifier_from_params(params: &str) -> Result<String> {
    IDENTIFIER_RE
        .captures(params)
        .map(|c| c[1].to_string())
        .ok_or_else(|| {
            let excerpt: String = params.chars().take(60).collect();
            Error::Interaction(format!("no question id in data-params '{}'", excerpt))
        })
}

pub(crate) fn title_from_params(params: &str) -> Option<String> {
    TITLE_RE.captures(params).map(|c| c[1].to_string())
}

#[derive(Debug, Default)]
pub struct GoogleProvider;

impl GoogleProvider {
    pub fn new() -> Self {
        Self
    }

    /// When the clicked options selected "Other", type the supplied free text
    /// into its follow-up box. An other-box that is merely present but not
    /// selected is left alone, so `others` text never implicitly selects the
    /// option.
    async fn fill_other(
        &self,
        dom: &Dom<'_>,
        question: &RenderedQuestion,
        answer: &AnswerSpec,
    ) -> Result<()> {
        let probe = OTHER_INPUT_CLASSES
            .iter()
            .map(|class| format!("{} .{}", question.container, class))
            .collect::<Vec<_>>()
            .join(", ");
        if !other_input_active(&dom.class_of(&probe).await) {
            return Ok(());
        }
        match answer.others {
            Some(ref others) => {
                if !dom.send_keys(&probe, others).await {
                    return Err(Error::Interaction(format!(
                        "could not fill 'other' input of question '{}'",
                        question.identifier
                    )));
                }
            }
            None => debug!(
                "question '{}': 'other' input revealed but no text supplied",
                question.identifier
            ),
        }
        Ok(())
    }
}

#[async_trait]
impl FormProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn form_title(&self, dom: &Dom<'_>) -> String {
        dom.read_text(".freebirdFormviewerViewHeaderHeaderBody", "TITLE")
            .await
    }

    async fn scan(&self, dom: &Dom<'_>) -> Result<Vec<QuestionScan>> {
        dom.scan(&scan_script()).await
    }

    fn identifier_of(&self, scan: &QuestionScan) -> Result<String> {
        identifier_from_params(&scan.marker)
    }

    fn title_of(&self, scan: &QuestionScan) -> String {
        title_from_params(&scan.marker).unwrap_or_default()
    }

    fn label_text(&self, input: &InputElement) -> String {
        input.label.clone()
    }

    async fn answer_question(
        &self,
        dom: &Dom<'_>,
        question: &RenderedQuestion,
        answer: &AnswerSpec,
        secrets: &Secrets,
    ) -> Result<()> {
        let plan = plan_answer(&question.inputs, answer, secrets);
        apply_plan(dom, question, plan).await?;

        let enumerable = question
            .inputs
            .iter()
            .any(|i| matches!(i.kind, InputKind::Radio | InputKind::Checkbox));
        if enumerable {
            self.fill_other(dom, question, answer).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = r#"%.@.[1866273879,"How are you feeling?",null,0,[[1234,[["Fine"],["Sick"]]]]]"#;

    #[test]
    fn test_identifier_extracted_from_data_params() {
        assert_eq!(identifier_from_params(PARAMS).unwrap(), "1866273879");
    }

    #[test]
    fn test_identifier_idempotent_under_requery() {
        assert_eq!(
            identifier_from_params(PARAMS).unwrap(),
            identifier_from_params(PARAMS).unwrap()
        );
    }

    #[test]
    fn test_title_extracted_from_data_params() {
        assert_eq!(
            title_from_params(PARAMS).as_deref(),
            Some("How are you feeling?")
        );
    }

    #[test]
    fn test_malformed_params_is_an_error() {
        assert!(identifier_from_params("").is_err());
        assert!(identifier_from_params("random attribute text").is_err());
    }

    #[test]
    fn test_other_input_requires_focus_marker() {
        assert!(other_input_active(
            "freebirdFormviewerComponentsQuestionRadioOtherInputElement isFocused"
        ));
        assert!(!other_input_active(
            "freebirdFormviewerComponentsQuestionRadioOtherInputElement"
        ));
        assert!(!other_input_active(""));
    }
}
