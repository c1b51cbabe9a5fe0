//! Office Forms provider.
//!
//! Questions render as `.office-form-question` containers, each carrying a
//! visible ordinal (`span.ordinal-number`, e.g. "3.") that serves as the
//! question identifier, a `div.question-title-box` title, and plain `<input>`
//! elements for the options.

use super::{
    checked_index, FormProvider, InputElement, InputKind, QuestionScan, RenderedQuestion,
    CSS_PATH_JS,
};
use crate::dom::Dom;
use crate::spec::{AnswerSpec, Secrets};
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

pub(crate) const SCAN_JS_BODY: &str = r#"
const results = [];
for (const q of document.querySelectorAll('.office-form-question')) {
    const ordinal = q.querySelector('span.ordinal-number');
    const titleBox = q.querySelector('div.question-title-box');
    const inputs = [];
    for (const el of q.querySelectorAll('input, textarea')) {
        const tag = el.tagName.toLowerCase();
        let label = '';
        const lab = el.closest('label');
        if (lab) label = (lab.textContent || '').trim();
        inputs.push({
            selector: cssPath(el),
            kind: tag === 'textarea' ? 'text' : (el.getAttribute('type') || 'text'),
            value: el.getAttribute('value') || '',
            label,
        });
    }
    results.push({
        marker: ordinal ? (ordinal.textContent || '').trim() : '',
        title: titleBox ? (titleBox.textContent || '').trim() : '',
        container: cssPath(q),
        inputs,
    });
}
return JSON.stringify(results);
"#;

pub(crate) fn scan_script() -> String {
    format!("(() => {{ {} {} }})()", CSS_PATH_JS, SCAN_JS_BODY)
}

/// The ordinal text minus its trailing dot, e.g. "3." -> "3".
pub(crate) fn identifier_from_ordinal(marker: &str) -> Result<String> {
    let id = marker.trim().trim_end_matches('.').to_string();
    if id.is_empty() {
        return Err(Error::Interaction(
            "question has no ordinal number yet".into(),
        ));
    }
    Ok(id)
}

/// 0-based click targets for an answer, bounds-checked (index 0 and anything
/// past the input list are dropped with a warning). An entry naming no index
/// keeps the historical default of the first option, so a text-only answer
/// lands in input 1 instead of bouncing to the interactive fallback.
fn target_indices(answer: &AnswerSpec, len: usize) -> Vec<usize> {
    let indices = answer.selection_indices();
    if indices.is_empty() {
        return if len == 0 { Vec::new() } else { vec![0] };
    }
    indices
        .into_iter()
        .filter_map(|no| checked_index(no, len))
        .collect()
}

#[derive(Debug, Default)]
pub struct OfficeProvider;

impl OfficeProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FormProvider for OfficeProvider {
    fn name(&self) -> &'static str {
        "office"
    }

    async fn form_title(&self, dom: &Dom<'_>) -> String {
        dom.read_text(".office-form-title-content", "TITLE").await
    }

    async fn scan(&self, dom: &Dom<'_>) -> Result<Vec<QuestionScan>> {
        dom.scan(&scan_script()).await
    }

    fn identifier_of(&self, scan: &QuestionScan) -> Result<String> {
        identifier_from_ordinal(&scan.marker)
    }

    fn title_of(&self, scan: &QuestionScan) -> String {
        scan.title.clone()
    }

    fn label_text(&self, input: &InputElement) -> String {
        let kind = match input.kind {
            InputKind::Radio => "radio",
            InputKind::Checkbox => "checkbox",
            InputKind::Text => "text",
        };
        format!("[{}] {}", kind, input.value)
    }

    /// Office semantics: every listed selection index is visited. Enumerable
    /// targets are clicked, text targets receive the resolved `text` field.
    async fn answer_question(
        &self,
        dom: &Dom<'_>,
        question: &RenderedQuestion,
        answer: &AnswerSpec,
        secrets: &Secrets,
    ) -> Result<()> {
        for i in target_indices(answer, question.inputs.len()) {
            let input = &question.inputs[i];
            if !dom.click(&input.selector).await {
                return Err(Error::Interaction(format!(
                    "could not click option {} of question '{}'",
                    i + 1,
                    question.identifier
                )));
            }
            if input.kind == InputKind::Text {
                match answer.text {
                    Some(ref text) => {
                        let resolved = secrets.resolve(text);
                        if !dom.send_keys(&input.selector, &resolved).await {
                            return Err(Error::Interaction(format!(
                                "could not fill text input of question '{}'",
                                question.identifier
                            )));
                        }
                    }
                    None => debug!(
                        "question '{}': text target selected but no text supplied",
                        question.identifier
                    ),
                }
            }
        }
        Ok(())
    }
}
