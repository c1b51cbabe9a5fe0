//! Bespoke health-report form provider.
//!
//! The university health-report form shares the Office Forms DOM conventions
//! (`.office-form-question` containers with a visible ordinal), but answers
//! follow the plain shared dispatch policy: the question's effective input
//! kind decides whether `no`/`val` select options or `val` is typed as text.

use super::office;
use super::{
    apply_plan, plan_answer, FormProvider, InputElement, InputKind, QuestionScan,
    RenderedQuestion,
};
use crate::dom::Dom;
use crate::spec::{AnswerSpec, Secrets};
use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct ReportProvider;

impl ReportProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FormProvider for ReportProvider {
    fn name(&self) -> &'static str {
        "report"
    }

    async fn form_title(&self, dom: &Dom<'_>) -> String {
        dom.read_text(".office-form-title-content", "TITLE").await
    }

    async fn scan(&self, dom: &Dom<'_>) -> Result<Vec<QuestionScan>> {
        dom.scan(&office::scan_script()).await
    }

    fn identifier_of(&self, scan: &QuestionScan) -> Result<String> {
        office::identifier_from_ordinal(&scan.marker)
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

    async fn answer_question(
        &self,
        dom: &Dom<'_>,
        question: &RenderedQuestion,
        answer: &AnswerSpec,
        secrets: &Secrets,
    ) -> Result<()> {
        let plan = plan_answer(&question.inputs, answer, secrets);
        apply_plan(dom, question, plan).await
    }
}
