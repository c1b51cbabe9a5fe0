//! The form engine: drives login, the per-page answering loop (DOM polling,
//! stabilization detection, identifier-based dedup), answer dispatch through
//! the active provider, and page-to-page navigation.

mod history;

pub use history::SnapshotHistory;

use crate::dom::Dom;
use crate::provider::{provider_for, AnswerSource, FormProvider, PromptSource, RenderedQuestion};
use crate::spec::{ActionKind, FormSpec, LoginStep, PageSpec, Secrets};
use crate::{Error, Result};
use eoka::{Browser, Page};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Sleep between DOM polls; coalesces rapid mutation bursts.
    pub poll_interval_ms: u64,
    /// Consecutive identical polls required before a page counts as stable.
    pub history_capacity: usize,
    /// Wall-clock budget per page; a page that never stabilizes within it
    /// aborts the run instead of looping forever.
    pub page_timeout_ms: u64,
    /// Bounded wait for individual element lookups.
    pub locate_timeout_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            headless: true,
            poll_interval_ms: 1_000,
            history_capacity: 3,
            page_timeout_ms: 120_000,
            locate_timeout_ms: 3_000,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunResult {
    /// Number of form pages processed.
    pub pages: usize,
    /// Questions answered across all pages.
    pub questions_answered: usize,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// Owns the browser session for the duration of a run.
///
/// The session is the one shared mutable resource; callers must invoke
/// [`Engine::close`] on every exit path (the bundled CLI closes before
/// propagating any run error).
pub struct Engine {
    browser: Browser,
    page: Page,
    opts: EngineOptions,
    fallback: Box<dyn AnswerSource>,
}

impl Engine {
    /// Launch a browser session. Falls back to interactive prompting for
    /// questions the spec has no answer for.
    pub async fn launch(opts: EngineOptions) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: opts.headless,
            ..Default::default()
        };
        debug!("launching browser (headless: {})", opts.headless);
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;
        Ok(Self {
            browser,
            page,
            opts,
            fallback: Box::new(PromptSource::new()),
        })
    }

    /// Replace the fallback answer source (e.g. to forbid prompting in
    /// unattended runs).
    pub fn with_fallback(mut self, fallback: Box<dyn AnswerSource>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Log in and answer every page of the form.
    pub async fn run(&mut self, spec: &FormSpec, secrets: &Secrets) -> Result<RunResult> {
        let start = Instant::now();
        let provider = provider_for(spec)?;

        let Self {
            page,
            opts,
            fallback,
            ..
        } = self;
        let dom = Dom::with_timeout(&*page, opts.locate_timeout_ms);

        login(&dom, spec, secrets).await?;

        info!("[TITLE] {}", provider.form_title(&dom).await);

        let mut questions_answered = 0;
        for (i, page_spec) in spec.pages.iter().enumerate() {
            info!("start page {}", i);
            questions_answered +=
                answer_page(&dom, provider.as_ref(), page_spec, secrets, fallback.as_mut(), opts)
                    .await?;
            if let Some(ref next) = page_spec.next {
                execute_step(&dom, next, secrets).await;
            }
            info!("end page {}", i);
        }

        provider.finish(&dom).await?;

        Ok(RunResult {
            pages: spec.pages.len(),
            questions_answered,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Release the browser session.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Navigate to the form and run each login step in its stored order.
async fn login(dom: &Dom<'_>, spec: &FormSpec, secrets: &Secrets) -> Result<()> {
    info!("visit form: {}", spec.url);
    dom.page().goto(&spec.url).await?;

    if spec.login.is_empty() {
        return Ok(());
    }
    info!("start login ({} steps)", spec.login.len());
    for step in &spec.login {
        execute_step(dom, step, secrets).await;
    }
    info!("end login");
    Ok(())
}

/// Resolve and perform one click/send-keys step. Failures are logged and
/// absorbed; a missed step surfaces later as a stuck page, not a crash here.
async fn execute_step(dom: &Dom<'_>, step: &LoginStep, secrets: &Secrets) {
    let Some(selector) = dom.locate(step.by, &step.identifier).await else {
        return;
    };
    match step.func {
        ActionKind::Click => {
            dom.click(&selector).await;
        }
        ActionKind::SendKeys => {
            let fragments = step
                .value
                .as_ref()
                .map(|p| p.fragments())
                .unwrap_or_default();
            let text = secrets.resolve_all(&fragments);
            dom.send_keys(&selector, &text).await;
        }
    }
}

/// Answer one page: poll the DOM, answer newly revealed questions, and stop
/// once consecutive polls agree that nothing is changing anymore.
async fn answer_page(
    dom: &Dom<'_>,
    provider: &dyn FormProvider,
    page_spec: &PageSpec,
    secrets: &Secrets,
    fallback: &mut dyn AnswerSource,
    opts: &EngineOptions,
) -> Result<usize> {
    // Fresh containers per page: dedup state never leaks across pages.
    let mut answered: HashSet<String> = HashSet::new();
    let mut history: SnapshotHistory<Vec<RenderedQuestion>> =
        SnapshotHistory::new(opts.history_capacity);
    let deadline = Instant::now() + Duration::from_millis(opts.page_timeout_ms);

    loop {
        tokio::time::sleep(Duration::from_millis(opts.poll_interval_ms)).await;
        if Instant::now() >= deadline {
            return Err(Error::Timeout(format!(
                "page did not stabilize within {}ms ({} question(s) answered)",
                opts.page_timeout_ms,
                answered.len()
            )));
        }

        let questions = provider.visible_questions(dom).await?;
        history.push(questions.clone());
        if history.is_stable() {
            break;
        }

        for question in &questions {
            if answered.contains(&question.identifier) {
                continue;
            }
            debug!("[KEY: \"{}\"] {}", question.identifier, question.title);

            let answer = match page_spec.answers.get(&question.identifier) {
                Some(answer) => answer.clone(),
                None => {
                    let options: Vec<String> = question
                        .inputs
                        .iter()
                        .map(|input| provider.label_text(input))
                        .collect();
                    fallback.answer_for(&question.identifier, &question.title, &options)?
                }
            };

            match provider.answer_question(dom, question, &answer, secrets).await {
                Ok(()) => {
                    answered.insert(question.identifier.clone());
                }
                // Left out of the answered set on purpose: the next poll
                // retries it.
                Err(e) => warn!("question '{}' not answered: {}", question.identifier, e),
            }
        }
    }

    Ok(answered.len())
}
