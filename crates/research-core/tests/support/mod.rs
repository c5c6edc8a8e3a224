#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use research_core::observer::is_search_results_url;
use research_core::{
    Action, AgentError, AnalyzeOptions, BrowserDriver, DecisionContext, DecisionEngine,
    ElementQuery, ElementSnapshot, GenerationRequest, PageAnalysis, PageAnalyzer, PageInfo,
    PlanRequest, Planner, QuickText, ResearchConfig, ResearchPlan, StructuredGenerator, WaitPolicy,
};
use serde_json::Value;

/// Test config: no settle pause, default cadences.
pub fn test_config() -> ResearchConfig {
    ResearchConfig::default().search_settle(0)
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub title: String,
    pub body: String,
    pub links: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct BrowserLog {
    pub current_url: String,
    pub navigations: Vec<String>,
    pub link_queries: usize,
    pub page_info_calls: usize,
    pub closes: usize,
    pub calls: usize,
}

/// In-memory browser that serves scripted pages and records every call.
#[derive(Clone)]
pub struct ScriptedBrowser {
    pub log: Arc<Mutex<BrowserLog>>,
    pages: Arc<HashMap<String, ScriptedPage>>,
    results_per_search: usize,
    fail_page_info: bool,
    fail_navigation: bool,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(BrowserLog {
                current_url: "about:blank".to_string(),
                ..BrowserLog::default()
            })),
            pages: Arc::new(HashMap::new()),
            results_per_search: 3,
            fail_page_info: false,
            fail_navigation: false,
        }
    }

    pub fn with_page(mut self, url: &str, page: ScriptedPage) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), page);
        self
    }

    pub fn failing_page_info(mut self) -> Self {
        self.fail_page_info = true;
        self
    }

    /// Every navigation attempt is logged and then fails.
    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn boxed(&self) -> Box<dyn BrowserDriver> {
        Box::new(self.clone())
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().calls
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log.lock().unwrap().navigations.clone()
    }

    pub fn link_queries(&self) -> usize {
        self.log.lock().unwrap().link_queries
    }

    fn page(&self, url: &str) -> ScriptedPage {
        if let Some(page) = self.pages.get(url) {
            return page.clone();
        }
        if is_search_results_url(url) {
            let slug = url.len();
            return ScriptedPage {
                title: "Search results".to_string(),
                body: "Results for your query".to_string(),
                links: (0..self.results_per_search)
                    .map(|i| {
                        (
                            format!("Result {i}"),
                            format!("https://example.com/{slug}/{i}"),
                        )
                    })
                    .collect(),
            };
        }
        if url.starts_with("http") {
            return ScriptedPage {
                title: format!("Article at {url}"),
                body: format!("Content of {url} with useful information."),
                links: Vec::new(),
            };
        }
        ScriptedPage::default()
    }

    fn touch(&self) -> String {
        let mut log = self.log.lock().unwrap();
        log.calls += 1;
        log.current_url.clone()
    }
}

#[async_trait]
impl BrowserDriver for ScriptedBrowser {
    async fn navigate(&self, url: &str, _wait: WaitPolicy, _timeout: Duration) -> Result<(), AgentError> {
        self.touch();
        let mut log = self.log.lock().unwrap();
        log.navigations.push(url.to_string());
        if self.fail_navigation {
            return Err(AgentError::browser("net down"));
        }
        log.current_url = url.to_string();
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<(), AgentError> {
        self.touch();
        Ok(())
    }

    async fn type_text(&self, _selector: &str, _text: &str) -> Result<(), AgentError> {
        self.touch();
        Ok(())
    }

    async fn get_attribute(&self, _selector: &str, _attribute: &str) -> Result<Option<String>, AgentError> {
        self.touch();
        Ok(None)
    }

    async fn get_text(&self, _selector: &str) -> Result<String, AgentError> {
        let url = self.touch();
        Ok(self.page(&url).body)
    }

    async fn get_all_elements(
        &self,
        selector: &str,
        query: ElementQuery,
    ) -> Result<Vec<ElementSnapshot>, AgentError> {
        let url = self.touch();
        if selector == "a[href]" {
            self.log.lock().unwrap().link_queries += 1;
        }
        Ok(self
            .page(&url)
            .links
            .into_iter()
            .take(query.limit)
            .map(|(text, href)| ElementSnapshot {
                text,
                attribute: Some(href),
            })
            .collect())
    }

    async fn scroll_into_view(&self, _selector: &str) -> Result<(), AgentError> {
        self.touch();
        Ok(())
    }

    async fn current_page_info(&self) -> Result<PageInfo, AgentError> {
        let url = self.touch();
        self.log.lock().unwrap().page_info_calls += 1;
        if self.fail_page_info {
            return Err(AgentError::browser("page info timed out"));
        }
        Ok(PageInfo {
            title: self.page(&url).title,
            url,
        })
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Analyzer that counts calls and echoes the URL.
#[derive(Clone, Default)]
pub struct ScriptedAnalyzer {
    pub analyze_calls: Arc<Mutex<usize>>,
    pub quick_calls: Arc<Mutex<usize>>,
}

impl ScriptedAnalyzer {
    pub fn analyze_calls(&self) -> usize {
        *self.analyze_calls.lock().unwrap()
    }

    pub fn quick_calls(&self) -> usize {
        *self.quick_calls.lock().unwrap()
    }
}

#[async_trait]
impl PageAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, url: &str, _options: AnalyzeOptions) -> Result<PageAnalysis, AgentError> {
        *self.analyze_calls.lock().unwrap() += 1;
        Ok(PageAnalysis {
            summary: format!("Analysis of {url}"),
            title: "Analyzed".to_string(),
            key_points: vec!["point".to_string()],
            content_type: "article".to_string(),
            links: Vec::new(),
            data_points: Vec::new(),
            confidence: 0.9,
        })
    }

    async fn quick_extract_text(&self, url: &str, _timeout: Duration) -> Result<QuickText, AgentError> {
        *self.quick_calls.lock().unwrap() += 1;
        Ok(QuickText {
            text: format!("Quick text of {url}"),
            title: None,
        })
    }
}

/// Generator that always fails.
pub struct FailingGenerator;

#[async_trait]
impl StructuredGenerator for FailingGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<Value, AgentError> {
        Err(AgentError::model("connection refused"))
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

/// Generator returning fixed values per schema name.
pub struct FixedGenerator {
    pub responses: HashMap<String, Value>,
}

#[async_trait]
impl StructuredGenerator for FixedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, AgentError> {
        self.responses
            .get(&request.schema_name)
            .cloned()
            .ok_or_else(|| AgentError::model("no scripted response"))
    }

    fn model_id(&self) -> &str {
        "fixed"
    }
}

/// Planner that hands out a fixed plan and counts calls.
pub struct ScriptedPlanner {
    pub plan: ResearchPlan,
    pub calls: Arc<Mutex<Vec<PlanRequest>>>,
}

impl ScriptedPlanner {
    pub fn new(plan: ResearchPlan) -> Self {
        Self {
            plan,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn create_plan(&self, request: &PlanRequest) -> ResearchPlan {
        self.calls.lock().unwrap().push(request.clone());
        self.plan.clone()
    }
}

/// Decision engine that replays queued actions, then idles on scratchpad notes.
pub struct ScriptedEngine {
    queue: Mutex<VecDeque<Action>>,
    repeat: Option<Action>,
    pub seen_steps: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedEngine {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            queue: Mutex::new(actions.into()),
            repeat: None,
            seen_steps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn repeating(action: Action) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            repeat: Some(action),
            seen_steps: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    async fn decide_next_action(&self, ctx: &DecisionContext<'_>) -> Action {
        self.seen_steps.lock().unwrap().push(ctx.step);
        if let Some(action) = self.queue.lock().unwrap().pop_front() {
            return action;
        }
        self.repeat.clone().unwrap_or_else(|| Action::UpdateScratchpad {
            note: format!("idle at step {}", ctx.step),
        })
    }
}

pub fn finding_action(n: usize) -> Action {
    Action::SaveFinding {
        finding: research_core::Finding::validated(
            format!("Finding {n}"),
            format!("https://example.com/finding/{n}"),
            Some(format!("Summary {n}")),
            None,
        )
        .expect("valid finding"),
    }
}
