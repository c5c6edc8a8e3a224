mod support;

use std::collections::HashMap;
use std::sync::Arc;

use research_core::{
    Action, AgentError, MockGenerator, ResearchAgent, ResearchEvent, ResearchPlan, ResearchRequest,
    SearchEngine, SearchQuery,
};
use serde_json::json;
use support::{
    finding_action, test_config, FixedGenerator, ScriptedBrowser, ScriptedEngine, ScriptedPlanner,
};

fn two_query_plan() -> ResearchPlan {
    let mut plan = ResearchPlan::fallback("rust http clients", SearchEngine::Google, 3);
    plan.search_queries = vec![
        SearchQuery {
            query: "reqwest".into(),
            engine: SearchEngine::Google,
            purpose: "primary".into(),
            priority: Default::default(),
        },
        SearchQuery {
            query: "hyper client".into(),
            engine: SearchEngine::Bing,
            purpose: "secondary".into(),
            priority: Default::default(),
        },
    ];
    plan
}

fn request() -> ResearchRequest {
    ResearchRequest::new("rust http clients").with_model(Arc::new(MockGenerator::new()))
}

fn searched_queries(history: &[research_core::ActionHistoryEntry]) -> Vec<String> {
    history
        .iter()
        .filter_map(|entry| match &entry.action {
            Action::PerformSearch { query, .. } => Some(query.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn missing_model_fails_fast_without_touching_browser() {
    let browser = ScriptedBrowser::new();
    let agent = ResearchAgent::new(test_config());
    let err = agent
        .run(ResearchRequest::new("anything"), browser.boxed())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidRequest(_)));
    assert_eq!(browser.calls(), 0);
    assert_eq!(browser.closes(), 0);
}

#[tokio::test]
async fn blank_task_is_rejected() {
    let browser = ScriptedBrowser::new();
    let agent = ResearchAgent::new(test_config());
    let err = agent
        .run(
            ResearchRequest::new("   ").with_model(Arc::new(MockGenerator::new())),
            browser.boxed(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidRequest(_)));
    assert_eq!(browser.calls(), 0);
}

#[tokio::test]
async fn exhausting_steps_reports_failure_with_partial_data() {
    let browser = ScriptedBrowser::new();
    let agent = ResearchAgent::new(test_config())
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(ScriptedEngine::new(vec![finding_action(1)])));
    let outcome = agent
        .run(request().with_max_steps(5), browser.boxed())
        .await
        .expect("outcome");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Max steps reached"));
    assert_eq!(outcome.steps_taken, 5);
    assert_eq!(outcome.history.len(), 5);
    assert_eq!(outcome.findings.len(), 1);
    assert!(outcome.plan.is_some());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn navigation_failures_are_recorded_and_run_continues() {
    let browser = ScriptedBrowser::new().failing_navigation();
    let agent = ResearchAgent::new(test_config())
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(ScriptedEngine::repeating(Action::GoToPage {
            url: "https://example.com/a".into(),
        })));
    let outcome = agent
        .run(request().with_max_steps(4), browser.boxed())
        .await
        .expect("outcome");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Max steps reached"));
    assert_eq!(outcome.steps_taken, 4);
    assert_eq!(outcome.history.len(), 4);
    for entry in &outcome.history {
        assert_eq!(entry.result["ok"], json!(false), "step {}", entry.step);
        assert_eq!(entry.result["error"], "browser unavailable: net down");
    }
    assert!(!browser.navigations().is_empty());
    assert!(outcome.findings.is_empty());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn planned_searches_run_once_and_skip_completed_queries() {
    let browser = ScriptedBrowser::new();
    let engine = ScriptedEngine::new(vec![Action::PerformSearch {
        query: "hyper client".into(),
        engine: SearchEngine::Bing,
    }]);
    let agent = ResearchAgent::new(test_config())
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(engine));
    let outcome = agent
        .run(request().with_max_steps(10), browser.boxed())
        .await
        .expect("outcome");

    let searches = searched_queries(&outcome.history);
    assert_eq!(searches, vec!["reqwest".to_string(), "hyper client".to_string()]);
    assert_eq!(outcome.history[0].step, 1);
    assert!(matches!(outcome.history[0].action, Action::PerformSearch { .. }));
    // step 4 is a search step but every planned query is done
    assert!(!matches!(outcome.history[3].action, Action::PerformSearch { .. }));
}

#[tokio::test]
async fn replans_stop_at_ceiling() {
    let browser = ScriptedBrowser::new();
    let planner = Arc::new(ScriptedPlanner::new(two_query_plan()));
    let calls = planner.calls.clone();
    let engine = ScriptedEngine::repeating(Action::Replan {
        reason: "results are off-topic".into(),
    });
    let agent = ResearchAgent::new(test_config().max_replans(2))
        .with_planner(planner)
        .with_decision_engine(Arc::new(engine));
    let outcome = agent
        .run(request().with_max_steps(8), browser.boxed())
        .await
        .expect("outcome");

    assert_eq!(outcome.replans_used, 2);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].prior.is_none());
    let prior = calls[1].prior.as_ref().expect("replan context");
    assert_eq!(prior.reason, "results are off-topic");
    assert!(!prior.completed_searches.is_empty());
    assert!(!outcome.success);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn replan_resets_search_queue_for_new_generation() {
    let browser = ScriptedBrowser::new();
    let engine = ScriptedEngine::new(vec![
        Action::Replan {
            reason: "try again".into(),
        },
    ]);
    let agent = ResearchAgent::new(test_config().search_every(1))
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(engine));
    let outcome = agent
        .run(request().with_max_steps(6), browser.boxed())
        .await
        .expect("outcome");

    // generation 0 runs both queries, the replan at step 3 re-queues them
    let searches = searched_queries(&outcome.history);
    assert_eq!(
        searches,
        vec!["reqwest", "hyper client", "reqwest", "hyper client"]
    );
    assert_eq!(outcome.replans_used, 1);
}

#[tokio::test]
async fn finish_task_terminates_successfully() {
    let browser = ScriptedBrowser::new();
    let engine = ScriptedEngine::new(vec![
        finding_action(1),
        Action::FinishTask {
            summary: "Found what was needed".into(),
        },
    ]);
    let agent = ResearchAgent::new(test_config())
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(engine));
    let outcome = agent.run(request(), browser.boxed()).await.expect("outcome");

    assert!(outcome.success);
    assert_eq!(outcome.result.as_deref(), Some("Found what was needed"));
    assert_eq!(outcome.steps_taken, 3);
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn auto_finishes_when_findings_and_searches_complete() {
    let browser = ScriptedBrowser::new();
    let engine = ScriptedEngine::new((1..=5).map(finding_action).collect());
    let agent = ResearchAgent::new(test_config())
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(engine));
    let outcome = agent
        .run(request().with_max_findings(3), browser.boxed())
        .await
        .expect("outcome");

    // steps: 1 search, 2-3 save, 4 search, 5 save -> capacity reached
    assert!(outcome.success);
    assert_eq!(outcome.steps_taken, 5);
    assert_eq!(outcome.findings.len(), 3);
    assert!(outcome
        .history
        .iter()
        .all(|entry| !matches!(entry.action, Action::FinishTask { .. })));
    assert!(outcome.result.unwrap_or_default().starts_with("Collected 3 finding(s)"));
}

#[tokio::test]
async fn findings_never_exceed_capacity() {
    let browser = ScriptedBrowser::new();
    let engine = ScriptedEngine::new((1..=6).map(finding_action).collect());
    // only step 1 is a search step, so the second planned query never runs
    let agent = ResearchAgent::new(test_config().search_every(100))
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(engine));
    let outcome = agent
        .run(request().with_max_findings(2).with_max_steps(6), browser.boxed())
        .await
        .expect("outcome");

    assert_eq!(outcome.findings.len(), 2);
    let rejected = outcome
        .history
        .iter()
        .filter(|entry| entry.result["ok"] == json!(false))
        .count();
    assert_eq!(rejected, 3);
    assert!(outcome.history[3].result["error"]
        .as_str()
        .unwrap_or_default()
        .contains("capacity"));
    assert!(!outcome.success);
}

#[tokio::test]
async fn decision_backend_failure_finishes_with_summary() {
    let generator = FixedGenerator {
        responses: HashMap::from([
            (
                "ResearchPlan".to_string(),
                json!({
                    "strategy": "search",
                    "searchQueries": [{"query": "reqwest", "engine": "google"}],
                    "expectedFindings": 2,
                    "estimatedSteps": 10,
                    "depth": "focused"
                }),
            ),
            ("Action".to_string(), json!({"tool": "teleport", "where": "moon"})),
        ]),
    };
    let browser = ScriptedBrowser::new();
    let agent = ResearchAgent::new(test_config());
    let outcome = agent
        .run(
            ResearchRequest::new("rust http clients").with_model(Arc::new(generator)),
            browser.boxed(),
        )
        .await
        .expect("outcome");

    assert!(outcome.success);
    let summary = outcome.result.expect("summary");
    assert!(!summary.is_empty());
    assert!(summary.contains("1 completed search"));
    assert_eq!(outcome.steps_taken, 2);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn mock_backend_runs_end_to_end() {
    let browser = ScriptedBrowser::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let agent = ResearchAgent::new(test_config()).with_events(tx);
    let outcome = agent
        .run(request().with_max_findings(5), browser.boxed())
        .await
        .expect("outcome");

    let plan = outcome.plan.as_ref().expect("plan");
    assert!(plan.search_queries.len() >= 2);
    let first_search = outcome
        .history
        .iter()
        .position(|e| matches!(e.action, Action::PerformSearch { .. }))
        .expect("a search ran");
    if let Some(first_visit) = outcome
        .history
        .iter()
        .position(|e| matches!(e.action, Action::GoToPage { .. }))
    {
        assert!(first_search < first_visit);
    }
    assert!(outcome.findings.len() <= 5);
    assert!(!outcome.findings.is_empty());
    assert!(outcome.history.len() <= 35);
    assert_eq!(browser.closes(), 1);

    let mut saw_plan = false;
    let mut saw_finish = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            ResearchEvent::PlanReady { .. } => saw_plan = true,
            ResearchEvent::Finished { .. } => saw_finish = true,
            _ => {}
        }
    }
    assert!(saw_plan && saw_finish);
}

#[tokio::test]
async fn start_url_is_visited_before_stepping() {
    let browser = ScriptedBrowser::new();
    let agent = ResearchAgent::new(test_config())
        .with_planner(Arc::new(ScriptedPlanner::new(two_query_plan())))
        .with_decision_engine(Arc::new(ScriptedEngine::new(vec![])));
    agent
        .run(
            request()
                .with_start_url("https://docs.rs/reqwest")
                .with_max_steps(1),
            browser.boxed(),
        )
        .await
        .expect("outcome");

    let navigations = browser.navigations();
    assert_eq!(navigations[0], "https://docs.rs/reqwest");
    assert!(navigations[1].starts_with("https://www.google.com/search?q=reqwest"));
}
