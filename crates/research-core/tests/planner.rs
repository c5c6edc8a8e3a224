mod support;

use std::collections::HashMap;
use std::sync::Arc;

use research_core::{
    Depth, LlmPlanner, PerformanceMode, PlanRequest, Planner, SearchEngine,
};
use serde_json::json;
use support::{FailingGenerator, FixedGenerator};

fn request(task: &str) -> PlanRequest {
    PlanRequest {
        task: task.to_string(),
        start_url: None,
        max_findings: 5,
        mode: PerformanceMode::Balanced,
        default_engine: SearchEngine::Duckduckgo,
        prior: None,
    }
}

#[tokio::test]
async fn failing_backend_yields_fallback_plan() {
    let planner = LlmPlanner::new(Arc::new(FailingGenerator));
    let plan = planner.create_plan(&request("compare rust orms")).await;

    assert_eq!(plan.depth, Depth::Broad);
    assert_eq!(plan.search_queries.len(), 2);
    assert_eq!(plan.search_queries[0].query, "compare rust orms");
    assert_eq!(plan.search_queries[1].query, "compare rust orms guide");
    assert!(plan
        .search_queries
        .iter()
        .all(|q| q.engine == SearchEngine::Duckduckgo));
    assert_eq!(plan.expected_findings, 5);
    assert!(plan.clone().validated().is_ok());
}

#[tokio::test]
async fn malformed_plan_falls_back() {
    let generator = FixedGenerator {
        responses: HashMap::from([(
            "ResearchPlan".to_string(),
            json!({"strategy": "", "searchQueries": [], "expectedFindings": 3, "estimatedSteps": 10}),
        )]),
    };
    let planner = LlmPlanner::new(Arc::new(generator));
    let plan = planner.create_plan(&request("sqlx vs diesel")).await;
    assert_eq!(plan.depth, Depth::Broad);
    assert_eq!(plan.search_queries[0].query, "sqlx vs diesel");
}

#[tokio::test]
async fn valid_plan_is_clamped_and_kept() {
    let generator = FixedGenerator {
        responses: HashMap::from([(
            "ResearchPlan".to_string(),
            json!({
                "strategy": "Check official docs first",
                "searchQueries": [{"query": "sqlx docs", "engine": "bing", "purpose": "docs", "priority": "high"}],
                "targetDomains": ["docs.rs"],
                "extraction": {"tools": ["getText"], "strategy": "read"},
                "expectedFindings": 0,
                "estimatedSteps": 500,
                "depth": "deep"
            }),
        )]),
    };
    let planner = LlmPlanner::new(Arc::new(generator));
    let plan = planner
        .try_create_plan(&request("sqlx"))
        .await
        .expect("plan");
    assert_eq!(plan.depth, Depth::Deep);
    assert_eq!(plan.expected_findings, 1);
    assert_eq!(plan.estimated_steps, 50);
    assert_eq!(plan.target_domains, Some(vec!["docs.rs".to_string()]));
}
