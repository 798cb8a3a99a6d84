mod common;

use anyhow::Result;
use checkin_agent::{ProjectManager, SummarySynthesizer};
use checkin_core::{Sentiment, SummaryRequest, SummaryType, Timeframe, Trend};
use common::{update, ScriptedBackend, SUMMARY_PROMPT};
use serde_json::json;
use std::sync::Arc;

/// e1 完成一个任务，e2 进行中一个任务，都归属 general
async fn seeded_manager() -> Arc<ProjectManager> {
    let manager = Arc::new(ProjectManager::new());
    manager
        .process_update(update("e1", "Alice", "Finished the billing export."))
        .await;
    manager
        .process_update(update("e2", "Bob", "Working on the rate limiter."))
        .await;
    manager
}

fn metric<'a>(summary: &'a checkin_core::GeneratedSummary, label: &str) -> Option<&'a str> {
    summary
        .key_metrics
        .iter()
        .find(|m| m.label == label)
        .map(|m| m.value.as_str())
}

#[tokio::test]
async fn test_metrics_only_summary_without_model() -> Result<()> {
    let synthesizer = SummarySynthesizer::new(seeded_manager().await);

    let summary = synthesizer.weekly_highlights().await;

    assert_eq!(summary.summary_type, SummaryType::WeeklyHighlights);
    assert_eq!(summary.title, "Weekly Highlights Summary");
    assert_eq!(summary.confidence, 30);
    assert_eq!(metric(&summary, "Total Updates"), Some("2"));
    assert_eq!(metric(&summary, "Active Employees"), Some("2"));
    assert_eq!(metric(&summary, "Task Completion Rate"), Some("50.0%"));
    assert!(summary.concerns[0].contains("Language analysis unavailable"));
    assert!(summary.content.contains("2 updates from 2 employees"));
    Ok(())
}

#[tokio::test]
async fn test_failed_model_call_falls_back_to_metrics() -> Result<()> {
    let backend = ScriptedBackend::new().shared();
    let synthesizer = SummarySynthesizer::new(seeded_manager().await).with_model(Some(backend.clone()));

    let summary = synthesizer.risk_alerts().await;

    assert_eq!(backend.calls(), 1);
    assert_eq!(summary.confidence, 30);
    assert!(summary.concerns[0].contains("Language analysis request failed"));
    Ok(())
}

#[tokio::test]
async fn test_structured_model_summary_is_parsed() -> Result<()> {
    let response = json!({
        "title": "Billing and API Progress",
        "content": "Billing export shipped; rate limiting underway.",
        "keyMetrics": [
            { "label": "Velocity", "value": 12, "trend": "up", "context": "vs last week" },
            { "label": "Mood", "value": "steady", "trend": "sideways" }
        ],
        "highlights": ["Billing export shipped"],
        "concerns": [],
        "recommendations": ["Load-test the limiter"],
        "confidence": 88
    })
    .to_string();
    let backend = ScriptedBackend::new().on(SUMMARY_PROMPT, response).shared();
    let synthesizer = SummarySynthesizer::new(seeded_manager().await).with_model(Some(backend));

    let summary = synthesizer.executive_brief().await;

    assert_eq!(summary.summary_type, SummaryType::ExecutiveBrief);
    assert_eq!(summary.title, "Billing and API Progress");
    assert_eq!(summary.confidence, 88);
    assert_eq!(summary.key_metrics.len(), 2);
    assert_eq!(summary.key_metrics[0].value, "12");
    assert_eq!(summary.key_metrics[0].trend, Some(Trend::Up));
    assert_eq!(summary.key_metrics[1].trend, None);
    assert_eq!(summary.highlights, vec!["Billing export shipped".to_string()]);
    assert!(summary.concerns.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_model_summary_keeps_raw_prefix() -> Result<()> {
    let raw = "x".repeat(600);
    let backend = ScriptedBackend::new().on(SUMMARY_PROMPT, raw).shared();
    let synthesizer = SummarySynthesizer::new(seeded_manager().await).with_model(Some(backend));

    let summary = synthesizer.team_performance(Timeframe::Week).await;

    assert_eq!(summary.title, "Team Performance Summary");
    assert_eq!(summary.content.chars().count(), 500);
    assert_eq!(summary.confidence, 30);
    assert_eq!(summary.concerns, vec!["Unable to parse structured summary".to_string()]);
    assert_eq!(summary.recommendations, vec!["Review data quality and try again".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_metrics_respect_filters() -> Result<()> {
    let manager = seeded_manager().await;
    manager
        .process_update(update("e3", "Cara", "Stuck on the vendor contract review."))
        .await;
    let synthesizer = SummarySynthesizer::new(manager);

    let all = synthesizer
        .compute_metrics(&SummaryRequest::new(SummaryType::RiskAlerts, Timeframe::Week))
        .await;
    assert_eq!(all.total_updates, 3);
    assert_eq!(all.task_metrics.total, 3);
    assert_eq!(all.task_metrics.blocked, 1);
    assert_eq!(all.sentiment_counts.get(&Sentiment::Blocked), Some(&1));

    let mut scoped = SummaryRequest::new(SummaryType::RiskAlerts, Timeframe::Week);
    scoped.employee_id = Some("e1".to_string());
    let e1 = synthesizer.compute_metrics(&scoped).await;
    assert_eq!(e1.total_updates, 1);
    assert_eq!(e1.unique_employees, 1);
    assert_eq!(e1.task_metrics.total, 1);
    assert_eq!(e1.task_metrics.completion_rate, 100.0);

    let mut empty = SummaryRequest::new(SummaryType::ProjectStatus, Timeframe::Day);
    empty.project_id = Some("maintenance".to_string());
    let none = synthesizer.compute_metrics(&empty).await;
    assert_eq!(none.total_updates, 0);
    assert_eq!(none.task_metrics.completion_rate, 0.0);
    assert_eq!(none.average_update_length, 0.0);
    Ok(())
}
