mod common;

use anyhow::Result;
use checkin_agent::{AnalysisService, KnowledgeGapAnalyzer, ProjectManager, SummarySynthesizer};
use checkin_core::{GapAnalysisRequest, Priority, SummaryRequest, SummaryType, Timeframe};
use checkin_storage::{ResultCache, DEFAULT_TTL};
use common::{project, update, ScriptedBackend};
use std::sync::Arc;

async fn seeded_manager() -> Arc<ProjectManager> {
    let manager = Arc::new(ProjectManager::new());
    manager
        .process_update(update("e1", "Alice", "Finished the billing export."))
        .await;
    manager
        .add_project(project("p1", "Payments Revamp", Priority::Medium, &["e1"]))
        .await;
    manager
        .add_project(project("apollo", "Apollo", Priority::Low, &["e1"]))
        .await;
    manager
}

#[tokio::test]
async fn test_repeated_analysis_is_served_from_cache() -> Result<()> {
    // === 场景描述 ===
    // 模型的每次调用都会失败，但调用次数可数
    // 预期: 相同请求第二次不再触达模型，结果相同
    let manager = seeded_manager().await;
    let backend = ScriptedBackend::new().shared();
    let service = AnalysisService::from_parts(
        KnowledgeGapAnalyzer::new(manager.clone()).with_model(Some(backend.clone())),
        SummarySynthesizer::new(manager).with_model(Some(backend.clone())),
        Arc::new(ResultCache::new(DEFAULT_TTL)),
    );

    let request = GapAnalysisRequest::default();
    let first = service.analyze_knowledge_gaps(&request).await;
    let calls = backend.calls();
    assert!(calls > 0);

    let second = service.analyze_knowledge_gaps(&request).await;
    assert_eq!(backend.calls(), calls);
    assert_eq!(first, second);

    // 参数不同 -> 新的缓存项
    let summary_request = SummaryRequest::new(SummaryType::RiskAlerts, Timeframe::Week);
    let summary = service.generate_summary(&summary_request).await;
    assert_eq!(backend.calls(), calls + 1);
    assert_eq!(service.generate_summary(&summary_request).await, summary);
    assert_eq!(backend.calls(), calls + 1);

    let stats = service.cache_stats().await;
    assert_eq!(stats.size, 2);
    assert!(stats.entries.iter().any(|e| e.key == "gaps:week:min:low"));
    assert!(stats.entries.iter().any(|e| e.key == "summary:risk_alerts:week"));
    Ok(())
}

#[tokio::test]
async fn test_invalidate_for_update_drops_related_entries() -> Result<()> {
    let service = AnalysisService::new(seeded_manager().await, Arc::new(ResultCache::default()));

    service.analyze_knowledge_gaps(&GapAnalysisRequest::default()).await;
    service.generate_questions_for_project("p1").await;
    service.generate_questions_for_project("apollo").await;
    let mut scoped = SummaryRequest::new(SummaryType::ProjectStatus, Timeframe::Week);
    scoped.project_id = Some("apollo".to_string());
    service.generate_summary(&scoped).await;
    assert_eq!(service.cache_stats().await.size, 4);

    // 新签到涉及 p1: 删掉 p1 与不限定项目的条目
    let removed = service.invalidate_for_update(&["p1".to_string()]).await;
    assert_eq!(removed, 2);

    let keys: Vec<String> = service
        .cache_stats()
        .await
        .entries
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|k| k.contains(":project:apollo")));

    service.clear_cache().await;
    assert_eq!(service.cache_stats().await.size, 0);
    Ok(())
}

#[tokio::test]
async fn test_critical_gaps_and_employee_questions_share_analysis() -> Result<()> {
    let manager = seeded_manager().await;
    manager
        .process_update(update("e3", "Cara", "Need help with the SSO migration."))
        .await;
    let service = AnalysisService::new(manager, Arc::new(ResultCache::default()));

    let critical = service.find_critical_gaps().await;
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].id, "blocked-silence-e3");

    let questions = service.generate_questions_for_employee("e3").await;
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].target_employee_name, "Cara");

    let keys: Vec<String> = service.cache_stats().await.entries.into_iter().map(|e| e.key).collect();
    assert!(keys.contains(&"gaps:week:min:high".to_string()));
    assert!(keys.contains(&"gaps:week:employee:e3:min:low".to_string()));
    Ok(())
}
