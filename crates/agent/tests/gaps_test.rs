mod common;

use anyhow::Result;
use checkin_agent::llm::ModelBackend;
use checkin_agent::{KnowledgeGapAnalyzer, ProjectManager};
use checkin_core::{
    AnswerType, ChatMetadata, Clock, GapAnalysisRequest, GapType, Priority, QuestionPriority, Sentiment, Severity,
    Timeframe, WeeklyUpdate,
};
use chrono::Duration;
use common::{project, update, ScriptedBackend, GAP_PROMPT, QUESTION_PROMPT, SENTIMENT_PROMPT, TASK_PROMPT};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// e1/e2 各交一条签到 (归属 general)，然后登记一个无人汇报的项目 p1
async fn seeded_manager(model: Option<Arc<dyn ModelBackend>>) -> Arc<ProjectManager> {
    let manager = Arc::new(ProjectManager::builder().with_model(model).build());
    manager
        .process_update(update("e1", "Alice", "Finished the billing export."))
        .await;
    manager
        .process_update(update("e2", "Bob", "Working on the rate limiter."))
        .await;
    manager
        .add_project(project("p1", "Payments Revamp", Priority::Medium, &["e1", "e2"]))
        .await;
    manager
}

#[tokio::test]
async fn test_silent_project_produces_gap_and_template_questions() -> Result<()> {
    // === 场景描述 ===
    // p1 活跃、分配了 e1/e2，但窗口内没有任何签到提到它
    // 预期: 恰好一个 silent-project 缺口，每个分配员工一条模板问题
    let manager = seeded_manager(None).await;
    let analyzer = KnowledgeGapAnalyzer::new(manager);

    let result = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::default()).await;

    let p1_gaps: Vec<_> = result
        .gaps
        .iter()
        .filter(|g| g.affected_projects == vec!["p1".to_string()])
        .collect();
    assert_eq!(p1_gaps.len(), 1);
    let gap = p1_gaps[0];
    assert_eq!(gap.id, "silent-project-p1");
    assert_eq!(gap.gap_type, GapType::CommunicationGap);
    assert_eq!(gap.severity, Severity::Medium);
    assert_eq!(gap.confidence, 90);
    assert_eq!(gap.affected_employees, vec!["e1".to_string(), "e2".to_string()]);

    let questions: Vec<_> = result.questions.iter().filter(|q| q.gap_id == gap.id).collect();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].id, "fallback-silent-project-p1-e1");
    assert_eq!(questions[0].target_employee_name, "Alice");
    assert_eq!(questions[1].target_employee_id, "e2");
    assert!(questions.iter().all(|q| q.confidence == 60
        && q.priority == QuestionPriority::Medium
        && q.expected_answer_type == AnswerType::Clarification));

    // general 有人汇报，不算沉默；两个内置项目无人分配，只有缺口没有问题
    assert!(!result.gaps.iter().any(|g| g.id == "silent-project-general"));
    assert_eq!(result.summary.total_gaps, 3);
    assert_eq!(result.summary.questions_generated, 2);
    assert_eq!(result.summary.critical_gaps, 0);
    Ok(())
}

#[tokio::test]
async fn test_unreported_blocker_and_severity_filter() -> Result<()> {
    // === 场景描述 ===
    // e3 有一个 blocked 任务，但签到文字里没有 block/stuck/waiting
    // 预期: high 结果只包含 blocked-silence-e3，且是 low 结果的子集
    let manager = seeded_manager(None).await;
    manager
        .process_update(update("e3", "Cara", "Need help with the SSO migration."))
        .await;
    let analyzer = KnowledgeGapAnalyzer::new(manager);

    let low = analyzer
        .analyze_knowledge_gaps(&GapAnalysisRequest::with_min_severity(Severity::Low))
        .await;
    let high = analyzer
        .analyze_knowledge_gaps(&GapAnalysisRequest::with_min_severity(Severity::High))
        .await;

    let low_ids: HashSet<&str> = low.gaps.iter().map(|g| g.id.as_str()).collect();
    assert!(high.gaps.iter().all(|g| low_ids.contains(g.id.as_str())));
    assert!(high.gaps.iter().all(|g| g.severity >= Severity::High));

    let blocked: Vec<_> = high.gaps.iter().filter(|g| g.id == "blocked-silence-e3").collect();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].affected_employees, vec!["e3".to_string()]);
    assert_eq!(blocked[0].affected_projects, vec!["general".to_string()]);
    assert_eq!(high.questions.len(), 1);
    assert_eq!(high.questions[0].priority, QuestionPriority::High);

    let critical = analyzer.find_critical_gaps().await;
    assert_eq!(
        critical.iter().map(|g| g.id.clone()).collect::<Vec<_>>(),
        high.gaps.iter().map(|g| g.id.clone()).collect::<Vec<_>>()
    );
    Ok(())
}

#[tokio::test]
async fn test_question_helpers_filter_by_target() -> Result<()> {
    let manager = seeded_manager(None).await;
    manager
        .process_update(update("e3", "Cara", "Need help with the SSO migration."))
        .await;
    let analyzer = KnowledgeGapAnalyzer::new(manager);

    let for_e3 = analyzer.generate_questions_for_employee("e3").await;
    assert_eq!(for_e3.len(), 1);
    assert_eq!(for_e3[0].id, "fallback-blocked-silence-e3-e3");

    let for_p1 = analyzer.generate_questions_for_project("p1").await;
    assert_eq!(for_p1.len(), 2);
    assert!(for_p1.iter().all(|q| q.gap_id == "silent-project-p1"));
    Ok(())
}

#[tokio::test]
async fn test_timeframe_controls_silence_window() -> Result<()> {
    // 10 天前有人提到 p1: week 窗口仍然沉默，month 窗口不沉默
    let manager = seeded_manager(None).await;
    let created_at = Clock::now() - Duration::days(10);
    manager
        .restore_update(WeeklyUpdate {
            id: "update_old".to_string(),
            employee_id: "e1".to_string(),
            week_of: Clock::week_of(created_at),
            message_text: "Payments Revamp kickoff notes".to_string(),
            extracted_tasks: Vec::new(),
            projects: vec!["p1".to_string()],
            sentiment: Sentiment::Neutral,
            has_images: false,
            image_count: 0,
            chat_metadata: ChatMetadata::default(),
            created_at,
            processed_at: Some(created_at),
        })
        .await;
    let analyzer = KnowledgeGapAnalyzer::new(manager);

    let week = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::default()).await;
    assert!(week.gaps.iter().any(|g| g.id == "silent-project-p1"));

    let month = analyzer
        .analyze_knowledge_gaps(&GapAnalysisRequest {
            timeframe: Timeframe::Month,
            ..Default::default()
        })
        .await;
    assert!(!month.gaps.iter().any(|g| g.id == "silent-project-p1"));
    Ok(())
}

#[tokio::test]
async fn test_malformed_model_output_degrades_to_rules_and_templates() -> Result<()> {
    // === 场景描述 ===
    // 模型对缺口分析和追问都返回无法解析的文本
    // 预期: 只有规则缺口，问题全部来自模板
    let backend = ScriptedBackend::new()
        .on(TASK_PROMPT, "[]")
        .on(SENTIMENT_PROMPT, "NEUTRAL")
        .on(GAP_PROMPT, "I could not find anything useful.")
        .on(QUESTION_PROMPT, "Sure, ask them how it is going.")
        .shared();
    let manager = seeded_manager(Some(backend)).await;
    let analyzer = KnowledgeGapAnalyzer::new(manager);

    let result = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::default()).await;

    assert!(!result.gaps.is_empty());
    assert!(result.gaps.iter().all(|g| !g.id.starts_with("ai-gap-")));
    assert!(result.gaps.iter().any(|g| g.id == "silent-project-p1"));
    assert_eq!(result.questions.len(), 2);
    assert!(result.questions.iter().all(|q| q.id.starts_with("fallback-")));
    Ok(())
}

#[tokio::test]
async fn test_model_gaps_come_first_and_win_dedup() -> Result<()> {
    // === 场景描述 ===
    // 模型返回三个缺口:
    // 1. technical_risk (合法)
    // 2. 与 silent-project-p1 键相同的 communication_gap (合法)
    // 3. 类型非法 (丢弃)
    // 预期: 模型缺口排在前面，同键的规则缺口被去掉，问题使用模型回答
    let gaps_json = json!([
        {
            "type": "technical_risk",
            "severity": "high",
            "description": "Payment provider migration has no rollback plan",
            "affectedProjects": ["p1"],
            "affectedEmployees": ["e1"],
            "evidence": ["No mention of rollback"],
            "impact": "Outage risk during cutover",
            "confidence": 80
        },
        {
            "type": "communication_gap",
            "severity": "medium",
            "description": "Nobody reports on the payments work",
            "affectedProjects": ["p1"],
            "affectedEmployees": ["e1", "e2"]
        },
        {
            "type": "weird",
            "severity": "high",
            "description": "not a real gap"
        }
    ])
    .to_string();
    let question_json = json!({
        "question": "What is the rollback plan for the provider switch?",
        "context": "Cutover is close",
        "priority": "urgent",
        "expectedAnswerType": "timeline",
        "followUpQuestions": ["Who owns the cutover?"],
        "confidence": 85
    })
    .to_string();
    let backend = ScriptedBackend::new()
        .on(TASK_PROMPT, "[]")
        .on(SENTIMENT_PROMPT, "NEUTRAL")
        .on(GAP_PROMPT, format!("Here you go:\n```json\n{}\n```", gaps_json))
        .on(QUESTION_PROMPT, question_json)
        .shared();
    let manager = seeded_manager(Some(backend)).await;
    let analyzer = KnowledgeGapAnalyzer::new(manager);

    let result = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::default()).await;

    assert_eq!(result.gaps[0].id, "ai-gap-technical_risk-p1-e1");
    assert_eq!(result.gaps[0].confidence, 80);
    assert_eq!(result.gaps[1].id, "ai-gap-communication_gap-p1-e1,e2");
    assert_eq!(result.gaps[1].confidence, 70);
    assert!(!result.gaps.iter().any(|g| g.id == "silent-project-p1"));
    assert!(!result.gaps.iter().any(|g| g.description == "not a real gap"));

    let first = &result.questions[0];
    assert_eq!(first.id, "question-ai-gap-technical_risk-p1-e1-e1");
    assert_eq!(first.priority, QuestionPriority::Urgent);
    assert_eq!(first.expected_answer_type, AnswerType::Timeline);
    assert_eq!(first.follow_up_questions, vec!["Who owns the cutover?".to_string()]);
    assert_eq!(first.confidence, 85);
    assert_eq!(result.summary.urgent_questions, result.questions.len());
    Ok(())
}

#[tokio::test]
async fn test_scope_filters_narrow_silent_project_rule() -> Result<()> {
    // === 场景描述 ===
    // p1 (e1/e2) 和 p2 (e1) 都无人汇报
    // 1. 按项目 p1 分析 -> 只检查 p1
    // 2. 按员工 e2 分析 -> 只检查 e2 参与的项目 (p1)
    // 3. 按员工 e1 分析 -> p1、p2 都检查，内置项目不检查
    let manager = seeded_manager(None).await;
    manager
        .add_project(project("p2", "Ledger Cleanup", Priority::Medium, &["e1"]))
        .await;
    let analyzer = KnowledgeGapAnalyzer::new(manager);

    let silent_ids = |gaps: &[checkin_core::KnowledgeGap]| -> Vec<String> {
        let mut ids: Vec<String> = gaps
            .iter()
            .filter(|g| g.id.starts_with("silent-project-"))
            .map(|g| g.id.clone())
            .collect();
        ids.sort();
        ids
    };

    let by_project = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::for_project("p1")).await;
    assert_eq!(silent_ids(&by_project.gaps), vec!["silent-project-p1"]);

    let by_e2 = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::for_employee("e2")).await;
    assert_eq!(silent_ids(&by_e2.gaps), vec!["silent-project-p1"]);

    let by_e1 = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::for_employee("e1")).await;
    assert_eq!(silent_ids(&by_e1.gaps), vec!["silent-project-p1", "silent-project-p2"]);

    let unscoped = analyzer.analyze_knowledge_gaps(&GapAnalysisRequest::default()).await;
    assert!(silent_ids(&unscoped.gaps).contains(&"silent-project-maintenance".to_string()));
    Ok(())
}
