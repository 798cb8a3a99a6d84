use checkin_core::{
    GapAnalysisRequest, GapAnalysisResult, GeneratedQuestion, GeneratedSummary, KnowledgeGap, Severity, SummaryRequest,
};
use checkin_storage::cache::{gaps_key, summary_key};
use checkin_storage::{CacheStats, ResultCache};
use std::sync::Arc;

use crate::gaps::{questions_for_employee, questions_for_project, KnowledgeGapAnalyzer};
use crate::manager::ProjectManager;
use crate::summary::SummarySynthesizer;

/// 缓存中的分析产物
#[derive(Debug, Clone)]
pub enum AnalysisArtifact {
    Gaps(GapAnalysisResult),
    Summary(GeneratedSummary),
}

/// 分析服务：缺口分析 + 汇总报告 + 结果缓存
///
/// 缓存 key 编码了请求的全部参数，项目范围写成 `:project:<id>` 段，
/// 便于签到后按项目失效。
pub struct AnalysisService {
    gaps: KnowledgeGapAnalyzer,
    summaries: SummarySynthesizer,
    cache: Arc<ResultCache<AnalysisArtifact>>,
}

impl AnalysisService {
    pub fn new(manager: Arc<ProjectManager>, cache: Arc<ResultCache<AnalysisArtifact>>) -> Self {
        Self {
            gaps: KnowledgeGapAnalyzer::new(manager.clone()),
            summaries: SummarySynthesizer::new(manager),
            cache,
        }
    }

    pub fn from_parts(
        gaps: KnowledgeGapAnalyzer,
        summaries: SummarySynthesizer,
        cache: Arc<ResultCache<AnalysisArtifact>>,
    ) -> Self {
        Self { gaps, summaries, cache }
    }

    pub fn cache(&self) -> Arc<ResultCache<AnalysisArtifact>> {
        self.cache.clone()
    }

    pub fn summaries(&self) -> &SummarySynthesizer {
        &self.summaries
    }

    // =====================================================================
    // 缺口分析
    // =====================================================================

    pub async fn analyze_knowledge_gaps(&self, request: &GapAnalysisRequest) -> GapAnalysisResult {
        let key = gaps_key(Some(&gap_scope(request)));

        if let Some(AnalysisArtifact::Gaps(result)) = self.cache.get(&key).await {
            tracing::debug!("[ANALYSIS] Cache hit: {}", key);
            return result;
        }

        let result = self.gaps.analyze_knowledge_gaps(request).await;
        self.cache
            .set(key, AnalysisArtifact::Gaps(result.clone()), None)
            .await;
        result
    }

    pub async fn find_critical_gaps(&self) -> Vec<KnowledgeGap> {
        self.analyze_knowledge_gaps(&GapAnalysisRequest::with_min_severity(Severity::High))
            .await
            .gaps
    }

    pub async fn generate_questions_for_employee(&self, employee_id: &str) -> Vec<GeneratedQuestion> {
        let result = self
            .analyze_knowledge_gaps(&GapAnalysisRequest::for_employee(employee_id))
            .await;
        questions_for_employee(&result, employee_id)
    }

    pub async fn generate_questions_for_project(&self, project_id: &str) -> Vec<GeneratedQuestion> {
        let result = self
            .analyze_knowledge_gaps(&GapAnalysisRequest::for_project(project_id))
            .await;
        questions_for_project(&result, project_id)
    }

    // =====================================================================
    // 汇总报告
    // =====================================================================

    pub async fn generate_summary(&self, request: &SummaryRequest) -> GeneratedSummary {
        let key = summary_key(request.summary_type, Some(&summary_scope(request)));

        if let Some(AnalysisArtifact::Summary(summary)) = self.cache.get(&key).await {
            tracing::debug!("[ANALYSIS] Cache hit: {}", key);
            return summary;
        }

        let summary = self.summaries.generate_summary(request).await;
        self.cache
            .set(key, AnalysisArtifact::Summary(summary.clone()), None)
            .await;
        summary
    }

    // =====================================================================
    // 缓存管理
    // =====================================================================

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        tracing::info!("[ANALYSIS] Cache cleared");
    }

    /// 新签到到达后失效相关产物
    ///
    /// 删除涉及这些项目的条目，以及所有不限定项目的条目。
    pub async fn invalidate_for_update(&self, project_ids: &[String]) -> usize {
        let removed = self
            .cache
            .invalidate_where(|key| match project_of(key) {
                Some(pid) => project_ids.iter().any(|p| p == pid),
                None => true,
            })
            .await;
        if removed > 0 {
            tracing::debug!("[ANALYSIS] Invalidated {} cached artifacts", removed);
        }
        removed
    }
}

// =========================================================================
// Key 编码
// =========================================================================

const PROJECT_SEGMENT: &str = "project";

fn scope_parts(timeframe: String, project_id: Option<&str>, employee_id: Option<&str>) -> Vec<String> {
    let mut parts = vec![timeframe];
    if let Some(pid) = project_id {
        parts.push(format!("{}:{}", PROJECT_SEGMENT, pid));
    }
    if let Some(eid) = employee_id {
        parts.push(format!("employee:{}", eid));
    }
    parts
}

fn gap_scope(request: &GapAnalysisRequest) -> String {
    let mut parts = scope_parts(
        request.timeframe.to_string(),
        request.project_id.as_deref(),
        request.employee_id.as_deref(),
    );
    parts.push(format!("min:{}", request.min_severity.unwrap_or(Severity::Low)));
    parts.join(":")
}

fn summary_scope(request: &SummaryRequest) -> String {
    scope_parts(
        request.timeframe.to_string(),
        request.project_id.as_deref(),
        request.employee_id.as_deref(),
    )
    .join(":")
}

/// 从 key 中取出项目 ID (紧跟在 `project` 段之后)
fn project_of(key: &str) -> Option<&str> {
    let mut segments = key.split(':');
    segments.find(|s| *s == PROJECT_SEGMENT)?;
    segments.next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::{SummaryType, Timeframe};

    #[test]
    fn keys_encode_every_parameter() {
        let mut request = GapAnalysisRequest::for_project("apollo");
        request.min_severity = Some(Severity::High);
        assert_eq!(
            gaps_key(Some(&gap_scope(&request))),
            "gaps:week:project:apollo:min:high"
        );
        assert_eq!(
            gaps_key(Some(&gap_scope(&GapAnalysisRequest::default()))),
            "gaps:week:min:low"
        );

        let mut summary = SummaryRequest::new(SummaryType::RiskAlerts, Timeframe::Month);
        summary.employee_id = Some("u7".to_string());
        assert_eq!(
            summary_key(summary.summary_type, Some(&summary_scope(&summary))),
            "summary:risk_alerts:month:employee:u7"
        );
    }

    #[test]
    fn project_segment_is_extracted() {
        assert_eq!(project_of("gaps:week:project:apollo:min:low"), Some("apollo"));
        assert_eq!(project_of("summary:risk_alerts:week"), None);
    }
}
