//! 评分标准推断引擎
//!
//! 从题面图片推断 3-7 项带分值的评分标准并持久化为新版本。
//! 与评分引擎不同，这里的失败全部向上抛给触发操作的教授：
//! 没有凭证、题面无图、模型产出不可用都不会留下半写的评分标准。

use std::sync::Arc;

use tracing::info;

use crate::config::GradingConfig;
use crate::errors::{AutoGradeError, Result};
use crate::models::{problems::entities::Problem, rubrics::entities::Rubric};
use crate::storage::Storage;

use super::client::{ModelBackend, ModelOutcome};
use super::normalize::normalize_points;
use super::raster::rasterize_document;
use super::schema::RubricDraft;

/// 发送给模型的题面图片上限（题面假定很短，取最早的页）
const MAX_PROMPT_IMAGES: usize = 5;

pub struct RubricInferenceEngine {
    config: GradingConfig,
    backend: Arc<dyn ModelBackend>,
    storage: Arc<dyn Storage>,
}

impl RubricInferenceEngine {
    pub fn new(
        config: GradingConfig,
        backend: Arc<dyn ModelBackend>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            config,
            backend,
            storage,
        }
    }

    /// 调用模型推断评分标准并持久化为指定版本
    ///
    /// 教授可附加自由文本建议，会原样追加到指令末尾。
    pub async fn infer_rubric(
        &self,
        problem: &Problem,
        version: i64,
        suggestion: Option<&str>,
    ) -> Result<Rubric> {
        if !self.config.has_credential() {
            return Err(AutoGradeError::configuration("模型 API key 未配置"));
        }

        let images = rasterize_document(std::path::Path::new(&problem.prompt_path))?;
        if images.is_empty() {
            return Err(AutoGradeError::content("无法从题面文件提取图片"));
        }

        let suggestion_block = suggestion
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("\nProfessor suggestion:\n{s}"))
            .unwrap_or_default();

        let instruction = format!(
            "You are creating a grading rubric for a math problem. \
             Produce 3-7 rubric items with clear labels and point values. \
             The total points must sum to {}.{}",
            problem.max_score, suggestion_block
        );

        let capped = &images[..images.len().min(MAX_PROMPT_IMAGES)];
        // 推断不要求确定性，使用模型默认温度
        let outcome = self
            .backend
            .structured_request(&instruction, capped, 1.0)
            .await;

        let value = match outcome {
            ModelOutcome::Parsed { value, .. } => value,
            ModelOutcome::Failed { reason } => {
                return Err(AutoGradeError::model_call(reason));
            }
        };

        let draft: RubricDraft = serde_json::from_value(value)
            .map_err(|e| AutoGradeError::generation(format!("评分标准草稿解析失败: {e}")))?;

        if draft.items.is_empty() {
            return Err(AutoGradeError::generation("模型没有返回任何评分项"));
        }

        let labels = draft_labels(&draft);
        let raw_points: Vec<Option<f64>> = draft.items.iter().map(|item| item.points).collect();
        let points = normalize_points(&raw_points, problem.max_score);
        if points.is_empty() || points.len() != labels.len() {
            return Err(AutoGradeError::generation("评分点数无法归一化"));
        }

        let items: Vec<(String, i64)> = labels.into_iter().zip(points).collect();
        let rubric = self
            .storage
            .create_rubric(problem.id, version, problem.max_score, items)
            .await?;

        info!(
            problem_id = problem.id,
            version = rubric.version,
            items = rubric.items.len(),
            "评分标准推断完成"
        );
        Ok(rubric)
    }

    /// 在当前生效版本之上重新推断一版评分标准
    ///
    /// 没有任何版本时从 1 开始。旧版本保留不动，评分总是取最高版本。
    pub async fn regenerate_rubric(
        &self,
        problem: &Problem,
        suggestion: Option<&str>,
    ) -> Result<Rubric> {
        let next_version = match self.storage.get_active_rubric(problem.id).await? {
            Some(active) => active.version + 1,
            None => 1,
        };
        self.infer_rubric(problem, next_version, suggestion).await
    }

    /// 确定性兜底评分标准：满分按整数除法拆成三项
    ///
    /// 不调用模型，是推断引擎被配置禁用时的指定替代路径。
    pub async fn fallback_rubric(&self, problem: &Problem, version: i64) -> Result<Rubric> {
        let points = fallback_points(problem.max_score);
        let items = points
            .into_iter()
            .enumerate()
            .map(|(idx, pts)| (format!("Criterion {}", idx + 1), pts))
            .collect();

        let rubric = self
            .storage
            .create_rubric(problem.id, version, problem.max_score, items)
            .await?;

        info!(
            problem_id = problem.id,
            version = rubric.version,
            "创建兜底评分标准"
        );
        Ok(rubric)
    }
}

/// 兜底标准的分值拆分：base = max_score / 3，余数归第三项，每项至少 1 分
fn fallback_points(max_score: i64) -> Vec<i64> {
    let base = (max_score / 3).max(1);
    vec![base, base, (max_score - 2 * base).max(1)]
}

/// 草稿标签清洗：去空白，空标签替换为 "Criterion {序号}"（1 起始）
fn draft_labels(draft: &RubricDraft) -> Vec<String> {
    draft
        .items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let label = item.label.trim();
            if label.is_empty() {
                format!("Criterion {}", idx + 1)
            } else {
                label.to_string()
            }
        })
        .collect()
}
