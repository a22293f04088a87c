//! 自动评分引擎
//!
//! 对已定稿的提交执行一次自动评分并原子化落库。
//! 与推断引擎的错误策略相反：评分在提交定稿路径上运行，
//! 任何模型侧失败都被回收为一条 0 分成绩而不是向上抛错，
//! 保证提交状态机照常推进，留待人工复核。

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::config::GradingConfig;
use crate::errors::{AutoGradeError, Result};
use crate::models::grades::{
    entities::{AutoGradeRun, Grade},
    requests::RecordAutoGradeRequest,
};
use crate::models::rubrics::entities::Rubric;
use crate::models::submissions::entities::Submission;
use crate::storage::Storage;

use super::client::{ModelBackend, ModelOutcome};
use super::normalize::resolve_item_scores;
use super::raster::{rasterize_document, PageImage};
use super::schema::GradeResult;

/// 未配置凭证时占位成绩使用的模型标识
const PLACEHOLDER_MODEL: &str = "placeholder";

pub struct GradingEngine {
    config: GradingConfig,
    backend: Arc<dyn ModelBackend>,
    storage: Arc<dyn Storage>,
}

impl GradingEngine {
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

    /// 对提交执行一次自动评分，返回落库后的成绩
    ///
    /// 只有存储层失败会返回 Err；模型侧的一切问题都会被
    /// 回收为 0 分成绩并附带说明性反馈。
    pub async fn grade_submission(
        &self,
        submission: &Submission,
        rubric: &Rubric,
    ) -> Result<(AutoGradeRun, Grade)> {
        if !self.config.has_credential() {
            let recorded = self
                .storage
                .record_autograde(RecordAutoGradeRequest {
                    submission_id: submission.id,
                    rubric_id: Some(rubric.id),
                    model: PLACEHOLDER_MODEL.to_string(),
                    raw_output: json!({"note": "model credential not configured"}),
                    score: 0.0,
                    feedback: "Auto-grading is not configured; a human will review this submission."
                        .to_string(),
                })
                .await?;
            info!(submission_id = submission.id, "记录占位自动评分");
            return Ok(recorded);
        }

        match self.run_model_grade(submission, rubric).await {
            Ok(recorded) => Ok(recorded),
            Err(e) => {
                warn!(
                    submission_id = submission.id,
                    error = %e,
                    "自动评分失败，回收为 0 分成绩"
                );
                let recorded = self
                    .storage
                    .record_autograde(RecordAutoGradeRequest {
                        submission_id: submission.id,
                        rubric_id: Some(rubric.id),
                        model: self.config.model.clone(),
                        raw_output: json!({"error": e.format_simple()}),
                        score: 0.0,
                        feedback: "Auto-grade failed; a human will review this submission."
                            .to_string(),
                    })
                    .await?;
                Ok(recorded)
            }
        }
    }

    /// 模型评分主路径：题面图在前、答卷图在后，温度按配置（默认 0）
    async fn run_model_grade(
        &self,
        submission: &Submission,
        rubric: &Rubric,
    ) -> Result<(AutoGradeRun, Grade)> {
        let problem = self
            .storage
            .get_problem_by_id(submission.problem_id)
            .await?
            .ok_or_else(|| {
                AutoGradeError::not_found(format!("题目不存在: {}", submission.problem_id))
            })?;

        // 题面文件缺失不阻塞评分，仅凭答卷图评分
        let prompt_path = std::path::Path::new(&problem.prompt_path);
        let prompt_images = if prompt_path.exists() {
            rasterize_document(prompt_path)?
        } else {
            warn!(
                submission_id = submission.id,
                path = %problem.prompt_path,
                "题面文件不存在，跳过题面图片"
            );
            Vec::new()
        };

        let pages = self.storage.list_submission_pages(submission.id).await?;
        let mut work_images: Vec<PageImage> = Vec::new();
        for page in &pages {
            let images = rasterize_document(std::path::Path::new(&page.file_path))?;
            work_images.extend(images);
        }

        if prompt_images.is_empty() && work_images.is_empty() {
            let recorded = self
                .storage
                .record_autograde(RecordAutoGradeRequest {
                    submission_id: submission.id,
                    rubric_id: Some(rubric.id),
                    model: self.config.model.clone(),
                    raw_output: json!({"error": "no images available"}),
                    score: 0.0,
                    feedback: "No readable images were found in this submission.".to_string(),
                })
                .await?;
            info!(submission_id = submission.id, "提交无可读图片，记录 0 分");
            return Ok(recorded);
        }

        let instruction = build_grading_instruction(rubric, prompt_images.len());

        let mut images = prompt_images;
        images.extend(work_images);

        let outcome = self
            .backend
            .structured_request(&instruction, &images, self.config.temperature)
            .await;

        let (value, raw_text) = match outcome {
            ModelOutcome::Parsed { value, raw_text } => (value, raw_text),
            ModelOutcome::Failed { reason } => {
                return Err(AutoGradeError::model_call(reason));
            }
        };

        let result: GradeResult = serde_json::from_value(value.clone())?;
        let (item_scores, total) = resolve_item_scores(rubric, &result.rubric_scores);
        let feedback = synthesize_feedback(&item_scores, &result, &raw_text);

        // 审计记录与学生端逐项展示都读 parsed，必须落归一化后的数值
        let mut parsed = value;
        if let Some(obj) = parsed.as_object_mut() {
            obj.insert("rubric_scores".to_string(), serde_json::to_value(&item_scores)?);
            obj.insert("total_score".to_string(), json!(total));
        }

        let recorded = self
            .storage
            .record_autograde(RecordAutoGradeRequest {
                submission_id: submission.id,
                rubric_id: Some(rubric.id),
                model: self.config.model.clone(),
                raw_output: json!({"raw_text": raw_text, "parsed": parsed}),
                score: total,
                feedback,
            })
            .await?;

        info!(
            submission_id = submission.id,
            score = total,
            model = %self.config.model,
            "自动评分完成"
        );
        Ok(recorded)
    }
}

/// 拼装评分指令：先说明图片布局，再逐项列出评分标准
fn build_grading_instruction(rubric: &Rubric, prompt_image_count: usize) -> String {
    let mut instruction = format!(
        "You are grading a student's handwritten math work. \
         The first {} image(s) show the problem statement; \
         the remaining image(s) show the student's submission. \
         Grade the submission against this rubric (total {} points):\n",
        prompt_image_count, rubric.total_points
    );
    for item in &rubric.items {
        instruction.push_str(&format!("- {} ({} points)\n", item.label, item.points));
    }
    instruction.push_str(
        "For each rubric item: restate what the student wrote, recompute the step yourself, \
         compare the two, then assign a status of correct (full points), incorrect (zero points) \
         or partial (a numeric score), with brief notes. \
         Also report total_score and overall feedback.",
    );
    instruction
}

/// 合成学生可见反馈
///
/// 只有至少一项带备注时才逐项汇总，否则用模型的整体反馈，
/// 最后退到原始响应文本。
fn synthesize_feedback(
    item_scores: &[super::schema::RubricScore],
    result: &GradeResult,
    raw_text: &str,
) -> String {
    let has_notes = item_scores.iter().any(|item| {
        item.notes
            .as_deref()
            .map(str::trim)
            .is_some_and(|n| !n.is_empty())
    });

    if has_notes {
        let mut lines = vec!["Rubric notes:".to_string()];
        for item in item_scores {
            let note = item
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or("No issues noted.");
            lines.push(format!("{} ({}): {}", item.label, item.status, note));
        }
        lines.join("\n")
    } else if !result.feedback.trim().is_empty() {
        result.feedback.clone()
    } else {
        raw_text.to_string()
    }
}
