//! 提交生命周期控制器
//!
//! 驱动 draft -> submitted -> graded 状态机，并保证同一提交上
//! 最多只有一个评分操作在执行（DashMap 持有每提交一把互斥锁）。
//! 截止时间的处理是显式入口 `reconcile`，读路径和后台清扫都调用它，
//! 不存在隐式的读时状态迁移。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::{AutoGradeError, Result};
use crate::grading::engine::GradingEngine;
use crate::models::grades::{entities::Grade, requests::CreateProfessorGradeRequest};
use crate::models::submissions::entities::{Submission, SubmissionStatus};
use crate::storage::Storage;

pub struct SubmissionLifecycle {
    storage: Arc<dyn Storage>,
    engine: Arc<GradingEngine>,
    // 每提交一把锁，锁对象按需创建后不回收（提交数量有限）
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl SubmissionLifecycle {
    pub fn new(storage: Arc<dyn Storage>, engine: Arc<GradingEngine>) -> Self {
        Self {
            storage,
            engine,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, submission_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(submission_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 学生定稿：要求草稿状态且至少一页，定稿后立即尝试自动评分
    ///
    /// 没有生效评分标准时提交停留在 submitted，等待标准就绪后 regrade。
    pub async fn finalize(&self, submission_id: i64, now: i64) -> Result<Submission> {
        let lock = self.lock_for(submission_id);
        let _guard = lock.lock().await;

        let submission = self.require_submission(submission_id).await?;
        if submission.status != SubmissionStatus::Draft {
            return Err(AutoGradeError::validation(format!(
                "只有草稿可以定稿，当前状态: {}",
                submission.status
            )));
        }
        let pages = self.storage.list_submission_pages(submission_id).await?;
        if pages.is_empty() {
            return Err(AutoGradeError::validation("提交没有任何页，无法定稿"));
        }

        self.finalize_inner(&submission, now).await
    }

    /// 定稿并评分的共享路径，调用方必须已持有该提交的锁
    async fn finalize_inner(&self, submission: &Submission, now: i64) -> Result<Submission> {
        self.storage.mark_submitted(submission.id, now).await?;
        let submitted = self.require_submission(submission.id).await?;

        match self.storage.get_active_rubric(submission.problem_id).await? {
            Some(rubric) => {
                self.engine.grade_submission(&submitted, &rubric).await?;
                self.apply_best_grade(submission.id).await?;
            }
            None => {
                info!(
                    submission_id = submission.id,
                    "没有生效的评分标准，提交停留在已定稿状态"
                );
            }
        }

        self.require_submission(submission.id).await
    }

    /// 重新评分：已定稿或已评分的提交重新跑一次自动评分
    pub async fn regrade(&self, submission_id: i64) -> Result<Grade> {
        let lock = self.lock_for(submission_id);
        let _guard = lock.lock().await;

        let submission = self.require_submission(submission_id).await?;
        if submission.status == SubmissionStatus::Draft {
            return Err(AutoGradeError::validation("草稿提交不能重新评分"));
        }
        let rubric = self
            .storage
            .get_active_rubric(submission.problem_id)
            .await?
            .ok_or_else(|| AutoGradeError::validation("题目没有生效的评分标准"))?;

        let (_, grade) = self.engine.grade_submission(&submission, &rubric).await?;
        self.apply_best_grade(submission_id).await?;
        Ok(grade)
    }

    /// 教授人工评分：追加成绩记录并按最优成绩策略重算最终分
    pub async fn record_professor_grade(
        &self,
        req: CreateProfessorGradeRequest,
    ) -> Result<Grade> {
        let lock = self.lock_for(req.submission_id);
        let _guard = lock.lock().await;

        let submission = self.require_submission(req.submission_id).await?;
        if submission.status == SubmissionStatus::Draft {
            return Err(AutoGradeError::validation("草稿提交不能人工评分"));
        }

        let grade = self.storage.create_professor_grade(req).await?;
        self.apply_best_grade(grade.submission_id).await?;
        Ok(grade)
    }

    /// 截止时间对账：幂等，任何路径都可以安全调用
    ///
    /// 过期且至少有一页的草稿被强制定稿，其余情况原样返回。
    pub async fn reconcile(&self, submission_id: i64, now: i64) -> Result<Submission> {
        let lock = self.lock_for(submission_id);
        let _guard = lock.lock().await;

        let submission = self.require_submission(submission_id).await?;
        if submission.status != SubmissionStatus::Draft {
            return Ok(submission);
        }

        let problem = self
            .storage
            .get_problem_by_id(submission.problem_id)
            .await?
            .ok_or_else(|| {
                AutoGradeError::not_found(format!("题目不存在: {}", submission.problem_id))
            })?;
        let problem_set = self
            .storage
            .get_problem_set_by_id(problem.problem_set_id)
            .await?
            .ok_or_else(|| {
                AutoGradeError::not_found(format!("题集不存在: {}", problem.problem_set_id))
            })?;

        let past_due = matches!(problem_set.due_at, Some(due) if due.timestamp() < now);
        if !past_due {
            return Ok(submission);
        }
        let pages = self.storage.list_submission_pages(submission_id).await?;
        if pages.is_empty() {
            info!(submission_id, "过期草稿没有任何页，保持草稿状态");
            return Ok(submission);
        }

        info!(submission_id, "截止时间已过，强制定稿草稿提交");
        self.finalize_inner(&submission, now).await
    }

    /// 后台清扫：对所有过期草稿逐个对账，返回实际定稿的数量
    ///
    /// 单个提交失败只记日志不中断，下一轮清扫会重试。
    pub async fn sweep_past_due(&self, now: i64) -> Result<usize> {
        let drafts = self.storage.list_draft_submissions_past_due(now).await?;
        let mut transitioned = 0;

        for draft in drafts {
            match self.reconcile(draft.id, now).await {
                Ok(after) if after.status != SubmissionStatus::Draft => {
                    transitioned += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(submission_id = draft.id, error = %e, "清扫对账失败");
                }
            }
        }

        if transitioned > 0 {
            info!(count = transitioned, "清扫定稿了过期草稿");
        }
        Ok(transitioned)
    }

    async fn apply_best_grade(&self, submission_id: i64) -> Result<()> {
        if let Some(best) = self.storage.get_best_grade(submission_id).await? {
            self.storage
                .set_final_score(submission_id, best.score)
                .await?;
        }
        Ok(())
    }

    async fn require_submission(&self, submission_id: i64) -> Result<Submission> {
        self.storage
            .get_submission_by_id(submission_id)
            .await?
            .ok_or_else(|| AutoGradeError::not_found(format!("提交不存在: {submission_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradingConfig;
    use crate::grading::client::{ModelBackend, ModelOutcome};
    use crate::grading::raster::PageImage;
    use crate::models::problems::requests::{CreateProblemRequest, CreateProblemSetRequest};
    use crate::models::submissions::requests::{
        AddSubmissionPageRequest, CreateSubmissionRequest,
    };
    use async_trait::async_trait;
    use chrono::Utc;

    struct NeverCalledBackend;

    #[async_trait]
    impl ModelBackend for NeverCalledBackend {
        async fn structured_request(
            &self,
            _instruction: &str,
            _images: &[PageImage],
            _temperature: f32,
        ) -> ModelOutcome {
            ModelOutcome::Failed {
                reason: "backend should not be called in these tests".to_string(),
            }
        }
    }

    struct Fixture {
        storage: Arc<dyn Storage>,
        lifecycle: SubmissionLifecycle,
        problem_id: i64,
        submission_id: i64,
        _dir: tempfile::TempDir,
    }

    /// 无模型凭证的环境：评分走占位路径，确定性强
    async fn fixture(due_at: Option<i64>, with_page: bool) -> Fixture {
        let storage: Arc<dyn Storage> = Arc::new(
            crate::storage::sea_orm_storage::SeaOrmStorage::new_with_url(":memory:", 1, 5)
                .await
                .unwrap(),
        );
        let dir = tempfile::tempdir().unwrap();
        let prompt = dir.path().join("prompt.png");
        std::fs::write(&prompt, b"prompt-bytes").unwrap();

        let ps = storage
            .create_problem_set(CreateProblemSetRequest {
                title: "PS1".to_string(),
                release_at: None,
                due_at: due_at.and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            })
            .await
            .unwrap();
        let problem = storage
            .create_problem(CreateProblemRequest {
                problem_set_id: ps.id,
                title: "P1".to_string(),
                prompt_path: prompt.to_string_lossy().to_string(),
                max_score: 10,
                sort_order: 1,
            })
            .await
            .unwrap();
        let submission = storage
            .create_submission(CreateSubmissionRequest {
                problem_id: problem.id,
                student_id: 42,
            })
            .await
            .unwrap();
        if with_page {
            let page = dir.path().join("page1.png");
            std::fs::write(&page, b"page-bytes").unwrap();
            storage
                .add_submission_page(
                    submission.id,
                    AddSubmissionPageRequest {
                        page_number: 1,
                        file_path: page.to_string_lossy().to_string(),
                        mime_type: "image/png".to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let config = GradingConfig {
            api_key: None,
            base_url: "https://api.example.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            temperature: 0.0,
        };
        let engine = Arc::new(GradingEngine::new(
            config,
            Arc::new(NeverCalledBackend),
            storage.clone(),
        ));
        let lifecycle = SubmissionLifecycle::new(storage.clone(), engine);

        Fixture {
            storage,
            lifecycle,
            problem_id: problem.id,
            submission_id: submission.id,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_finalize_requires_pages() {
        let f = fixture(None, false).await;
        let err = f
            .lifecycle
            .finalize(f.submission_id, Utc::now().timestamp())
            .await
            .unwrap_err();
        assert_eq!(err.code(), AutoGradeError::validation("").code());
    }

    #[tokio::test]
    async fn test_finalize_without_rubric_stays_submitted() {
        let f = fixture(None, true).await;
        let now = Utc::now().timestamp();
        let after = f.lifecycle.finalize(f.submission_id, now).await.unwrap();
        assert_eq!(after.status, SubmissionStatus::Submitted);
        assert_eq!(after.submitted_at.map(|t| t.timestamp()), Some(now));
        assert!(after.final_score.is_none());

        // 定稿后不能再次定稿
        let err = f.lifecycle.finalize(f.submission_id, now).await.unwrap_err();
        assert_eq!(err.code(), AutoGradeError::validation("").code());
    }

    #[tokio::test]
    async fn test_finalize_with_fallback_rubric_grades_placeholder() {
        let f = fixture(None, true).await;
        // 兜底评分标准 [3, 3, 4]
        f.storage
            .create_rubric(
                f.problem_id,
                1,
                10,
                vec![
                    ("Criterion 1".to_string(), 3),
                    ("Criterion 2".to_string(), 3),
                    ("Criterion 3".to_string(), 4),
                ],
            )
            .await
            .unwrap();

        let after = f
            .lifecycle
            .finalize(f.submission_id, Utc::now().timestamp())
            .await
            .unwrap();
        assert_eq!(after.status, SubmissionStatus::Graded);
        assert_eq!(after.final_score, Some(0.0));

        let runs = f.storage.list_autograde_runs(f.submission_id).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].model, "placeholder");
    }

    #[tokio::test]
    async fn test_best_grade_wins() {
        let f = fixture(None, true).await;
        let now = Utc::now().timestamp();
        f.lifecycle.finalize(f.submission_id, now).await.unwrap();

        for score in [7.0, 9.0, 5.0] {
            f.lifecycle
                .record_professor_grade(CreateProfessorGradeRequest {
                    submission_id: f.submission_id,
                    rubric_id: None,
                    score,
                    feedback: format!("manual {score}"),
                    grader_id: 7,
                })
                .await
                .unwrap();
        }

        let refreshed = f
            .storage
            .get_submission_by_id(f.submission_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.final_score, Some(9.0));
    }

    #[tokio::test]
    async fn test_professor_grade_rejected_for_draft() {
        let f = fixture(None, true).await;
        let err = f
            .lifecycle
            .record_professor_grade(CreateProfessorGradeRequest {
                submission_id: f.submission_id,
                rubric_id: None,
                score: 5.0,
                feedback: "too early".to_string(),
                grader_id: 7,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), AutoGradeError::validation("").code());
    }

    #[tokio::test]
    async fn test_reconcile_past_due_draft_finalizes() {
        let now = Utc::now().timestamp();
        let f = fixture(Some(now - 3600), true).await;
        f.storage
            .create_rubric(f.problem_id, 1, 10, vec![("Criterion 1".to_string(), 10)])
            .await
            .unwrap();

        let after = f.lifecycle.reconcile(f.submission_id, now).await.unwrap();
        assert_eq!(after.status, SubmissionStatus::Graded);
        assert_eq!(after.submitted_at.map(|t| t.timestamp()), Some(now));

        // 幂等：第二次对账不再产生新的评分运行
        let again = f.lifecycle.reconcile(f.submission_id, now).await.unwrap();
        assert_eq!(again.status, SubmissionStatus::Graded);
        let runs = f.storage.list_autograde_runs(f.submission_id).await.unwrap();
        assert_eq!(runs.len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_ignores_empty_or_future_drafts() {
        let now = Utc::now().timestamp();

        // 过期但没有任何页：保持草稿
        let empty = fixture(Some(now - 3600), false).await;
        let after = empty.lifecycle.reconcile(empty.submission_id, now).await.unwrap();
        assert_eq!(after.status, SubmissionStatus::Draft);

        // 未过期：保持草稿
        let future = fixture(Some(now + 3600), true).await;
        let after = future
            .lifecycle
            .reconcile(future.submission_id, now)
            .await
            .unwrap();
        assert_eq!(after.status, SubmissionStatus::Draft);
    }

    #[tokio::test]
    async fn test_sweep_finalizes_past_due_drafts() {
        let now = Utc::now().timestamp();
        let f = fixture(Some(now - 3600), true).await;

        let count = f.lifecycle.sweep_past_due(now).await.unwrap();
        assert_eq!(count, 1);

        let refreshed = f
            .storage
            .get_submission_by_id(f.submission_id)
            .await
            .unwrap()
            .unwrap();
        // 没有评分标准时清扫只定稿不评分
        assert_eq!(refreshed.status, SubmissionStatus::Submitted);

        // 再次清扫没有可处理的草稿
        assert_eq!(f.lifecycle.sweep_past_due(now).await.unwrap(), 0);
    }
}
