use std::sync::Arc;

use crate::models::{
    grades::{
        entities::{AutoGradeRun, Grade},
        requests::{CreateProfessorGradeRequest, RecordAutoGradeRequest},
    },
    problems::{
        entities::{Problem, ProblemSet},
        requests::{CreateProblemRequest, CreateProblemSetRequest},
    },
    rubrics::entities::Rubric,
    submissions::{
        entities::{Submission, SubmissionPage},
        requests::{AddSubmissionPageRequest, CreateSubmissionRequest},
    },
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 题集与题目管理方法
    // 创建题集
    async fn create_problem_set(&self, req: CreateProblemSetRequest) -> Result<ProblemSet>;
    // 通过ID获取题集
    async fn get_problem_set_by_id(&self, id: i64) -> Result<Option<ProblemSet>>;
    // 创建题目
    async fn create_problem(&self, req: CreateProblemRequest) -> Result<Problem>;
    // 通过ID获取题目
    async fn get_problem_by_id(&self, id: i64) -> Result<Option<Problem>>;

    /// 评分标准管理方法
    // 原子化创建一个评分标准版本及其全部评分项
    async fn create_rubric(
        &self,
        problem_id: i64,
        version: i64,
        total_points: i64,
        items: Vec<(String, i64)>,
    ) -> Result<Rubric>;
    // 通过ID获取评分标准（含评分项）
    async fn get_rubric_by_id(&self, rubric_id: i64) -> Result<Option<Rubric>>;
    // 获取题目当前生效的评分标准（最高版本，版本相同时取最大ID）
    async fn get_active_rubric(&self, problem_id: i64) -> Result<Option<Rubric>>;

    /// 提交管理方法
    // 创建草稿提交
    async fn create_submission(&self, req: CreateSubmissionRequest) -> Result<Submission>;
    // 通过ID获取提交
    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>>;
    // 通过题目和学生获取提交
    async fn get_submission_by_problem_and_student(
        &self,
        problem_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>>;
    // 向草稿提交添加一页
    async fn add_submission_page(
        &self,
        submission_id: i64,
        req: AddSubmissionPageRequest,
    ) -> Result<SubmissionPage>;
    // 列出提交的所有页（按页码升序）
    async fn list_submission_pages(&self, submission_id: i64) -> Result<Vec<SubmissionPage>>;
    // 标记提交已定稿
    async fn mark_submitted(&self, submission_id: i64, submitted_at: i64) -> Result<bool>;
    // 更新最终成绩（评分完成后状态置为已评分）
    async fn set_final_score(&self, submission_id: i64, score: f64) -> Result<bool>;
    // 列出截止时间已过且仍为草稿的提交（清扫用）
    async fn list_draft_submissions_past_due(&self, now: i64) -> Result<Vec<Submission>>;

    /// 成绩管理方法
    // 原子化记录一次自动评分：运行记录 + 成绩 + 提交状态更新
    async fn record_autograde(
        &self,
        req: RecordAutoGradeRequest,
    ) -> Result<(AutoGradeRun, Grade)>;
    // 记录教授人工评分
    async fn create_professor_grade(&self, req: CreateProfessorGradeRequest) -> Result<Grade>;
    // 列出提交的全部成绩历史
    async fn list_grades(&self, submission_id: i64) -> Result<Vec<Grade>>;
    // 取最优成绩：分数降序，定稿时间降序，ID降序
    async fn get_best_grade(&self, submission_id: i64) -> Result<Option<Grade>>;
    // 列出提交的自动评分运行记录
    async fn list_autograde_runs(&self, submission_id: i64) -> Result<Vec<AutoGradeRun>>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
