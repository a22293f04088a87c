//! 成绩与自动评分运行记录存储操作

use super::SeaOrmStorage;
use crate::entity::autograde_runs::{
    ActiveModel as AutoGradeRunActiveModel, Column as AutoGradeRunColumn, Entity as AutoGradeRuns,
};
use crate::entity::grades::{ActiveModel, Column, Entity as Grades};
use crate::entity::submissions::{Column as SubmissionColumn, Entity as Submissions};
use crate::errors::{AutoGradeError, Result};
use crate::models::grades::{
    entities::{AutoGradeRun, Grade, GraderType},
    requests::{CreateProfessorGradeRequest, RecordAutoGradeRequest},
};
use crate::models::submissions::entities::SubmissionStatus;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 原子化记录一次自动评分
    ///
    /// 单个事务内写入运行记录和成绩，并把提交更新为已评分。
    /// "已评分但没有成绩行"不是合法的可观察状态。
    pub async fn record_autograde_impl(
        &self,
        req: RecordAutoGradeRequest,
    ) -> Result<(AutoGradeRun, Grade)> {
        let now = chrono::Utc::now().timestamp();
        let raw_output_json = serde_json::to_string(&req.raw_output)
            .map_err(|e| AutoGradeError::serialization(format!("序列化评分输出失败: {e}")))?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("开启事务失败: {e}")))?;

        let run = AutoGradeRunActiveModel {
            submission_id: Set(req.submission_id),
            rubric_id: Set(req.rubric_id),
            model: Set(req.model),
            raw_output_json: Set(raw_output_json),
            score: Set(req.score),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AutoGradeError::database_operation(format!("创建评分运行记录失败: {e}")))?;

        let grade = ActiveModel {
            submission_id: Set(req.submission_id),
            rubric_id: Set(req.rubric_id),
            score: Set(req.score),
            feedback: Set(req.feedback),
            grader_type: Set(GraderType::Auto.to_string()),
            grader_id: Set(None),
            finalized_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AutoGradeError::database_operation(format!("创建成绩失败: {e}")))?;

        Submissions::update_many()
            .col_expr(
                SubmissionColumn::FinalScore,
                sea_orm::sea_query::Expr::value(Some(req.score)),
            )
            .col_expr(
                SubmissionColumn::Status,
                sea_orm::sea_query::Expr::value(SubmissionStatus::Graded.to_string()),
            )
            .filter(SubmissionColumn::Id.eq(req.submission_id))
            .exec(&txn)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("更新提交状态失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("提交事务失败: {e}")))?;

        Ok((run.into_autograde_run(), grade.into_grade()))
    }

    /// 记录教授人工评分
    pub async fn create_professor_grade_impl(
        &self,
        req: CreateProfessorGradeRequest,
    ) -> Result<Grade> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            submission_id: Set(req.submission_id),
            rubric_id: Set(req.rubric_id),
            score: Set(req.score),
            feedback: Set(req.feedback),
            grader_type: Set(GraderType::Professor.to_string()),
            grader_id: Set(Some(req.grader_id)),
            finalized_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("创建人工成绩失败: {e}")))?;

        Ok(result.into_grade())
    }

    /// 列出提交的全部成绩历史（时间升序）
    pub async fn list_grades_impl(&self, submission_id: i64) -> Result<Vec<Grade>> {
        let results = Grades::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .order_by_asc(Column::FinalizedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询成绩失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_grade()).collect())
    }

    /// 取最优成绩：分数降序，定稿时间降序，ID 降序
    ///
    /// 自动与人工成绩一视同仁，较低的重评分数不会顶掉已有的更高成绩。
    pub async fn get_best_grade_impl(&self, submission_id: i64) -> Result<Option<Grade>> {
        let result = Grades::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .order_by_desc(Column::Score)
            .order_by_desc(Column::FinalizedAt)
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询最优成绩失败: {e}")))?;

        Ok(result.map(|m| m.into_grade()))
    }

    /// 列出提交的自动评分运行记录（时间升序）
    pub async fn list_autograde_runs_impl(&self, submission_id: i64) -> Result<Vec<AutoGradeRun>> {
        let results = AutoGradeRuns::find()
            .filter(AutoGradeRunColumn::SubmissionId.eq(submission_id))
            .order_by_asc(AutoGradeRunColumn::CreatedAt)
            .order_by_asc(AutoGradeRunColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| {
                AutoGradeError::database_operation(format!("查询评分运行记录失败: {e}"))
            })?;

        Ok(results.into_iter().map(|m| m.into_autograde_run()).collect())
    }
}
