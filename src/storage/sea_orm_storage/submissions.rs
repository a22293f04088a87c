//! 提交存储操作

use super::SeaOrmStorage;
use crate::entity::problem_sets::Column as ProblemSetColumn;
use crate::entity::submission_files::{
    ActiveModel as SubmissionFileActiveModel, Column as SubmissionFileColumn,
    Entity as SubmissionFiles,
};
use crate::entity::submissions::{ActiveModel, Column, Entity as Submissions};
use crate::errors::{AutoGradeError, Result};
use crate::models::submissions::{
    entities::{Submission, SubmissionPage, SubmissionStatus},
    requests::{AddSubmissionPageRequest, CreateSubmissionRequest},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};

impl SeaOrmStorage {
    /// 创建草稿提交
    ///
    /// (problem_id, student_id) 上有唯一约束，重复创建会报数据库错误。
    pub async fn create_submission_impl(&self, req: CreateSubmissionRequest) -> Result<Submission> {
        let model = ActiveModel {
            problem_id: Set(req.problem_id),
            student_id: Set(req.student_id),
            status: Set(SubmissionStatus::Draft.to_string()),
            final_score: Set(None),
            submitted_at: Set(None),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("创建提交失败: {e}")))?;

        Ok(result.into_submission())
    }

    /// 通过 ID 获取提交
    pub async fn get_submission_by_id_impl(
        &self,
        submission_id: i64,
    ) -> Result<Option<Submission>> {
        let result = Submissions::find_by_id(submission_id)
            .one(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    /// 通过题目和学生获取提交
    pub async fn get_submission_by_problem_and_student_impl(
        &self,
        problem_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        let result = Submissions::find()
            .filter(Column::ProblemId.eq(problem_id))
            .filter(Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    /// 向草稿提交添加一页
    pub async fn add_submission_page_impl(
        &self,
        submission_id: i64,
        req: AddSubmissionPageRequest,
    ) -> Result<SubmissionPage> {
        let model = SubmissionFileActiveModel {
            submission_id: Set(submission_id),
            page_number: Set(req.page_number),
            file_path: Set(req.file_path),
            mime_type: Set(req.mime_type),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("添加提交页失败: {e}")))?;

        Ok(result.into_submission_page())
    }

    /// 列出提交的所有页（按页码升序）
    pub async fn list_submission_pages_impl(
        &self,
        submission_id: i64,
    ) -> Result<Vec<SubmissionPage>> {
        let results = SubmissionFiles::find()
            .filter(SubmissionFileColumn::SubmissionId.eq(submission_id))
            .order_by_asc(SubmissionFileColumn::PageNumber)
            .order_by_asc(SubmissionFileColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询提交页失败: {e}")))?;

        Ok(results
            .into_iter()
            .map(|m| m.into_submission_page())
            .collect())
    }

    /// 标记提交已定稿
    pub async fn mark_submitted_impl(&self, submission_id: i64, submitted_at: i64) -> Result<bool> {
        let result = Submissions::update_many()
            .col_expr(
                Column::Status,
                sea_orm::sea_query::Expr::value(SubmissionStatus::Submitted.to_string()),
            )
            .col_expr(
                Column::SubmittedAt,
                sea_orm::sea_query::Expr::value(Some(submitted_at)),
            )
            .filter(Column::Id.eq(submission_id))
            .exec(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("更新提交状态失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 更新最终成绩并将状态置为已评分
    pub async fn set_final_score_impl(&self, submission_id: i64, score: f64) -> Result<bool> {
        let result = Submissions::update_many()
            .col_expr(
                Column::FinalScore,
                sea_orm::sea_query::Expr::value(Some(score)),
            )
            .col_expr(
                Column::Status,
                sea_orm::sea_query::Expr::value(SubmissionStatus::Graded.to_string()),
            )
            .filter(Column::Id.eq(submission_id))
            .exec(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("更新最终成绩失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 列出截止时间已过且仍为草稿的提交
    ///
    /// 清扫任务和读取路径都会调用，配合 reconcile 把迟交的草稿定稿。
    pub async fn list_draft_submissions_past_due_impl(&self, now: i64) -> Result<Vec<Submission>> {
        let results = Submissions::find()
            .filter(Column::Status.eq(SubmissionStatus::Draft.to_string()))
            .join(
                JoinType::InnerJoin,
                crate::entity::submissions::Relation::Problem.def(),
            )
            .join(
                JoinType::InnerJoin,
                crate::entity::problems::Relation::ProblemSet.def(),
            )
            .filter(ProblemSetColumn::DueAt.is_not_null())
            .filter(ProblemSetColumn::DueAt.lt(now))
            .all(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询过期草稿失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_submission()).collect())
    }
}
