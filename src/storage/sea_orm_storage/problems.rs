//! 题集与题目存储操作

use super::SeaOrmStorage;
use crate::entity::problem_sets::{ActiveModel as ProblemSetActiveModel, Entity as ProblemSets};
use crate::entity::problems::{ActiveModel, Entity as Problems};
use crate::errors::{AutoGradeError, Result};
use crate::models::problems::{
    entities::{Problem, ProblemSet},
    requests::{CreateProblemRequest, CreateProblemSetRequest},
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

impl SeaOrmStorage {
    /// 创建题集
    pub async fn create_problem_set_impl(
        &self,
        req: CreateProblemSetRequest,
    ) -> Result<ProblemSet> {
        let now = chrono::Utc::now().timestamp();

        let model = ProblemSetActiveModel {
            title: Set(req.title),
            release_at: Set(req.release_at.map(|dt| dt.timestamp())),
            due_at: Set(req.due_at.map(|dt| dt.timestamp())),
            created_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("创建题集失败: {e}")))?;

        Ok(result.into_problem_set())
    }

    /// 通过 ID 获取题集
    pub async fn get_problem_set_by_id_impl(&self, id: i64) -> Result<Option<ProblemSet>> {
        let result = ProblemSets::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询题集失败: {e}")))?;

        Ok(result.map(|m| m.into_problem_set()))
    }

    /// 创建题目
    pub async fn create_problem_impl(&self, req: CreateProblemRequest) -> Result<Problem> {
        if req.max_score <= 0 {
            return Err(AutoGradeError::validation(format!(
                "题目满分必须为正数: {}",
                req.max_score
            )));
        }

        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            problem_set_id: Set(req.problem_set_id),
            title: Set(req.title),
            prompt_path: Set(req.prompt_path),
            max_score: Set(req.max_score),
            sort_order: Set(req.sort_order),
            created_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("创建题目失败: {e}")))?;

        Ok(result.into_problem())
    }

    /// 通过 ID 获取题目
    pub async fn get_problem_by_id_impl(&self, id: i64) -> Result<Option<Problem>> {
        let result = Problems::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询题目失败: {e}")))?;

        Ok(result.map(|m| m.into_problem()))
    }
}
