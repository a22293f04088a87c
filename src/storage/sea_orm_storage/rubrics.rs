//! 评分标准存储操作

use super::SeaOrmStorage;
use crate::entity::rubric_items::{
    ActiveModel as RubricItemActiveModel, Column as RubricItemColumn, Entity as RubricItems,
};
use crate::entity::rubrics::{ActiveModel, Column, Entity as Rubrics};
use crate::errors::{AutoGradeError, Result};
use crate::models::rubrics::entities::Rubric;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 原子化创建一个评分标准版本及其全部评分项
    ///
    /// 整个写入在单个事务中完成：任何一项失败都会回滚，
    /// 不会留下没有评分项的评分标准。
    pub async fn create_rubric_impl(
        &self,
        problem_id: i64,
        version: i64,
        total_points: i64,
        items: Vec<(String, i64)>,
    ) -> Result<Rubric> {
        if items.is_empty() {
            return Err(AutoGradeError::validation(
                "评分标准必须至少包含一个评分项",
            ));
        }

        let now = chrono::Utc::now().timestamp();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("开启事务失败: {e}")))?;

        let rubric = ActiveModel {
            problem_id: Set(problem_id),
            version: Set(version),
            total_points: Set(total_points),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AutoGradeError::database_operation(format!("创建评分标准失败: {e}")))?;

        let mut created_items = Vec::with_capacity(items.len());
        for (idx, (label, points)) in items.into_iter().enumerate() {
            let item = RubricItemActiveModel {
                rubric_id: Set(rubric.id),
                label: Set(label),
                points: Set(points),
                sort_order: Set(idx as i64 + 1),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("创建评分项失败: {e}")))?;

            created_items.push(item.into_rubric_item());
        }

        txn.commit()
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(rubric.into_rubric(created_items))
    }

    /// 通过 ID 获取评分标准（含评分项）
    pub async fn get_rubric_by_id_impl(&self, rubric_id: i64) -> Result<Option<Rubric>> {
        let rubric = Rubrics::find_by_id(rubric_id)
            .one(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询评分标准失败: {e}")))?;

        match rubric {
            Some(model) => Ok(Some(self.load_rubric_items(model).await?)),
            None => Ok(None),
        }
    }

    /// 获取题目当前生效的评分标准（最高版本，版本相同时取最大 ID）
    pub async fn get_active_rubric_impl(&self, problem_id: i64) -> Result<Option<Rubric>> {
        let rubric = Rubrics::find()
            .filter(Column::ProblemId.eq(problem_id))
            .order_by_desc(Column::Version)
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询评分标准失败: {e}")))?;

        match rubric {
            Some(model) => Ok(Some(self.load_rubric_items(model).await?)),
            None => Ok(None),
        }
    }

    async fn load_rubric_items(&self, model: crate::entity::rubrics::Model) -> Result<Rubric> {
        let items = RubricItems::find()
            .filter(RubricItemColumn::RubricId.eq(model.id))
            .order_by_asc(RubricItemColumn::SortOrder)
            .order_by_asc(RubricItemColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("查询评分项失败: {e}")))?;

        Ok(model.into_rubric(items.into_iter().map(|m| m.into_rubric_item()).collect()))
    }
}
