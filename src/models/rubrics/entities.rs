use serde::{Deserialize, Serialize};

/// 评分标准（含评分项），按版本追加，创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    // 唯一 ID
    pub id: i64,
    // 所属题目 ID
    pub problem_id: i64,
    // 版本号，同一题目下唯一，最高版本为当前生效版本
    pub version: i64,
    // 总分快照，等于创建时题目的满分
    pub total_points: i64,
    // 评分项，按 sort_order 升序
    pub items: Vec<RubricItem>,
    // 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 评分项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricItem {
    pub id: i64,
    // 评分项标签，模型返回的逐项得分按标签精确匹配
    pub label: String,
    // 分值，至少 1 分
    pub points: i64,
    // 展示顺序，1 起始
    pub sort_order: i64,
}

impl crate::entity::rubric_items::Model {
    pub fn into_rubric_item(self) -> RubricItem {
        RubricItem {
            id: self.id,
            label: self.label,
            points: self.points,
            sort_order: self.sort_order,
        }
    }
}

impl crate::entity::rubrics::Model {
    pub fn into_rubric(self, items: Vec<RubricItem>) -> Rubric {
        Rubric {
            id: self.id,
            problem_id: self.problem_id,
            version: self.version,
            total_points: self.total_points,
            items,
            created_at: chrono::DateTime::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
