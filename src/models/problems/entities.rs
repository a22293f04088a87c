use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSet {
    // 唯一 ID
    pub id: i64,
    // 题集标题
    pub title: String,
    // 发布时间
    pub release_at: Option<chrono::DateTime<chrono::Utc>>,
    // 截止时间，过期的草稿提交会被清扫为已评分
    pub due_at: Option<chrono::DateTime<chrono::Utc>>,
    // 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    // 唯一 ID
    pub id: i64,
    // 所属题集 ID
    pub problem_set_id: i64,
    // 题目标题
    pub title: String,
    // 题面文件路径（PDF 或图片）
    pub prompt_path: String,
    // 题目满分
    pub max_score: i64,
    // 题集内排序
    pub sort_order: i64,
    // 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl crate::entity::problem_sets::Model {
    pub fn into_problem_set(self) -> ProblemSet {
        ProblemSet {
            id: self.id,
            title: self.title,
            release_at: self
                .release_at
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            due_at: self
                .due_at
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            created_at: chrono::DateTime::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}

impl crate::entity::problems::Model {
    pub fn into_problem(self) -> Problem {
        Problem {
            id: self.id,
            problem_set_id: self.problem_set_id,
            title: self.title,
            prompt_path: self.prompt_path,
            max_score: self.max_score,
            sort_order: self.sort_order,
            created_at: chrono::DateTime::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
