use serde::Deserialize;

/// 创建题集请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProblemSetRequest {
    pub title: String,
    pub release_at: Option<chrono::DateTime<chrono::Utc>>,
    pub due_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 创建题目请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProblemRequest {
    pub problem_set_id: i64,
    pub title: String,
    pub prompt_path: String,
    pub max_score: i64,
    pub sort_order: i64,
}
