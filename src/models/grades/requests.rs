use serde::Deserialize;

/// 记录一次自动评分的请求
///
/// Storage 层在单个事务内写入运行记录与成绩并更新提交，
/// 不允许出现"已评分但无成绩行"的中间状态。
#[derive(Debug, Clone)]
pub struct RecordAutoGradeRequest {
    pub submission_id: i64,
    pub rubric_id: Option<i64>,
    pub model: String,
    // {"raw_text": ..., "parsed": ...}
    pub raw_output: serde_json::Value,
    pub score: f64,
    pub feedback: String,
}

/// 教授人工评分请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfessorGradeRequest {
    pub submission_id: i64,
    pub rubric_id: Option<i64>,
    pub score: f64,
    pub feedback: String,
    pub grader_id: i64,
}
