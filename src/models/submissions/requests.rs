use serde::Deserialize;

/// 创建草稿提交请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmissionRequest {
    pub problem_id: i64,
    pub student_id: i64,
}

/// 向草稿添加一页
#[derive(Debug, Clone, Deserialize)]
pub struct AddSubmissionPageRequest {
    pub page_number: i64,
    pub file_path: String,
    pub mime_type: String,
}
