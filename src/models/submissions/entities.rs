use serde::{Deserialize, Serialize};

// 提交状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,     // 草稿，学生仍可上传页面
    Submitted, // 已提交，等待评分标准就绪
    Graded,    // 已评分，可重复进入重评
}

impl SubmissionStatus {
    pub const DRAFT: &'static str = "draft";
    pub const SUBMITTED: &'static str = "submitted";
    pub const GRADED: &'static str = "graded";
}

impl<'de> Deserialize<'de> for SubmissionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "draft" => Ok(SubmissionStatus::Draft),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "graded" => Ok(SubmissionStatus::Graded),
            _ => Err(serde::de::Error::custom(format!(
                "无效的提交状态: '{s}'. 支持的状态: draft, submitted, graded"
            ))),
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Draft => write!(f, "draft"),
            SubmissionStatus::Submitted => write!(f, "submitted"),
            SubmissionStatus::Graded => write!(f, "graded"),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SubmissionStatus::Draft),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "graded" => Ok(SubmissionStatus::Graded),
            _ => Err(format!("Invalid submission status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    // 唯一 ID
    pub id: i64,
    // 所属题目 ID
    pub problem_id: i64,
    // 学生 ID，(problem_id, student_id) 唯一
    pub student_id: i64,
    // 生命周期状态
    pub status: SubmissionStatus,
    // 最终成绩，由"最高分优先"策略写入
    pub final_score: Option<f64>,
    // 定稿时间
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 提交的一页（扫描件或 PDF）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionPage {
    pub id: i64,
    pub submission_id: i64,
    // 页码，评分时按页码升序送入模型
    pub page_number: i64,
    pub file_path: String,
    pub mime_type: String,
}

impl crate::entity::submissions::Model {
    pub fn into_submission(self) -> Submission {
        Submission {
            id: self.id,
            problem_id: self.problem_id,
            student_id: self.student_id,
            status: self
                .status
                .parse()
                .unwrap_or(SubmissionStatus::Draft),
            final_score: self.final_score,
            submitted_at: self
                .submitted_at
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
        }
    }
}

impl crate::entity::submission_files::Model {
    pub fn into_submission_page(self) -> SubmissionPage {
        SubmissionPage {
            id: self.id,
            submission_id: self.submission_id,
            page_number: self.page_number,
            file_path: self.file_path,
            mime_type: self.mime_type,
        }
    }
}
