use serde::{Deserialize, Serialize};

// 评分者类型
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraderType {
    Auto,      // 自动评分
    Professor, // 教授人工评分
}

impl GraderType {
    pub const AUTO: &'static str = "auto";
    pub const PROFESSOR: &'static str = "professor";
}

impl<'de> Deserialize<'de> for GraderType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "auto" => Ok(GraderType::Auto),
            "professor" => Ok(GraderType::Professor),
            _ => Err(serde::de::Error::custom(format!(
                "无效的评分者类型: '{s}'. 支持的类型: auto, professor"
            ))),
        }
    }
}

impl std::fmt::Display for GraderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraderType::Auto => write!(f, "auto"),
            GraderType::Professor => write!(f, "professor"),
        }
    }
}

impl std::str::FromStr for GraderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(GraderType::Auto),
            "professor" => Ok(GraderType::Professor),
            _ => Err(format!("Invalid grader type: {s}")),
        }
    }
}

/// 成绩记录（历史追加，不覆盖）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub submission_id: i64,
    // 评分时使用的评分标准，标准被删除后置空
    pub rubric_id: Option<i64>,
    pub score: f64,
    pub feedback: String,
    pub grader_type: GraderType,
    // 人工评分时的教授 ID，自动评分为空
    pub grader_id: Option<i64>,
    pub finalized_at: chrono::DateTime<chrono::Utc>,
}

/// 自动评分运行审计记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoGradeRun {
    pub id: i64,
    pub submission_id: i64,
    pub rubric_id: Option<i64>,
    // 评分所用模型名，占位路径为 "placeholder"
    pub model: String,
    // {"raw_text": ..., "parsed": ...}，parsed 为归一化后的结构化结果
    pub raw_output: serde_json::Value,
    pub score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl crate::entity::grades::Model {
    pub fn into_grade(self) -> Grade {
        Grade {
            id: self.id,
            submission_id: self.submission_id,
            rubric_id: self.rubric_id,
            score: self.score,
            feedback: self.feedback,
            grader_type: self.grader_type.parse().unwrap_or(GraderType::Auto),
            grader_id: self.grader_id,
            finalized_at: chrono::DateTime::from_timestamp(self.finalized_at, 0)
                .unwrap_or_default(),
        }
    }
}

impl crate::entity::autograde_runs::Model {
    pub fn into_autograde_run(self) -> AutoGradeRun {
        AutoGradeRun {
            id: self.id,
            submission_id: self.submission_id,
            rubric_id: self.rubric_id,
            model: self.model,
            raw_output: serde_json::from_str(&self.raw_output_json)
                .unwrap_or(serde_json::Value::Null),
            score: self.score,
            created_at: chrono::DateTime::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
