//! 模型结构化输出的目标格式
//!
//! 两个 schema：评分标准草稿（推断引擎）和评分结果（评分引擎）。
//! 模型输出不可信，字段都带默认值，数值边界由 normalize 模块兜底。

use serde::{Deserialize, Serialize};

// 评分项状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Correct,   // 完全正确，给满分
    Incorrect, // 错误，零分
    Partial,   // 部分正确，按返回分数裁剪
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Partial
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Correct => write!(f, "correct"),
            ItemStatus::Incorrect => write!(f, "incorrect"),
            ItemStatus::Partial => write!(f, "partial"),
        }
    }
}

/// 模型返回的单个评分项得分
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricScore {
    pub label: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
}

/// 评分结果 schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResult {
    #[serde(default)]
    pub total_score: f64,
    #[serde(default)]
    pub rubric_scores: Vec<RubricScore>,
    #[serde(default)]
    pub feedback: String,
}

/// 评分标准草稿的单项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricItemDraft {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub points: Option<f64>,
}

/// 评分标准草稿 schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricDraft {
    #[serde(default)]
    pub items: Vec<RubricItemDraft>,
}
