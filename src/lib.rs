//! AutoGrade - 数学作业自动评分服务核心
//!
//! 围绕"提交 -> 评分标准 -> 自动评分 -> 成绩"构建的作业评分系统。
//!
//! # 架构
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `grading`: 评分核心（标准推断、光栅化、模型调用、生命周期）
//! - `models`: 数据模型定义
//! - `storage`: 数据存储层（SeaORM）

pub mod config;
pub mod entity;
pub mod errors;
pub mod grading;
pub mod models;
pub mod storage;
