//! 自动评分核心
//!
//! - `raster`: 文档栅格化，把 PDF/图片统一转成页图序列
//! - `normalize`: 评分点数归一化与逐项得分裁剪
//! - `schema`: 模型结构化输出的目标格式
//! - `client`: OpenAI 兼容模型调用封装
//! - `inference`: 评分标准推断引擎（含确定性兜底标准）
//! - `engine`: 评分引擎
//! - `lifecycle`: 提交生命周期控制器

pub mod client;
pub mod engine;
pub mod inference;
pub mod lifecycle;
pub mod normalize;
pub mod raster;
pub mod schema;
