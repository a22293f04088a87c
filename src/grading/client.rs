//! OpenAI 兼容模型调用封装
//!
//! 评分与推断共用一个 `ModelBackend` trait：一次请求携带文本指令、
//! 若干 base64 图片和温度，返回显式的 `ModelOutcome` 而不是抛异常，
//! 评分引擎据此区分"成功解析"与"记录在案的失败"。测试用假后端替换。

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::GradingConfig;
use crate::errors::{AutoGradeError, Result};

use super::raster::PageImage;

/// 一次结构化输出请求的结果
#[derive(Debug, Clone)]
pub enum ModelOutcome {
    /// HTTP 成功且响应体解析为 JSON
    Parsed {
        value: serde_json::Value,
        raw_text: String,
    },
    /// 网络错误、超时、HTTP 非 2xx 或响应不是合法 JSON
    Failed { reason: String },
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// 发送一次结构化输出请求
    ///
    /// 实现不得 panic，也不得返回 Err —— 一切失败折叠进
    /// `ModelOutcome::Failed`，由调用方决定失败是致命还是可记录。
    async fn structured_request(
        &self,
        instruction: &str,
        images: &[PageImage],
        temperature: f32,
    ) -> ModelOutcome;
}

/// 未配置凭证时的后端，占位评分路径不会真正调用它
pub struct DisabledBackend;

#[async_trait]
impl ModelBackend for DisabledBackend {
    async fn structured_request(
        &self,
        _instruction: &str,
        _images: &[PageImage],
        _temperature: f32,
    ) -> ModelOutcome {
        ModelOutcome::Failed {
            reason: "model credential not configured".to_string(),
        }
    }
}

/// 基于 reqwest 的 OpenAI 兼容后端（chat/completions + JSON 输出模式）
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// 从评分配置构建后端，超时在 HTTP 客户端层面强制执行
    pub fn from_config(config: &GradingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AutoGradeError::configuration("模型 API key 未配置"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// 组装多模态消息体：文本指令在前，图片按序以 data URL 附加
    fn build_request_body(
        &self,
        instruction: &str,
        images: &[PageImage],
        temperature: f32,
    ) -> serde_json::Value {
        let mut content_parts = vec![json!({
            "type": "text",
            "text": instruction,
        })];

        for image in images {
            let b64 = general_purpose::STANDARD.encode(&image.bytes);
            content_parts.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", image.mime, b64)
                }
            }));
        }

        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": content_parts
                }
            ],
            "temperature": temperature,
            "stream": false,
            "response_format": {"type": "json_object"}
        })
    }
}

/// 剥掉模型偶尔包裹的 markdown 代码块标记
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn structured_request(
        &self,
        instruction: &str,
        images: &[PageImage],
        temperature: f32,
    ) -> ModelOutcome {
        let body = self.build_request_body(instruction, images, temperature);
        debug!("发送模型请求: {} 张图片, model={}", images.len(), self.model);

        let response = match self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("模型请求超时: {e}")
                } else if e.is_connect() {
                    format!("无法连接到模型服务: {e}")
                } else {
                    format!("模型请求失败: {e}")
                };
                return ModelOutcome::Failed { reason };
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return ModelOutcome::Failed {
                reason: format!("模型服务返回错误: {status} - {error_text}"),
            };
        }

        let envelope: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return ModelOutcome::Failed {
                    reason: format!("读取模型响应失败: {e}"),
                };
            }
        };

        let raw_text = match envelope["choices"][0]["message"]["content"].as_str() {
            Some(text) => text.to_string(),
            None => {
                return ModelOutcome::Failed {
                    reason: "模型响应缺少 choices[0].message.content".to_string(),
                };
            }
        };

        match serde_json::from_str::<serde_json::Value>(strip_code_fences(&raw_text)) {
            Ok(value) => ModelOutcome::Parsed { value, raw_text },
            Err(e) => ModelOutcome::Failed {
                reason: format!("模型输出不是合法 JSON: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OpenAiBackend {
        OpenAiBackend {
            client: reqwest::Client::new(),
            base_url: "https://api.example.com/v1".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn test_build_request_body_shape() {
        let images = vec![PageImage {
            bytes: vec![1, 2, 3],
            mime: "image/png".to_string(),
        }];
        let body = backend().build_request_body("grade this", &images, 0.0);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_object");

        let parts = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "grade this");
        assert_eq!(parts[1]["type"], "image_url");
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = GradingConfig {
            api_key: None,
            base_url: "https://api.example.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            temperature: 0.0,
        };
        assert!(OpenAiBackend::from_config(&config).is_err());

        let config = GradingConfig {
            api_key: Some(String::new()),
            ..config
        };
        assert!(OpenAiBackend::from_config(&config).is_err());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }
}
