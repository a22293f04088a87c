use std::sync::Arc;

use dotenv::dotenv;
use human_panic::setup_panic;
use tracing::{debug, error, warn};

// 从 lib.rs 导入模块
use rust_autograde_next::config::AppConfig;
use rust_autograde_next::grading::client::{DisabledBackend, ModelBackend, OpenAiBackend};
use rust_autograde_next::grading::engine::GradingEngine;
use rust_autograde_next::grading::lifecycle::SubmissionLifecycle;
use rust_autograde_next::storage;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    // 记录程序启动时间
    let app_start_time = chrono::Utc::now();

    // 启动前预处理 //

    // 初始化配置
    setup_panic!();
    AppConfig::init().expect("Failed to initialize configuration");
    let config = AppConfig::get();

    // 初始化日志
    let stdout_log = std::io::stdout();
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(stdout_log);
    let filter = tracing_subscriber::EnvFilter::new(&config.app.log_level);
    let tracing_format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_ansi(true);

    let tracing_builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking_writer)
        .event_format(tracing_format);

    if config.is_development() {
        tracing_builder
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_builder.json().init();
    }

    // 打印信息
    warn!(
        "Starting pre-startup processing...
        Project: {}
        Version: {}
        Authors: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS")
    );

    let store = storage::create_storage()
        .await
        .expect("Failed to initialize storage");

    let backend: Arc<dyn ModelBackend> = if config.grading.has_credential() {
        match OpenAiBackend::from_config(&config.grading) {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                error!("模型后端初始化失败: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        warn!("未配置模型凭证，自动评分将记录占位成绩");
        Arc::new(DisabledBackend)
    };

    let engine = Arc::new(GradingEngine::new(
        config.grading.clone(),
        backend,
        store.clone(),
    ));
    let lifecycle = SubmissionLifecycle::new(store.clone(), engine);

    // 输出预处理时间
    debug!(
        "Pre-startup processing completed in {} ms",
        chrono::Utc::now()
            .signed_duration_since(app_start_time)
            .num_milliseconds()
    );

    // 预处理完成 //

    if !config.sweep.enabled {
        warn!("截止时间清扫已禁用，等待退出信号");
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    warn!(
        "Starting deadline sweep loop, interval: {}s",
        config.sweep.interval_secs
    );

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(config.sweep.interval_secs));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = chrono::Utc::now().timestamp();
                match lifecycle.sweep_past_due(now).await {
                    Ok(count) if count > 0 => {
                        warn!("清扫定稿了 {} 个过期草稿", count);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("清扫失败: {}", e.format_simple());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Graceful shutdown: sweep loop stopped");
                break;
            }
        }
    }

    Ok(())
}
