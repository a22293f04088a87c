//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod grades;
mod problems;
mod rubrics;
mod submissions;

use crate::config::AppConfig;
use crate::errors::{AutoGradeError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例（从全局配置读取数据库地址）
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        Self::new_with_url(
            &config.database.url,
            config.database.pool_size,
            config.database.timeout,
        )
        .await
    }

    /// 通过显式 URL 创建存储实例（测试用 sqlite::memory:）
    pub async fn new_with_url(url: &str, pool_size: u32, timeout: u64) -> Result<Self> {
        let db_url = Self::build_database_url(url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, pool_size, timeout).await?
        } else {
            Self::connect_generic(&db_url, pool_size, timeout).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| AutoGradeError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, pool_size: u32, timeout: u64) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| AutoGradeError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| AutoGradeError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, pool_size: u32, timeout: u64) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(pool_size)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(timeout))
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| AutoGradeError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(AutoGradeError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    grades::{
        entities::{AutoGradeRun, Grade},
        requests::{CreateProfessorGradeRequest, RecordAutoGradeRequest},
    },
    problems::{
        entities::{Problem, ProblemSet},
        requests::{CreateProblemRequest, CreateProblemSetRequest},
    },
    rubrics::entities::Rubric,
    submissions::{
        entities::{Submission, SubmissionPage},
        requests::{AddSubmissionPageRequest, CreateSubmissionRequest},
    },
};
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 题集与题目模块
    async fn create_problem_set(&self, req: CreateProblemSetRequest) -> Result<ProblemSet> {
        self.create_problem_set_impl(req).await
    }

    async fn get_problem_set_by_id(&self, id: i64) -> Result<Option<ProblemSet>> {
        self.get_problem_set_by_id_impl(id).await
    }

    async fn create_problem(&self, req: CreateProblemRequest) -> Result<Problem> {
        self.create_problem_impl(req).await
    }

    async fn get_problem_by_id(&self, id: i64) -> Result<Option<Problem>> {
        self.get_problem_by_id_impl(id).await
    }

    // 评分标准模块
    async fn create_rubric(
        &self,
        problem_id: i64,
        version: i64,
        total_points: i64,
        items: Vec<(String, i64)>,
    ) -> Result<Rubric> {
        self.create_rubric_impl(problem_id, version, total_points, items)
            .await
    }

    async fn get_rubric_by_id(&self, rubric_id: i64) -> Result<Option<Rubric>> {
        self.get_rubric_by_id_impl(rubric_id).await
    }

    async fn get_active_rubric(&self, problem_id: i64) -> Result<Option<Rubric>> {
        self.get_active_rubric_impl(problem_id).await
    }

    // 提交模块
    async fn create_submission(&self, req: CreateSubmissionRequest) -> Result<Submission> {
        self.create_submission_impl(req).await
    }

    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>> {
        self.get_submission_by_id_impl(submission_id).await
    }

    async fn get_submission_by_problem_and_student(
        &self,
        problem_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        self.get_submission_by_problem_and_student_impl(problem_id, student_id)
            .await
    }

    async fn add_submission_page(
        &self,
        submission_id: i64,
        req: AddSubmissionPageRequest,
    ) -> Result<SubmissionPage> {
        self.add_submission_page_impl(submission_id, req).await
    }

    async fn list_submission_pages(&self, submission_id: i64) -> Result<Vec<SubmissionPage>> {
        self.list_submission_pages_impl(submission_id).await
    }

    async fn mark_submitted(&self, submission_id: i64, submitted_at: i64) -> Result<bool> {
        self.mark_submitted_impl(submission_id, submitted_at).await
    }

    async fn set_final_score(&self, submission_id: i64, score: f64) -> Result<bool> {
        self.set_final_score_impl(submission_id, score).await
    }

    async fn list_draft_submissions_past_due(&self, now: i64) -> Result<Vec<Submission>> {
        self.list_draft_submissions_past_due_impl(now).await
    }

    // 成绩模块
    async fn record_autograde(
        &self,
        req: RecordAutoGradeRequest,
    ) -> Result<(AutoGradeRun, Grade)> {
        self.record_autograde_impl(req).await
    }

    async fn create_professor_grade(&self, req: CreateProfessorGradeRequest) -> Result<Grade> {
        self.create_professor_grade_impl(req).await
    }

    async fn list_grades(&self, submission_id: i64) -> Result<Vec<Grade>> {
        self.list_grades_impl(submission_id).await
    }

    async fn get_best_grade(&self, submission_id: i64) -> Result<Option<Grade>> {
        self.get_best_grade_impl(submission_id).await
    }

    async fn list_autograde_runs(&self, submission_id: i64) -> Result<Vec<AutoGradeRun>> {
        self.list_autograde_runs_impl(submission_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grades::entities::GraderType;
    use crate::models::submissions::entities::SubmissionStatus;
    use serde_json::json;

    async fn memory_storage() -> SeaOrmStorage {
        SeaOrmStorage::new_with_url(":memory:", 1, 5).await.unwrap()
    }

    async fn setup_problem(storage: &SeaOrmStorage) -> Problem {
        let ps = storage
            .create_problem_set(CreateProblemSetRequest {
                title: "PS1".to_string(),
                release_at: None,
                due_at: None,
            })
            .await
            .unwrap();
        storage
            .create_problem(CreateProblemRequest {
                problem_set_id: ps.id,
                title: "P1".to_string(),
                prompt_path: "/tmp/prompt.png".to_string(),
                max_score: 10,
                sort_order: 1,
            })
            .await
            .unwrap()
    }

    async fn setup_submission(storage: &SeaOrmStorage, problem_id: i64) -> Submission {
        storage
            .create_submission(CreateSubmissionRequest {
                problem_id,
                student_id: 42,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_build_database_url() {
        assert_eq!(
            SeaOrmStorage::build_database_url(":memory:").unwrap(),
            "sqlite://:memory:?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("data.db").unwrap(),
            "sqlite://data.db?mode=rwc"
        );
        assert!(SeaOrmStorage::build_database_url("redis://x").is_err());
    }

    #[tokio::test]
    async fn test_create_problem_rejects_nonpositive_max_score() {
        let storage = memory_storage().await;
        let ps = storage
            .create_problem_set(CreateProblemSetRequest {
                title: "PS1".to_string(),
                release_at: None,
                due_at: None,
            })
            .await
            .unwrap();
        let err = storage
            .create_problem(CreateProblemRequest {
                problem_set_id: ps.id,
                title: "P1".to_string(),
                prompt_path: "/tmp/prompt.png".to_string(),
                max_score: 0,
                sort_order: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), AutoGradeError::validation("").code());
    }

    #[tokio::test]
    async fn test_rubric_write_is_all_or_nothing() {
        let storage = memory_storage().await;
        let problem = setup_problem(&storage).await;

        let err = storage
            .create_rubric(problem.id, 1, 10, vec![])
            .await
            .unwrap_err();
        assert_eq!(err.code(), AutoGradeError::validation("").code());
        // 失败后不能观察到任何评分标准
        assert!(storage.get_active_rubric(problem.id).await.unwrap().is_none());

        let rubric = storage
            .create_rubric(
                problem.id,
                1,
                10,
                vec![("Setup".to_string(), 4), ("Answer".to_string(), 6)],
            )
            .await
            .unwrap();
        assert_eq!(rubric.items.len(), 2);
        assert_eq!(rubric.items[0].sort_order, 1);
    }

    #[tokio::test]
    async fn test_active_rubric_is_highest_version() {
        let storage = memory_storage().await;
        let problem = setup_problem(&storage).await;

        let v1 = storage
            .create_rubric(problem.id, 1, 10, vec![("A".to_string(), 10)])
            .await
            .unwrap();
        let v2 = storage
            .create_rubric(problem.id, 2, 10, vec![("B".to_string(), 10)])
            .await
            .unwrap();

        let active = storage.get_active_rubric(problem.id).await.unwrap().unwrap();
        assert_eq!(active.id, v2.id);
        assert_ne!(active.id, v1.id);
        assert_eq!(active.version, 2);
    }

    #[tokio::test]
    async fn test_submission_unique_per_problem_and_student() {
        let storage = memory_storage().await;
        let problem = setup_problem(&storage).await;
        setup_submission(&storage, problem.id).await;

        let dup = storage
            .create_submission(CreateSubmissionRequest {
                problem_id: problem.id,
                student_id: 42,
            })
            .await;
        assert!(dup.is_err());

        let found = storage
            .get_submission_by_problem_and_student(problem.id, 42)
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_pages_listed_in_page_order() {
        let storage = memory_storage().await;
        let problem = setup_problem(&storage).await;
        let submission = setup_submission(&storage, problem.id).await;

        for page_number in [2, 1, 3] {
            storage
                .add_submission_page(
                    submission.id,
                    AddSubmissionPageRequest {
                        page_number,
                        file_path: format!("/tmp/page{page_number}.png"),
                        mime_type: "image/png".to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let pages = storage.list_submission_pages(submission.id).await.unwrap();
        assert_eq!(
            pages.iter().map(|p| p.page_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_record_autograde_updates_submission() {
        let storage = memory_storage().await;
        let problem = setup_problem(&storage).await;
        let submission = setup_submission(&storage, problem.id).await;
        storage.mark_submitted(submission.id, 1_700_000_000).await.unwrap();

        let (run, grade) = storage
            .record_autograde(RecordAutoGradeRequest {
                submission_id: submission.id,
                rubric_id: None,
                model: "gpt-4o-mini".to_string(),
                raw_output: json!({"raw_text": "{}", "parsed": {}}),
                score: 7.5,
                feedback: "good work".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(run.submission_id, submission.id);
        assert_eq!(grade.grader_type, GraderType::Auto);
        assert_eq!(grade.score, 7.5);

        let refreshed = storage
            .get_submission_by_id(submission.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.status, SubmissionStatus::Graded);
        assert_eq!(refreshed.final_score, Some(7.5));
    }

    #[tokio::test]
    async fn test_best_grade_ordering() {
        let storage = memory_storage().await;
        let problem = setup_problem(&storage).await;
        let submission = setup_submission(&storage, problem.id).await;
        storage.mark_submitted(submission.id, 1_700_000_000).await.unwrap();

        for score in [7.0, 9.0, 5.0] {
            storage
                .create_professor_grade(CreateProfessorGradeRequest {
                    submission_id: submission.id,
                    rubric_id: None,
                    score,
                    feedback: String::new(),
                    grader_id: 7,
                })
                .await
                .unwrap();
        }

        let best = storage.get_best_grade(submission.id).await.unwrap().unwrap();
        assert_eq!(best.score, 9.0);
        assert_eq!(storage.list_grades(submission.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_draft_submissions_past_due() {
        let storage = memory_storage().await;
        let now = 1_700_000_000;
        let ps = storage
            .create_problem_set(CreateProblemSetRequest {
                title: "PS1".to_string(),
                release_at: None,
                due_at: chrono::DateTime::from_timestamp(now - 3600, 0),
            })
            .await
            .unwrap();
        let problem = storage
            .create_problem(CreateProblemRequest {
                problem_set_id: ps.id,
                title: "P1".to_string(),
                prompt_path: "/tmp/prompt.png".to_string(),
                max_score: 10,
                sort_order: 1,
            })
            .await
            .unwrap();
        let overdue = setup_submission(&storage, problem.id).await;

        let drafts = storage.list_draft_submissions_past_due(now).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, overdue.id);

        // 定稿后不再出现在清扫列表里
        storage.mark_submitted(overdue.id, now).await.unwrap();
        assert!(storage
            .list_draft_submissions_past_due(now)
            .await
            .unwrap()
            .is_empty());
    }
}
