use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建题集表
        manager
            .create_table(
                Table::create()
                    .table(ProblemSets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProblemSets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProblemSets::Title).string().not_null())
                    .col(ColumnDef::new(ProblemSets::ReleaseAt).big_integer().null())
                    .col(ColumnDef::new(ProblemSets::DueAt).big_integer().null())
                    .col(
                        ColumnDef::new(ProblemSets::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建题目表
        manager
            .create_table(
                Table::create()
                    .table(Problems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Problems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Problems::ProblemSetId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Problems::Title).string().not_null())
                    .col(ColumnDef::new(Problems::PromptPath).string().not_null())
                    .col(ColumnDef::new(Problems::MaxScore).big_integer().not_null())
                    .col(ColumnDef::new(Problems::SortOrder).big_integer().not_null())
                    .col(ColumnDef::new(Problems::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Problems::Table, Problems::ProblemSetId)
                            .to(ProblemSets::Table, ProblemSets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评分标准表（按版本追加，不可变）
        manager
            .create_table(
                Table::create()
                    .table(Rubrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rubrics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rubrics::ProblemId).big_integer().not_null())
                    .col(ColumnDef::new(Rubrics::Version).big_integer().not_null())
                    .col(
                        ColumnDef::new(Rubrics::TotalPoints)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Rubrics::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Rubrics::Table, Rubrics::ProblemId)
                            .to(Problems::Table, Problems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一题目下版本号唯一
        manager
            .create_index(
                Index::create()
                    .name("uniq_rubric_version")
                    .table(Rubrics::Table)
                    .col(Rubrics::ProblemId)
                    .col(Rubrics::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建评分项表
        manager
            .create_table(
                Table::create()
                    .table(RubricItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RubricItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RubricItems::RubricId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RubricItems::Label).string().not_null())
                    .col(ColumnDef::new(RubricItems::Points).big_integer().not_null())
                    .col(
                        ColumnDef::new(RubricItems::SortOrder)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RubricItems::Table, RubricItems::RubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建提交表
        manager
            .create_table(
                Table::create()
                    .table(Submissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Submissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Submissions::ProblemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Submissions::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Submissions::Status).string().not_null())
                    .col(ColumnDef::new(Submissions::FinalScore).double().null())
                    .col(ColumnDef::new(Submissions::SubmittedAt).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Submissions::Table, Submissions::ProblemId)
                            .to(Problems::Table, Problems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个学生每道题只有一份提交
        manager
            .create_index(
                Index::create()
                    .name("uniq_submission")
                    .table(Submissions::Table)
                    .col(Submissions::ProblemId)
                    .col(Submissions::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建提交页文件表
        manager
            .create_table(
                Table::create()
                    .table(SubmissionFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubmissionFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::PageNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::FilePath)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubmissionFiles::MimeType)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SubmissionFiles::Table, SubmissionFiles::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建自动评分运行记录表（仅追加的审计记录）
        manager
            .create_table(
                Table::create()
                    .table(AutogradeRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutogradeRuns::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AutogradeRuns::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AutogradeRuns::RubricId).big_integer().null())
                    .col(ColumnDef::new(AutogradeRuns::Model).string().not_null())
                    .col(
                        ColumnDef::new(AutogradeRuns::RawOutputJson)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AutogradeRuns::Score).double().not_null())
                    .col(
                        ColumnDef::new(AutogradeRuns::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AutogradeRuns::Table, AutogradeRuns::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AutogradeRuns::Table, AutogradeRuns::RubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建成绩表（历史记录，当前成绩由策略派生）
        manager
            .create_table(
                Table::create()
                    .table(Grades::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Grades::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Grades::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Grades::RubricId).big_integer().null())
                    .col(ColumnDef::new(Grades::Score).double().not_null())
                    .col(ColumnDef::new(Grades::Feedback).text().not_null())
                    .col(ColumnDef::new(Grades::GraderType).string().not_null())
                    .col(ColumnDef::new(Grades::GraderId).big_integer().null())
                    .col(
                        ColumnDef::new(Grades::FinalizedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Grades::Table, Grades::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Grades::Table, Grades::RubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Grades::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AutogradeRuns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubmissionFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Submissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RubricItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rubrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Problems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProblemSets::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ProblemSets {
    Table,
    Id,
    Title,
    ReleaseAt,
    DueAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Problems {
    Table,
    Id,
    ProblemSetId,
    Title,
    PromptPath,
    MaxScore,
    SortOrder,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Rubrics {
    Table,
    Id,
    ProblemId,
    Version,
    TotalPoints,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RubricItems {
    Table,
    Id,
    RubricId,
    Label,
    Points,
    SortOrder,
}

#[derive(DeriveIden)]
enum Submissions {
    Table,
    Id,
    ProblemId,
    StudentId,
    Status,
    FinalScore,
    SubmittedAt,
}

#[derive(DeriveIden)]
enum SubmissionFiles {
    Table,
    Id,
    SubmissionId,
    PageNumber,
    FilePath,
    MimeType,
}

#[derive(DeriveIden)]
enum AutogradeRuns {
    Table,
    Id,
    SubmissionId,
    RubricId,
    Model,
    RawOutputJson,
    Score,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Grades {
    Table,
    Id,
    SubmissionId,
    RubricId,
    Score,
    Feedback,
    GraderType,
    GraderId,
    FinalizedAt,
}
