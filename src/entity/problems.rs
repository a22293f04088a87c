//! 题目实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "problems")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub problem_set_id: i64,
    pub title: String,
    pub prompt_path: String,
    pub max_score: i64,
    pub sort_order: i64,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::problem_sets::Entity",
        from = "Column::ProblemSetId",
        to = "super::problem_sets::Column::Id"
    )]
    ProblemSet,
    #[sea_orm(has_many = "super::rubrics::Entity")]
    Rubrics,
    #[sea_orm(has_many = "super::submissions::Entity")]
    Submissions,
}

impl Related<super::problem_sets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProblemSet.def()
    }
}

impl Related<super::rubrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rubrics.def()
    }
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
