//! 预导入模块，方便使用

pub use super::autograde_runs::{
    ActiveModel as AutoGradeRunActiveModel, Entity as AutoGradeRuns, Model as AutoGradeRunModel,
};
pub use super::grades::{ActiveModel as GradeActiveModel, Entity as Grades, Model as GradeModel};
pub use super::problem_sets::{
    ActiveModel as ProblemSetActiveModel, Entity as ProblemSets, Model as ProblemSetModel,
};
pub use super::problems::{
    ActiveModel as ProblemActiveModel, Entity as Problems, Model as ProblemModel,
};
pub use super::rubric_items::{
    ActiveModel as RubricItemActiveModel, Entity as RubricItems, Model as RubricItemModel,
};
pub use super::rubrics::{
    ActiveModel as RubricActiveModel, Entity as Rubrics, Model as RubricModel,
};
pub use super::submission_files::{
    ActiveModel as SubmissionFileActiveModel, Entity as SubmissionFiles,
    Model as SubmissionFileModel,
};
pub use super::submissions::{
    ActiveModel as SubmissionActiveModel, Entity as Submissions, Model as SubmissionModel,
};
