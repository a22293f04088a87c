pub mod grades;
pub mod problems;
pub mod rubrics;
pub mod submissions;
