pub mod board_column;
pub mod project;
pub mod project_member;
pub mod task;
pub mod task_dependency;
pub mod user;
