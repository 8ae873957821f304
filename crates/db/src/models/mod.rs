#![allow(clippy::useless_conversion)]

pub mod board_column;
pub mod ids;
pub mod ordering;
pub mod project;
pub mod project_member;
pub mod task;
pub mod task_dependency;
pub mod user;
