pub mod access;
pub mod column;
pub mod config;
pub mod dependency;
pub mod project;
pub mod task;
pub mod user;
mod validation;

#[cfg(test)]
mod testing;
