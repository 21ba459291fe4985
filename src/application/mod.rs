//! Application services layer.

pub mod accounts;
pub mod blog;
pub mod catalog;
pub mod comments;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod posts;
pub mod repos;
