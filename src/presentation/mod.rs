pub mod accounts;
pub mod blog;
pub mod urls;
pub mod views;
