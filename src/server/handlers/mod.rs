pub mod config;
pub mod documents;
pub mod health;
pub mod research;
pub mod ui;
