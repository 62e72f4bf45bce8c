//! Terminal exam practice: AI-composed papers, a timed exam session,
//! grading, result history and a mistake bank.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod config;
pub mod engine;
pub mod event;
pub mod exam;
pub mod gateway;
pub mod logging;
pub mod session;
pub mod store;
pub mod ui;
