pub mod cache;
pub mod debounce;
pub mod favorites;
pub mod infinite_scroll;
pub mod models;
pub mod notification;
pub mod query;
pub mod storage;
pub mod store;
pub mod ui;
