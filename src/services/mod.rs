pub mod cache;
pub mod encoding;
pub mod format;
pub mod presenter;
pub mod qa;
pub mod resolver;
pub mod template;
pub mod text_store;
