pub mod common;
pub mod course;
pub mod lesson;
pub mod media;
pub mod module;
pub mod user;
