pub mod json;
pub mod render;
pub mod walk;
