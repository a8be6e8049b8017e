pub mod change;
pub mod coordinator;
pub mod field_path;
pub mod profile;
pub mod queue;
pub mod resolver;
pub mod sevis;
