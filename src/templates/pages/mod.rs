pub mod change_queue;
pub mod coordinators;
pub mod dashboard;
pub mod sevis_batches;
pub mod student_application;

pub use change_queue::change_queue_page;
pub use coordinators::{coordinators_page, CoordinatorsVm};
pub use dashboard::dashboard_page;
pub use sevis_batches::sevis_batches_page;
pub use student_application::student_application_page;
