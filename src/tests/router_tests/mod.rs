mod change_queue_tests;
mod coordinators_tests;
mod dashboard_tests;
mod fallback_tests;
mod sevis_batches_tests;
mod student_application_tests;
