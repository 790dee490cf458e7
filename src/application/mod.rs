// Application layer - Services, scheduler and boundary traits
pub mod alert_evaluator;
pub mod change_detector;
pub mod line_data_repository;
pub mod publisher;
pub mod scheduler;
pub mod snapshot_service;
