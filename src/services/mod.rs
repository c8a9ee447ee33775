pub mod export_service;
pub mod job_service;
pub mod job_store;
pub mod memory_store;
pub mod scheduled_tasks;
