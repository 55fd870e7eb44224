pub mod application;
pub mod campaign;
pub mod job;
pub mod status;
pub mod student;
pub mod template;
