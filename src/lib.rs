pub mod cli;
pub mod explorer;
pub mod report;
pub mod scenario;
pub mod screen;
pub mod session;
pub mod trace;
