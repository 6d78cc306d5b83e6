pub mod artifacts;
pub mod console;
pub mod html;
pub mod junit;
pub mod report_model;
