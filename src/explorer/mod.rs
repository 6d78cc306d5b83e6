pub mod exploration;
pub mod explorer;
pub mod test_generator;
