pub mod line;
pub mod weekly;
