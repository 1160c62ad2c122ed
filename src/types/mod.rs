pub mod grid;
pub mod month;
pub mod reading_set;
pub mod variable;
