pub mod compose;
pub mod rules;
