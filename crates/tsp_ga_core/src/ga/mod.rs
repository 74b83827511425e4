pub mod operators;
pub mod point;
pub mod population;
pub mod tour;
