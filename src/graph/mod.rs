pub mod model;
pub mod traverse;
