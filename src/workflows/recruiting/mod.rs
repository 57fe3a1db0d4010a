pub mod applications;
pub mod cv;
