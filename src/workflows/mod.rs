pub mod recruiting;
