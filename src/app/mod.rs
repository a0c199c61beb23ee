pub mod locks;
pub mod runner;
