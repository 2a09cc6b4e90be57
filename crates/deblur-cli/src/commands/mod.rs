pub mod compare;
pub mod config;
pub mod kernel;
pub mod run;
