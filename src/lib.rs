pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod generate;
pub mod index;
pub mod llm;
pub mod runner;
