#![allow(dead_code, non_snake_case, non_upper_case_globals)]

pub mod error;
pub mod utils;
pub mod basis;
pub mod device;
pub mod pulse;
pub mod schedule;
pub mod hamiltonian;
pub mod evolve;
pub mod measure;
pub mod fit;
pub mod experiment;
pub mod config;

pub use error::{ Error, Result };
