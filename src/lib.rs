#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod clients;
pub mod config;
pub mod dataset;
pub mod observability;
pub mod pipeline;
pub mod util;
