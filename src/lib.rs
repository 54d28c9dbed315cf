pub mod alphafold;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod store;
pub mod transport;
pub mod uniprot;
