// src/blockchain/mod.rs

pub mod address;
pub mod client;
pub mod models;
pub mod services;
pub mod transport;

pub use address::Address;
pub use client::ChainClient;
