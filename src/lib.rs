pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod favorites;
pub mod gateway;
pub mod hotels;
pub mod models;
pub mod notice;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use app::App;
pub use config::Config;
pub use error::{HotelError, HotelResult};
