mod database {
    pub mod actions;
    pub mod connect;
    pub mod error;
    pub mod form;
    pub mod media;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod config;
pub mod constants;
pub mod routes;
pub mod state;

pub use authentication::*;
pub use database::*;
