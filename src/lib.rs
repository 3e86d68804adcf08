pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod models;
pub mod password;
pub mod response;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;
pub mod token;
