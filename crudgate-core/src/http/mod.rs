//! HTTP surface built on hyper
//!
//! [`CrudServer`] turns model declarations into a [`Router`]; each model is
//! served by a [`CrudHttpHandler`] under its base path. Errors use the
//! `{"error": code, "message": detail}` body shape.

pub mod error;
mod handler;
pub mod response;
mod server;

pub use handler::{CrudHttpHandler, ModelHandler, Req};
pub use response::{json_response, Resp, RespBody};
pub use server::{CrudServer, Router};
