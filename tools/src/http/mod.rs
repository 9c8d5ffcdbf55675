pub mod http_server;

pub use http_server::{HttpServer, HttpServerConfig};
