pub mod http;
pub mod local;

pub use http::HttpApi;
pub use local::LocalBackend;
