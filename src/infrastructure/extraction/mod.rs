mod http;

pub use http::HttpExtractionClient;
