pub mod clerk_http;
pub mod fixture;
