pub mod event;
pub mod provider;
pub mod request;
pub mod vehicle;
