//! HTTP clients for the CRM tenant

mod client;
pub mod proxy;
pub mod rest;

pub use client::{build_http_client, log_exchange};
pub use proxy::{
    HttpProxyTransport, ProxyConfig, ProxyContactClient, ProxyTransport, GET_CONTACT_ENTITY_PATH,
};
pub use rest::{contact_url, RestContactClient};
