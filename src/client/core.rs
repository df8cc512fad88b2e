// File: src/client/core.rs
// Shared HTTPS client construction (rustls + native roots, HTTP/1).
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

pub type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, String>;

/// Builds a client that speaks HTTPS with the system trust store, and plain
/// HTTP for local endpoints.
pub fn build_https_client() -> HttpsClient {
    let mut root_store = rustls::RootCertStore::empty();
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        log::debug!("Skipping unreadable system certificate: {}", err);
    }
    root_store.add_parsable_certificates(result.certs);
    if root_store.is_empty() {
        log::warn!("No valid system certificates found; HTTPS requests will fail.");
    }

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let https_connector = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .build();

    Client::builder(TokioExecutor::new()).build(https_connector)
}
