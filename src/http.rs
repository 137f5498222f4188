//! HTTP client helper with native-tls support.
//!
//! The PlantUML transport needs status codes back as values rather than
//! errors, and a bounded round trip, so the agent is built with
//! `http_status_as_error(false)` and a global timeout.

use std::time::Duration;

use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// Create a new HTTP agent configured with native-tls.
///
/// Uses the system's TLS library (Schannel on Windows, OpenSSL on Linux,
/// Security.framework on macOS) and the platform's root certificates.
pub fn agent(timeout: Duration) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .into()
}
