//! Client identity decoration.
//!
//! Brokers reject duplicate client IDs, so a process can opt in to
//! decorating its configured ID with the local hostname. On macOS (several
//! developers sharing "local" style hostnames, or one developer running
//! multiple instances) a random numeric suffix is added on top.

use rand::Rng;

/// Decorate a client ID with the sanitized local hostname.
///
/// If the hostname cannot be determined, the literal `"<error>"` is
/// sanitized and used in its place.
pub fn decorate_client_id(client_id: &str) -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<error>".to_string());
    decorate_with_hostname(client_id, &host)
}

fn decorate_with_hostname(client_id: &str, host: &str) -> String {
    let mut decorated = sanitize_hostname(host);
    if cfg!(target_os = "macos") {
        decorated.push_str(&rand::thread_rng().gen_range(0..100u32).to_string());
    }
    format!("{client_id}-{decorated}")
}

/// Replace every run of non-alphanumeric characters with a single `-`.
fn sanitize_hostname(host: &str) -> String {
    let mut sanitized = String::with_capacity(host.len());
    for c in host.chars() {
        if c.is_ascii_alphanumeric() {
            sanitized.push(c);
        } else if !sanitized.ends_with('-') {
            sanitized.push('-');
        }
    }
    sanitized
}
