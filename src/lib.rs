//! Pages Pipeline - a queue-driven service that generates static sites,
//! publishes them to GitHub Pages, and reports results to a callback.
//!
//! Submissions arrive over HTTP ([`server`]), are queued and run one at a time
//! ([`worker`]) through generation ([`generate`]), publishing ([`publish`])
//! and result notification ([`notify`]).

pub mod attachments;
pub mod config;
pub mod generate;
pub mod http;
pub mod liveness;
pub mod notify;
pub mod publish;
pub mod retry;
pub mod server;
pub mod types;
pub mod worker;

#[cfg(test)]
mod test_utils;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
