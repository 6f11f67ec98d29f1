//! Test utilities to help with testing flightdeck.

#![deny(missing_docs)]

pub mod collab;
pub mod transport;

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Repeatedly run a code block until it `break`s out of the loop, or fail
/// the test once the timeout elapses.
///
/// - `iter_check!(timeout_ms, sleep_ms, { ... })`
/// - `iter_check!(timeout_ms, { ... })` sleeps 10ms between iterations
/// - `iter_check!({ ... })` times out after one second
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:literal, $sleep_ms:literal, $code:block) => {
        tokio::time::timeout(
            std::time::Duration::from_millis($timeout_ms),
            async {
                loop {
                    $code
                    tokio::time::sleep(std::time::Duration::from_millis(
                        $sleep_ms,
                    ))
                    .await;
                }
            },
        )
        .await
        .expect("iter_check timed out");
    };
    ($timeout_ms:literal, $code:block) => {
        $crate::iter_check!($timeout_ms, 10, $code)
    };
    ($code:block) => {
        $crate::iter_check!(1000, $code)
    };
}
