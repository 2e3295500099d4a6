//! Test utilities shared by the trackfetch crates.

pub mod display;

#[doc(hidden)]
pub use tokio;

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

/// Generate a random track id, to keep tests independent of each other.
pub fn random_track_id() -> trackfetch_api::TrackId {
    use rand::Rng;
    trackfetch_api::TrackId::new(rand::thread_rng().gen_range(0..u32::MAX))
}

/// Run a block repeatedly until it breaks out of the loop, panicking if
/// that does not happen within the timeout.
///
/// ```ignore
/// iter_check!(1000, 10, {
///     if done() {
///         break;
///     }
/// });
/// ```
///
/// The timeout defaults to 5 s and the wait between checks to 10 ms.
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:expr, $sleep_ms:expr, $code:block) => {
        $crate::tokio::time::timeout(
            ::std::time::Duration::from_millis($timeout_ms),
            async {
                loop {
                    $code
                    $crate::tokio::time::sleep(
                        ::std::time::Duration::from_millis($sleep_ms),
                    )
                    .await;
                }
            },
        )
        .await
        .expect("iter_check timed out")
    };
    ($timeout_ms:expr, $code:block) => {
        $crate::iter_check!($timeout_ms, 10, $code)
    };
    ($code:block) => {
        $crate::iter_check!(5000, 10, $code)
    };
}
