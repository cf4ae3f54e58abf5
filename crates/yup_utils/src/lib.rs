pub mod exit;
pub mod log_assert;
pub mod shutdown;
pub mod timeout_future;

#[doc(hidden)]
pub use tracing as __tracing;
