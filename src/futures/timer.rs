#[cfg(feature = "tokio-hrtime")]
pub use tokio_hrtime::{Sleep, sleep};

#[cfg(not(feature = "tokio-hrtime"))]
pub use tokio::time::{Instant, Sleep, sleep};
