//! DNS MX resolution.
//!
//! [`check_mx`] performs a standalone lookup with the system resolver and
//! returns a [`MxStatus`]. The SMTP prober uses the same lookup path through
//! the crate-internal [`resolver::LookupMx`] seam, which tests replace with a
//! stub.

mod error;
pub(crate) mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::check_mx;
pub use types::{MxRecord, MxStatus};
