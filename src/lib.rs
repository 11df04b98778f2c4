pub mod config;
pub mod driver;
pub mod error;
pub mod gaussian;
pub mod logging;
pub mod parallel;
pub mod progress;
pub mod sampler;
pub mod tempering;

/// dimensional analysis types
pub type Probability = f64;
pub type LogDensity = f64;

pub use error::McmcError;

/// default bisection tolerance used by the ladder adaptor
pub const BISECTION_TOLERANCE: f64 = 1e-8;
/// maximum bisection iterations before giving up and reporting NumericFailure
pub const BISECTION_MAX_ITERS: usize = 200;

/// initialize logging once per process; safe to call multiple times (including from tests)
pub fn init() {
    logging::init();
}
