mod sgs;

pub use sgs::{DEFAULT_SERIES, RateError, RateObservation, SgsClient};
