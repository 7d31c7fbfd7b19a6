//! Error handling foundation for mailflow.
//!
//! Each crate defines its own domain error enums. Layers that cross an
//! external boundary (persistence, HTTP) wrap them in a rootcause `Report`
//! so context can be attached as the error propagates.

use rootcause::prelude::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    fn fails() -> Result<(), Boom> {
        Err(Boom)?;
        Ok(())
    }

    #[test]
    fn ok_passes_through() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[test]
    fn domain_error_converts_into_report() {
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
