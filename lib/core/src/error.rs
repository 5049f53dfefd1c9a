//! Error handling foundation for taskweave.
//!
//! Only the `Result` alias lives here. Each crate defines its own error enums
//! and layers context onto them with rootcause's `.context()` as they move up
//! from graph operations to whole-run coordination.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_carries_typed_context() {
        #[derive(Debug)]
        struct Boom;

        impl std::fmt::Display for Boom {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "boom")
            }
        }

        impl std::error::Error for Boom {}

        let failed: Result<(), Boom> = Err(Boom.into());
        let err = failed.expect_err("should be an error");
        assert!(err.to_string().contains("boom"));
    }
}
