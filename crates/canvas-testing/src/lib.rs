//! Testing utilities and harness for Canvas-RS

pub mod fake;
pub mod rule;

pub use fake::*;
pub use rule::*;

pub mod prelude {
    pub use crate::fake::*;
    pub use crate::rule::*;
}
