//! Query Validation
//!
//! Checks submitted text before it reaches the classifier.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{QueryValidator, ValidationConfig};
