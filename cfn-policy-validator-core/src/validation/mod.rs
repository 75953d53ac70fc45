//! Policy validation against IAM Access Analyzer and result reporting.

pub mod report;
pub mod retry;
mod validator;

pub use report::{format_location, render_finding, to_pretty_json, write_results_file};
pub use retry::RetryPolicy;
pub use validator::PolicyValidator;
