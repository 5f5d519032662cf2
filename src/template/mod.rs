//! Template loading module.
//!
//! Templates are read verbatim from a local file or an S3 object and passed
//! to CloudFormation untouched. Their content is never parsed here.

mod digest;
mod local;
mod s3;
mod source;

pub use digest::TemplateHasher;
pub use local::LocalTemplateSource;
pub use s3::S3TemplateSource;
pub use source::{TemplateRef, TemplateSource};
