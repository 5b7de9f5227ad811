//! Step descriptor and literal argument parsing
//!
//! Turns one configured pipeline line such as
//! `apk_signer.ApkSigner.verify_signed('out.apk', strict=true)` into a
//! [`StepDescriptor`](apkforge_core::StepDescriptor) plus parsed
//! [`CallArgs`](apkforge_core::CallArgs). The argument grammar is
//! literal-only: strings, numbers, booleans, null, lists and
//! string-keyed maps. Names, arithmetic and calls are rejected.

pub mod descriptor;
pub mod error;
pub mod literal;

pub use descriptor::parse_descriptor;
pub use error::{ParseError, Result};
pub use literal::parse_call_args;
