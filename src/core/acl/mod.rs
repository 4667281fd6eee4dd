//! Access facts and the compiler that derives them
//!
//! A fact (`AccessControlRule`) says a principal may perform a permission on a
//! resource, and carries the grant chain that proves it.

mod compiler;
mod grant;
mod rule;

pub use compiler::AclCompiler;
pub use grant::{Grant, GrantChain, GrantKind};
pub use rule::{AccessControlRule, RuleId};
