//! Process plumbing for the binary.

mod sig_down;

pub use sig_down::{INTERRUPTED_EXIT_CODE, SigDown};
