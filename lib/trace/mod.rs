//! Frames of a trace.

mod call_info;
mod call_kind;

pub use self::call_info::CallInfo;
pub use self::call_kind::CallKind;
