//! 요청/응답 스키마 모듈.

pub mod handover;
pub mod roster;

pub use handover::*;
pub use roster::*;

/// Returns the trimmed value, or `None` when it is absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
