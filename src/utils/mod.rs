//! 유틸리티 모듈.

pub mod jwt;
pub mod password;
pub mod rand;
pub mod roster_csv;
pub mod timesheet;

pub use jwt::{gen_token, parse_token, Claims};
pub use password::{hash_password, verify_password};
pub use rand::gen_ack_code;
pub use roster_csv::{file_hash, parse_roster, ParsedRoster, RowError};
