//! 랜덤 코드 생성 모듈.

use rand::Rng;

/// Characters allowed in acknowledgement codes.
const ACK_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of random characters after the `ACK-` prefix.
pub const ACK_CODE_LEN: usize = 6;

/// Prefix of every acknowledgement code.
pub const ACK_CODE_PREFIX: &str = "ACK-";

/// Generates a random string of uppercase letters and digits.
#[must_use]
pub fn gen_upper_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ACK_CODE_CHARSET[rng.gen_range(0..ACK_CODE_CHARSET.len())]))
        .collect()
}

/// Generates the code the support team quotes back to acknowledge a broker restart.
#[must_use]
pub fn gen_ack_code() -> String {
    format!("{ACK_CODE_PREFIX}{}", gen_upper_code(ACK_CODE_LEN))
}
