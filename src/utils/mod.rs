pub mod ip;
pub mod password;
pub mod validation;

use base64::Engine;
use rand::RngExt;

/// 生成 URL 安全的随机令牌（`bytes` 字节熵）
pub fn generate_secure_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill(&mut buf[..]);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secure_token_length_and_uniqueness() {
        let a = generate_secure_token(32);
        let b = generate_secure_token(32);
        // 32 bytes → 43 base64url chars without padding
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }
}
