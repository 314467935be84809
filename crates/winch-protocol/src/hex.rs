//! 十六进制文本工具
//!
//! 用于命令行/交互模式下输入输出原始帧，格式为空格分隔的十六进制字节，
//! 例如 `"94 00 00 A0 C1 D0 07 00"`。

use crate::Frame;
use crate::constants::FRAME_LEN;
use thiserror::Error;

/// 十六进制文本解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("Expected exactly {expected} bytes, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("Invalid hex byte '{token}'")]
    InvalidByte { token: String },
}

/// 解析任意个数的十六进制字节
///
/// 每个 token 为 1-2 位十六进制数字，可带 `0x` 前缀。
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, HexError> {
    text.split_whitespace()
        .map(|token| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            if digits.is_empty() || digits.len() > 2 {
                return Err(HexError::InvalidByte {
                    token: token.to_string(),
                });
            }
            u8::from_str_radix(digits, 16).map_err(|_| HexError::InvalidByte {
                token: token.to_string(),
            })
        })
        .collect()
}

/// 解析恰好 8 个十六进制字节为一帧
///
/// # 错误
/// - `HexError::WrongCount`: 字节数不是 8
/// - `HexError::InvalidByte`: 含非法 token
pub fn parse_hex_frame(text: &str) -> Result<Frame, HexError> {
    let bytes = parse_hex_bytes(text)?;
    let array: [u8; FRAME_LEN] = bytes.as_slice().try_into().map_err(|_| HexError::WrongCount {
        expected: FRAME_LEN,
        actual: bytes.len(),
    })?;
    Ok(Frame::new(array))
}

/// 格式化为大写、空格分隔的十六进制文本
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_frame() {
        let frame = parse_hex_frame("94 00 00 A0 C1 D0 07 00").unwrap();
        assert_eq!(
            frame.into_bytes(),
            [0x94, 0x00, 0x00, 0xA0, 0xC1, 0xD0, 0x07, 0x00]
        );
    }

    #[test]
    fn test_parse_hex_frame_lenient_whitespace_and_case() {
        let frame = parse_hex_frame("  b4 13 0 0 0x00 0 0 0 ").unwrap();
        assert_eq!(frame.into_bytes(), [0xB4, 0x13, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_hex_frame_wrong_count() {
        assert_eq!(
            parse_hex_frame("91 00 00"),
            Err(HexError::WrongCount {
                expected: 8,
                actual: 3
            })
        );
    }

    #[test]
    fn test_parse_hex_frame_invalid_token() {
        assert_eq!(
            parse_hex_frame("91 00 00 00 00 00 00 ZZ"),
            Err(HexError::InvalidByte {
                token: "ZZ".to_string()
            })
        );
        assert!(matches!(
            parse_hex_frame("910 00 00 00 00 00 00 00"),
            Err(HexError::InvalidByte { .. })
        ));
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x0A, 0xFF, 0x00]), "0A FF 00");
        assert_eq!(format_hex(&[]), "");
    }
}
