/// Decode text bytes, falling back to lossy UTF-8, trimmed.
pub fn extract_txt(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    };
    // Windows line endings would break paragraph detection.
    text.replace("\r\n", "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_utf8_text() {
        let content = "Ünïcödé text with émojis 🎉".as_bytes();
        assert_eq!(extract_txt(content), "Ünïcödé text with émojis 🎉");
    }

    #[test]
    fn invalid_utf8_is_lossy() {
        let text = extract_txt(&[b'o', b'k', 0xff, b'!']);
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
    }

    #[test]
    fn normalises_line_endings_and_trims() {
        assert_eq!(extract_txt(b"  \r\nHello\r\n\r\nWorld  \n"), "Hello\n\nWorld");
    }
}
