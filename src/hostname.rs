const MAX_HOSTNAME_LEN: usize = 254;
const MAX_LABEL_LEN: usize = 63;

/// Reports whether `s` looks like a DNS host name.
///
/// Labels are ASCII letters, digits and hyphens, 1-63 bytes each, and may not
/// begin or end with a hyphen. The name needs at least one dot: a bare label
/// such as `localhost` is rejected, as is a single label with a trailing dot
/// (`com.`). Names made only of digits are rejected. The full length may be
/// 254 bytes only when the last byte is the root dot.
pub fn is_valid_hostname(s: &str) -> bool {
    let bytes = s.as_bytes();
    let len = bytes.len();
    if len == 0 || len > MAX_HOSTNAME_LEN || (len == MAX_HOSTNAME_LEN && bytes[len - 1] != b'.') {
        return false;
    }

    let mut last = b'.';
    let mut non_numeric = false;
    let mut label_len = 0usize;
    let mut dots = 0usize;

    for &c in bytes {
        match c {
            b'a'..=b'z' | b'A'..=b'Z' => {
                non_numeric = true;
                label_len += 1;
            }
            b'0'..=b'9' => {
                label_len += 1;
            }
            b'-' => {
                // a label cannot start with a hyphen
                if last == b'.' {
                    return false;
                }
                non_numeric = true;
                label_len += 1;
            }
            b'.' => {
                // nor end with one, nor be empty
                if last == b'.' || last == b'-' {
                    return false;
                }
                if label_len == 0 || label_len > MAX_LABEL_LEN {
                    return false;
                }
                label_len = 0;
                dots += 1;
            }
            _ => return false,
        }
        last = c;
    }

    if last == b'-' || label_len > MAX_LABEL_LEN {
        return false;
    }

    non_numeric && (dots > 1 || (dots > 0 && last != b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_names() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("www.example.com"));
        assert!(is_valid_hostname("example.com."));
        assert!(is_valid_hostname("a-b.example.org"));
        assert!(is_valid_hostname("xn--bcher-kva.example"));
        assert!(is_valid_hostname("1password.com"));
        assert!(is_valid_hostname("EXAMPLE.COM"));
    }

    #[test]
    fn test_rejects_empty_and_single_labels() {
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("localhost"));
        assert!(!is_valid_hostname("com."));
        assert!(!is_valid_hostname("."));
    }

    #[test]
    fn test_rejects_numeric_names() {
        assert!(!is_valid_hostname("12345"));
        assert!(!is_valid_hostname("192.168.1.1"));
        assert!(!is_valid_hostname("10.0.0.1."));
    }

    #[test]
    fn test_rejects_bad_punctuation() {
        assert!(!is_valid_hostname(".example.com"));
        assert!(!is_valid_hostname("example..com"));
        assert!(!is_valid_hostname("-example.com"));
        assert!(!is_valid_hostname("example-.com"));
        assert!(!is_valid_hostname("example.-com"));
        assert!(!is_valid_hostname("example.com-"));
        assert!(!is_valid_hostname("exa_mple.com"));
        assert!(!is_valid_hostname("exa mple.com"));
        assert!(!is_valid_hostname("*.example.com"));
        assert!(!is_valid_hostname("Rcgen self signed cert"));
    }

    #[test]
    fn test_label_length_limit() {
        let ok = format!("{}.com", "a".repeat(63));
        let too_long = format!("{}.com", "a".repeat(64));
        let last_too_long = format!("example.{}", "a".repeat(64));
        assert!(is_valid_hostname(&ok));
        assert!(!is_valid_hostname(&too_long));
        assert!(!is_valid_hostname(&last_too_long));
    }

    #[test]
    fn test_total_length_limit() {
        // 4 labels of 62 + 3 dots = 251, plus ".a." = 254 with a trailing dot
        let label = "a".repeat(62);
        let base = format!("{label}.{label}.{label}.{label}");
        let with_root = format!("{base}.a.");
        assert_eq!(with_root.len(), 254);
        assert!(is_valid_hostname(&with_root));

        let without_root = format!("{base}.ab");
        assert_eq!(without_root.len(), 254);
        assert!(!is_valid_hostname(&without_root));

        for extra in 0..8 {
            let long = format!("{base}.{}", "b".repeat(3 + extra));
            assert!(long.len() > 254);
            assert!(!is_valid_hostname(&long));
        }
    }
}
