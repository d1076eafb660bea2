//! Field validation and sanitization for submitted form values.
//!
//! Email rules accept most printable local parts and are
//! strict about the domain: at least two dot-separated labels made of ASCII
//! letters, digits and hyphens, none of them starting or ending with a hyphen.

const LOCAL_PART_SYMBOLS: &str = "!#$%&'*+/=?^_`{|}~.-";
const TRIMMED: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || LOCAL_PART_SYMBOLS.contains(c)
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Check that `email` looks like a deliverable address
pub fn is_email(email: &str) -> bool {
    if email.len() < 6 {
        return false;
    }

    // The '@' may not be the first character
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }

    if !local.chars().all(is_local_char) {
        return false;
    }

    if domain.contains("..") {
        return false;
    }
    if domain.trim_matches(|c| TRIMMED.contains(&c) || c == '.') != domain {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    labels.iter().all(|label| {
        label.trim_matches(|c| TRIMMED.contains(&c) || c == '-') == *label
            && !label.is_empty()
            && label.chars().all(is_label_char)
    })
}

/// Strip characters that cannot appear in an address.
///
/// Returns an empty string when nothing address-shaped survives.
/// Drop every run of two or more consecutive dots
fn remove_dot_runs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '.' && chars.peek() == Some(&'.') {
            while chars.peek() == Some(&'.') {
                chars.next();
            }
            continue;
        }
        out.push(c);
    }

    out
}

pub fn sanitize_email(email: &str) -> String {
    let email = email.trim();
    if email.len() < 6 {
        return String::new();
    }

    let Some((local, domain)) = email.split_once('@') else {
        return String::new();
    };
    if local.is_empty() {
        return String::new();
    }

    let local: String = local.chars().filter(|c| is_local_char(*c)).collect();
    if local.is_empty() {
        return String::new();
    }

    let domain = remove_dot_runs(domain);
    let domain = domain.trim_matches(|c| TRIMMED.contains(&c) || c == '.');

    let labels: Vec<String> = domain
        .split('.')
        .map(|label| {
            label
                .trim_matches(|c| TRIMMED.contains(&c) || c == '-')
                .chars()
                .filter(|c| is_label_char(*c))
                .collect::<String>()
        })
        .filter(|label| !label.is_empty())
        .collect();

    if labels.len() < 2 {
        return String::new();
    }

    format!("{}@{}", local, labels.join("."))
}

/// Clean a free-text field: drop markup, collapse whitespace, trim, and
/// remove percent-encoded octets.
pub fn sanitize_text_field(value: &str) -> String {
    let stripped = strip_tags(value);
    let mut collapsed = collapse_whitespace(&stripped);

    let without_octets = remove_octets(&collapsed);
    if without_octets != collapsed {
        collapsed = collapse_whitespace(&without_octets);
    }

    collapsed
}

fn strip_tags(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }

        // A lone '<' (not opening a tag) is kept as an entity
        let opens_tag = matches!(
            chars.peek(),
            Some(n) if n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')
        );
        if !opens_tag {
            out.push_str("&lt;");
            continue;
        }

        // Skip to the end of the tag; an unterminated tag swallows the rest
        for n in chars.by_ref() {
            if n == '>' {
                break;
            }
        }
    }

    out
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn remove_octets(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    // Only ASCII bytes were removed, so the remainder is still valid UTF-8
    String::from_utf8(out).unwrap_or_default()
}
