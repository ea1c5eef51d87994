//! Domain name utilities (RFC 1035 §2.3.1, §3.3)
//!
//! Names are handled in presentation form with a trailing dot marking a
//! fully qualified name. Dots inside a label are escaped as `\.` (mailbox
//! local parts use this), so label splitting here is escape-aware.

/// Maximum presentation length of a name, excluding the root dot.
const MAX_NAME_LENGTH: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LENGTH: usize = 63;

/// Splits a name into its labels, honoring `\.` escapes. The trailing root
/// dot produces no empty label.
pub fn labels(name: &str) -> Vec<&str> {
    let mut labels = Vec::new();
    let bytes = name.as_bytes();
    let mut start = 0;
    let mut escaped = false;

    for (i, b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if *b == b'\\' {
            escaped = true;
        } else if *b == b'.' {
            if i > start {
                labels.push(&name[start..i]);
            }
            start = i + 1;
        }
    }

    if start < name.len() {
        labels.push(&name[start..]);
    }

    labels
}

/// Returns the name with its leftmost label removed, or `None` for the root
/// and for single-label relative names.
pub fn parent(name: &str) -> Option<&str> {
    let bytes = name.as_bytes();
    let mut escaped = false;

    for (i, b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if *b == b'\\' {
            escaped = true;
        } else if *b == b'.' {
            let rest = &name[i + 1..];
            return if rest.is_empty() { None } else { Some(rest) };
        }
    }

    None
}

fn is_fqdn(name: &str) -> bool {
    name == "." || (name.ends_with('.') && !name.ends_with("\\."))
}

/// Checks whether `name` parses as a DNS name: at most 253 octets overall,
/// every label 1-63 octets, no empty labels. With `fqdn` set the name must
/// also carry the trailing root dot.
pub fn is_domain(name: &str, fqdn: bool) -> bool {
    if name.is_empty() {
        return false;
    }

    if name == "." {
        return true;
    }

    if fqdn && !is_fqdn(name) {
        return false;
    }

    let mut label_octets = 0;
    let mut total_octets = 0;
    let mut escaped = false;

    for b in name.bytes() {
        if escaped {
            escaped = false;
            label_octets += 1;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'.' {
            if label_octets == 0 || label_octets > MAX_LABEL_LENGTH {
                return false;
            }
            total_octets += label_octets + 1;
            label_octets = 0;
        } else {
            label_octets += 1;
        }
    }

    if escaped {
        // dangling escape
        return false;
    }

    if label_octets > 0 {
        if label_octets > MAX_LABEL_LENGTH {
            return false;
        }
        total_octets += label_octets + 1;
    }

    total_octets - 1 <= MAX_NAME_LENGTH
}

/// Checks whether `name` equals `zone` or lies strictly below it. Labels are
/// compared case-insensitively; the root zone contains every name.
pub fn in_zone(zone: &str, name: &str) -> bool {
    let zone_labels = labels(zone);
    let name_labels = labels(name);

    if zone_labels.len() > name_labels.len() {
        return false;
    }

    let offset = name_labels.len() - zone_labels.len();
    zone_labels
        .iter()
        .zip(&name_labels[offset..])
        .all(|(z, n)| z.eq_ignore_ascii_case(n))
}

/// Transfers the case of a query name onto a canonical name. When the
/// lowercased `source` ends with the lowercased `destination` the matching
/// tail of `source` is returned, restoring the spelling the client used;
/// otherwise `destination` is returned unchanged.
pub fn transfer_case(source: &str, destination: &str) -> String {
    let lc_source = source.to_ascii_lowercase();
    let lc_destination = destination.to_ascii_lowercase();

    if !lc_source.ends_with(&lc_destination) {
        return destination.to_string();
    }

    source[source.len() - destination.len()..].to_string()
}

/// Converts a mailbox address to RFC 1035 domain form: dots in the local
/// part are escaped, the `@` becomes a label separator, and the result is
/// fully qualified. `hostmaster@example.com.` → `hostmaster.example.com.`.
pub fn email_to_domain(email: &str) -> String {
    let mut name = match email.split_once('@') {
        Some((local, domain)) => format!("{}.{}", local.replace('.', "\\."), domain),
        None => email.replace('.', "\\."),
    };

    if !is_fqdn(&name) {
        name.push('.');
    }

    name
}
