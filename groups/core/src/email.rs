//! E-mail address equivalence.
//!
//! Directory services alias dotted/undotted and differently-cased forms of
//! the same mailbox, so membership lists are never compared with `==`.

/// Returns true if `a` and `b` name the same mailbox:
///
/// - addresses are case-insensitive (`FOO@bar.com == foo@bar.com`);
/// - local parts are dot-insensitive (`foo@bar.com == f.o.o@bar.com`).
///
/// Domains remain dot-sensitive. Addresses without exactly one `@` are only
/// equal when they match case-insensitively.
pub fn equals(a: &str, b: &str) -> bool {
    if fold_eq(a, b) {
        return true;
    }

    let (Some((a_local, a_domain)), Some((b_local, b_domain))) = (split(a), split(b)) else {
        return false;
    };

    fold_eq(a_domain, b_domain) && fold_eq(&undotted(a_local), &undotted(b_local))
}

/// Returns true if any address in `emails` is equivalent to `email`.
pub fn contains<'a>(emails: impl IntoIterator<Item = &'a String>, email: &str) -> bool {
    emails.into_iter().any(|e| equals(e, email))
}

/// Returns a normal form of `email` such that two addresses are [`equals`]
/// exactly when their canonical forms are identical.
pub fn canonical(email: &str) -> String {
    match split(email) {
        Some((local, domain)) => {
            format!("{}@{}", undotted(local).to_lowercase(), domain.to_lowercase())
        }
        None => email.to_lowercase(),
    }
}

fn split(email: &str) -> Option<(&str, &str)> {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => Some((local, domain)),
        _ => None,
    }
}

fn fold_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn undotted(local: &str) -> String {
    local.chars().filter(|c| *c != '.').collect()
}
