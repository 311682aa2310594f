//! # Access Policy
//!
//! Decides, from a request path and the caller's access level alone, whether
//! a request may proceed. No I/O: the web middleware feeds it the path and
//! the session's role flags and turns the decision into a response.
//!
//! ## Rules (evaluated in order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  path = request path with trailing '/' stripped                         │
//! │                                                                         │
//! │  1. ""  /login  /logout          ──► Allow (anyone)                     │
//! │     /static /admin /media (+ /…) ──► Allow (anyone)                     │
//! │                                                                         │
//! │  2. caller is anonymous          ──► RedirectToLogin                    │
//! │                                                                         │
//! │  3. /inventory /invoice /reports (exact or + "/…")                      │
//! │     caller not staff or admin    ──► RedirectWithMessage("/billing")    │
//! │                                                                         │
//! │  4. otherwise                    ──► Allow                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-endpoint role checks (e.g. admin-only product writes) are layered on
//! top by the handlers via [`AccessLevel::satisfies`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Exact paths anyone may request.
pub const PUBLIC_PATHS: [&str; 3] = ["", "/login", "/logout"];

/// Path prefixes anyone may request.
pub const PUBLIC_PREFIXES: [&str; 3] = ["/static", "/admin", "/media"];

/// Path prefixes reserved for staff and administrators.
pub const STAFF_PREFIXES: [&str; 3] = ["/inventory", "/invoice", "/reports"];

/// Where callers without staff rights are sent.
pub const BILLING_PATH: &str = "/billing";

/// Where anonymous callers are sent.
pub const LOGIN_PATH: &str = "/login";

/// Message shown after a staff-only redirect.
pub const STAFF_ONLY_MESSAGE: &str = "This page is for administrators only.";

// =============================================================================
// Access Level
// =============================================================================

/// Who the caller is, from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Anonymous,
    Authenticated,
    Staff,
    Admin,
}

impl AccessLevel {
    /// Level of a logged-in user from their role flags.
    pub fn from_flags(is_staff: bool, is_admin: bool) -> Self {
        if is_admin {
            AccessLevel::Admin
        } else if is_staff {
            AccessLevel::Staff
        } else {
            AccessLevel::Authenticated
        }
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        *self >= AccessLevel::Authenticated
    }

    #[inline]
    pub fn is_staff_or_admin(&self) -> bool {
        *self >= AccessLevel::Staff
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        *self == AccessLevel::Admin
    }

    /// Checks this level against a requirement.
    pub fn satisfies(&self, requirement: Requirement) -> bool {
        match requirement {
            Requirement::Public => true,
            Requirement::Authenticated => self.is_authenticated(),
            Requirement::StaffOrAdmin => self.is_staff_or_admin(),
            Requirement::Admin => self.is_admin(),
        }
    }
}

// =============================================================================
// Requirement
// =============================================================================

/// The least access level a path or endpoint needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Public,
    Authenticated,
    StaffOrAdmin,
    Admin,
}

// =============================================================================
// Decision
// =============================================================================

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Continue to the handler.
    Allow,
    /// Caller must log in first.
    RedirectToLogin,
    /// Caller is logged in but lacks the role for this path.
    RedirectWithMessage {
        location: &'static str,
        message: &'static str,
    },
}

impl AccessDecision {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Strips trailing slashes. The root path `/` becomes `""`.
///
/// ## Example
/// ```rust
/// use tally_core::access::normalize_path;
///
/// assert_eq!(normalize_path("/inventory/"), "/inventory");
/// assert_eq!(normalize_path("/"), "");
/// ```
pub fn normalize_path(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// `true` when `path` is `prefix` itself or lies below it.
fn under_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Classifies a path by the least access level it needs.
pub fn classify(path: &str) -> Requirement {
    let path = normalize_path(path);

    if PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| under_prefix(path, p)) {
        return Requirement::Public;
    }

    if STAFF_PREFIXES.iter().any(|p| under_prefix(path, p)) {
        return Requirement::StaffOrAdmin;
    }

    Requirement::Authenticated
}

/// Applies the path policy.
///
/// ## Example
/// ```rust
/// use tally_core::access::{evaluate, AccessDecision, AccessLevel};
///
/// assert_eq!(evaluate("/billing/", AccessLevel::Anonymous), AccessDecision::RedirectToLogin);
/// assert!(evaluate("/inventory", AccessLevel::Staff).is_allowed());
/// assert!(!evaluate("/reports/daily", AccessLevel::Authenticated).is_allowed());
/// ```
pub fn evaluate(path: &str, level: AccessLevel) -> AccessDecision {
    match classify(path) {
        Requirement::Public => AccessDecision::Allow,
        _ if !level.is_authenticated() => AccessDecision::RedirectToLogin,
        Requirement::StaffOrAdmin | Requirement::Admin if !level.is_staff_or_admin() => {
            AccessDecision::RedirectWithMessage {
                location: BILLING_PATH,
                message: STAFF_ONLY_MESSAGE,
            }
        }
        _ => AccessDecision::Allow,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths_allow_anyone() {
        for path in ["/", "", "/login", "/login/", "/logout", "/static/app.css", "/media", "/admin/"] {
            assert_eq!(evaluate(path, AccessLevel::Anonymous), AccessDecision::Allow, "{path}");
        }
    }

    #[test]
    fn test_public_prefix_is_boundary_aware() {
        assert_eq!(classify("/staticky"), Requirement::Authenticated);
        assert_eq!(classify("/administrator"), Requirement::Authenticated);
    }

    #[test]
    fn test_anonymous_redirected_to_login() {
        assert_eq!(evaluate("/billing", AccessLevel::Anonymous), AccessDecision::RedirectToLogin);
        assert_eq!(evaluate("/api/products/", AccessLevel::Anonymous), AccessDecision::RedirectToLogin);
        assert_eq!(evaluate("/inventory", AccessLevel::Anonymous), AccessDecision::RedirectToLogin);
    }

    #[test]
    fn test_staff_prefixes() {
        let denied = evaluate("/inventory/", AccessLevel::Authenticated);
        assert_eq!(
            denied,
            AccessDecision::RedirectWithMessage {
                location: "/billing",
                message: STAFF_ONLY_MESSAGE,
            }
        );
        assert!(evaluate("/invoice", AccessLevel::Staff).is_allowed());
        assert!(evaluate("/reports/x", AccessLevel::Admin).is_allowed());
    }

    #[test]
    fn test_staff_prefix_needs_exact_or_slash() {
        assert_eq!(classify("/invoices"), Requirement::Authenticated);
        assert_eq!(classify("/invoice/123"), Requirement::StaffOrAdmin);
        assert!(evaluate("/inventorying", AccessLevel::Authenticated).is_allowed());
    }

    #[test]
    fn test_levels() {
        assert_eq!(AccessLevel::from_flags(false, false), AccessLevel::Authenticated);
        assert_eq!(AccessLevel::from_flags(true, false), AccessLevel::Staff);
        assert_eq!(AccessLevel::from_flags(false, true), AccessLevel::Admin);

        assert!(AccessLevel::Admin.satisfies(Requirement::StaffOrAdmin));
        assert!(AccessLevel::Staff.satisfies(Requirement::StaffOrAdmin));
        assert!(!AccessLevel::Staff.satisfies(Requirement::Admin));
        assert!(!AccessLevel::Anonymous.satisfies(Requirement::Authenticated));
        assert!(AccessLevel::Anonymous.satisfies(Requirement::Public));
    }
}
