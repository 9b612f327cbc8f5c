//! Host-shell detection from the runtime user agent.

/// Client names that identify the social host shell, matched case-insensitively.
pub const HOST_CLIENT_PATTERNS: &[&str] = &["farcaster", "warpcast"];

/// True when the user agent names one of the known host clients.
///
/// `None` means there is no user agent to inspect (non-browser execution),
/// which is never a host shell.
pub fn is_in_host_shell(user_agent: Option<&str>) -> bool {
    let Some(ua) = user_agent else { return false };
    let ua = ua.to_ascii_lowercase();
    HOST_CLIENT_PATTERNS.iter().any(|p| ua.contains(p))
}
