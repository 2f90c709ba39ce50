use std::ffi::OsString;
use std::path::PathBuf;

pub const DEFAULT_LISTEN_PORT: u16 = 31000;
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_FATAL_SESSION_ERRORS: bool = false;

/// gpg-agent's restricted ("extra") socket, meant for forwarding.
pub const AGENT_SOCKET_NAME: &str = "S.gpg-agent.extra";

/// Parse a boolean configuration token.
///
/// Accepts `true|1|yes` and `false|0|no`, case-insensitive, surrounding
/// whitespace ignored.
pub fn parse_bool_token(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Resolve an optional boolean setting, falling back to `default` when it is
/// unset, empty, or unrecognized.
pub fn resolve_flag(name: &str, value: Option<&str>, default: bool) -> bool {
    let Some(raw) = value.filter(|raw| !raw.trim().is_empty()) else {
        return default;
    };
    parse_bool_token(raw).unwrap_or_else(|| {
        tracing::warn!(flag = name, value = raw, default, "unrecognized boolean, using default");
        default
    })
}

/// Platform location of the agent socket, from the process environment.
pub fn default_agent_socket() -> Option<PathBuf> {
    default_agent_socket_from(|key| std::env::var_os(key))
}

/// Platform location of the agent socket.
///
/// Windows: `%APPDATA%\gnupg\S.gpg-agent.extra`. Elsewhere:
/// `$GNUPGHOME/S.gpg-agent.extra`, else `$HOME/.gnupg/S.gpg-agent.extra`.
pub fn default_agent_socket_from(lookup: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if cfg!(windows) {
        return var("APPDATA").map(|dir| PathBuf::from(dir).join("gnupg").join(AGENT_SOCKET_NAME));
    }

    if let Some(home) = var("GNUPGHOME") {
        return Some(PathBuf::from(home).join(AGENT_SOCKET_NAME));
    }
    var("HOME").map(|home| PathBuf::from(home).join(".gnupg").join(AGENT_SOCKET_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_tokens() {
        for token in ["true", "TRUE", " 1 ", "yes", "Yes"] {
            assert_eq!(parse_bool_token(token), Some(true), "{token}");
        }
        for token in ["false", "False", "0", "no", "NO\n"] {
            assert_eq!(parse_bool_token(token), Some(false), "{token}");
        }
        assert_eq!(parse_bool_token("maybe"), None);
        assert_eq!(parse_bool_token("on"), None);
    }

    #[test]
    fn resolve_flag_falls_back_to_default() {
        assert!(!resolve_flag("fatal", None, false));
        assert!(resolve_flag("fatal", None, true));
        assert!(resolve_flag("fatal", Some(""), true));
        assert!(resolve_flag("fatal", Some("yes"), false));
        assert!(!resolve_flag("fatal", Some("0"), true));
        assert!(resolve_flag("fatal", Some("sometimes"), true));
        assert!(!resolve_flag("fatal", Some("sometimes"), false));
    }

    #[cfg(not(windows))]
    #[test]
    fn default_socket_prefers_gnupghome() {
        let path = default_agent_socket_from(|key| match key {
            "GNUPGHOME" => Some("/opt/gnupg".into()),
            "HOME" => Some("/home/alice".into()),
            _ => None,
        });
        assert_eq!(path, Some(PathBuf::from("/opt/gnupg/S.gpg-agent.extra")));
    }

    #[cfg(not(windows))]
    #[test]
    fn default_socket_uses_home_dot_gnupg() {
        let path = default_agent_socket_from(|key| match key {
            "GNUPGHOME" => Some("".into()),
            "HOME" => Some("/home/alice".into()),
            _ => None,
        });
        assert_eq!(
            path,
            Some(PathBuf::from("/home/alice/.gnupg/S.gpg-agent.extra"))
        );
        assert_eq!(default_agent_socket_from(|_| None), None);
    }
}
