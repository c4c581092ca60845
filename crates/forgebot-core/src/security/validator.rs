//! Idea and path validation.
//!
//! Five ordered layers, fail-closed:
//!   1. length bounds,
//!   2. dangerous-system keyword scan (literal, case-insensitive),
//!   3. dangerous-operation pattern scan (structural, catches intents the
//!      literal list misses),
//!   4. banned-topic keyword scan (acceptable-use, distinct from 2–3 which
//!      are system-safety),
//!   5. sanitization with strict equality — any character the sanitizer
//!      would touch makes the whole idea untrusted; nothing is auto-fixed.
//!
//! Layers 2 and 3 are security alerts (likely hostile actor); the caller
//! logs them at elevated severity.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MIN_IDEA_CHARS: usize = 2;
const MAX_IDEA_CHARS: usize = 100;

/// Destructive filesystem operations, privilege escalation, service/daemon
/// control, and absolute system-path prefixes. Matched as case-insensitive
/// substrings.
const DANGEROUS_SYSTEM_KEYWORDS: &[&str] = &[
    "rm -rf", "sudo rm", "delete", "削除", "remove", "destroy", "破壊",
    "format", "wipe", "crontab", "cronjob", "cron", "systemctl",
    "service", "daemon", "root", "sudo", "chmod 777", "chown",
    "/etc/", "/var/", "/usr/", "/bin/", "/sbin/", "/home/", "/root/",
    "kill -9", "pkill", "killall", "shutdown", "reboot", "halt",
    "dd if=", "fdisk", "mount", "umount", "fsck", "mkfs",
];

/// Content-policy keywords (malware/exploit/spam-type terms).
const BANNED_KEYWORDS: &[&str] = &[
    "virus", "malware", "hack", "exploit", "ddos", "spam",
    "phishing", "ransomware", "trojan", "backdoor",
];

/// Structural shapes of dangerous operations: path traversal, system
/// directories, forced deletes, privilege escalation, cron/systemd control.
static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\.\./",
        r"/etc/",
        r"/var/",
        r"/usr/",
        r"/bin/",
        r"/sbin/",
        r"/home/",
        r"/root/",
        r"rm\s+-rf",
        r"sudo\s+",
        r"crontab\s+",
        r"systemctl\s+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("dangerous pattern compiles"))
    .collect()
});

static JS_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)javascript:").unwrap());
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)on\w+\s*=").unwrap());

/// Why an idea was refused admission. Only ever logged, never sent back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdeaRejection {
    #[error("idea must be between {MIN_IDEA_CHARS} and {MAX_IDEA_CHARS} characters, got {0}")]
    Length(usize),
    #[error("contains dangerous system operation keyword `{0}`")]
    DangerousKeyword(&'static str),
    #[error("matches dangerous operation pattern `{0}`")]
    DangerousPattern(String),
    #[error("contains banned keyword `{0}`")]
    BannedKeyword(&'static str),
    #[error("contains characters the sanitizer would alter")]
    UnsafeCharacters,
}

impl IdeaRejection {
    /// Dangerous-content rejections indicate a likely hostile actor and are
    /// logged at elevated severity, unlike ordinary validation failures.
    pub fn is_security_alert(&self) -> bool {
        matches!(
            self,
            IdeaRejection::DangerousKeyword(_) | IdeaRejection::DangerousPattern(_)
        )
    }
}

/// Length, keyword, pattern, and sanitization checks on extracted ideas.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns the idea on full acceptance. The accepted text is always
    /// byte-identical to the input: sanitize(idea) == idea is required, the
    /// idea is never silently rewritten.
    pub fn validate_idea(&self, idea: &str) -> Result<String, IdeaRejection> {
        let chars = idea.chars().count();
        if !(MIN_IDEA_CHARS..=MAX_IDEA_CHARS).contains(&chars) {
            return Err(IdeaRejection::Length(chars));
        }

        let lower = idea.to_lowercase();
        for &keyword in DANGEROUS_SYSTEM_KEYWORDS {
            if lower.contains(keyword) {
                return Err(IdeaRejection::DangerousKeyword(keyword));
            }
        }

        for pattern in DANGEROUS_PATTERNS.iter() {
            if pattern.is_match(idea) {
                return Err(IdeaRejection::DangerousPattern(pattern.as_str().to_string()));
            }
        }

        for &keyword in BANNED_KEYWORDS {
            if lower.contains(keyword) {
                return Err(IdeaRejection::BannedKeyword(keyword));
            }
        }

        let sanitized = sanitize(idea);
        if sanitized != idea {
            return Err(IdeaRejection::UnsafeCharacters);
        }
        Ok(sanitized)
    }
}

/// Strips angle brackets, `javascript:` scheme prefixes, inline event-handler
/// attribute shapes, and ASCII control characters, then trims whitespace.
fn sanitize(input: &str) -> String {
    let without_angles: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    let without_scheme = JS_SCHEME.replace_all(&without_angles, "");
    let without_handlers = EVENT_HANDLER.replace_all(&without_scheme, "");
    let without_control: String = without_handlers
        .chars()
        .filter(|c| {
            let cp = *c as u32;
            !(cp < 0x20 || cp == 0x7F)
        })
        .collect();
    without_control.trim().to_string()
}

/// Path-safety check on allocated build directories: no parent-directory
/// traversal segments, no home-directory shorthand. The allocator guarantees
/// existence; this re-checks shape before the path reaches the builder.
pub fn validate_path(path: &Path) -> bool {
    let text = path.to_string_lossy();
    !(text.contains("..") || text.contains('~'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn length_bounds_are_inclusive() {
        let v = InputValidator::new();
        assert_eq!(v.validate_idea("a"), Err(IdeaRejection::Length(1)));
        assert_eq!(v.validate_idea(""), Err(IdeaRejection::Length(0)));
        assert!(v.validate_idea("ab").is_ok());
        let max = "x".repeat(100);
        assert!(v.validate_idea(&max).is_ok());
        let over = "x".repeat(101);
        assert_eq!(v.validate_idea(&over), Err(IdeaRejection::Length(101)));
    }

    #[test]
    fn dangerous_system_keywords_are_rejected_before_sanitization() {
        let v = InputValidator::new();
        let rej = v.validate_idea("sudo rm -rf /").unwrap_err();
        assert!(matches!(rej, IdeaRejection::DangerousKeyword(_)));
        assert!(rej.is_security_alert());

        // Embedded inside otherwise harmless text, case-insensitive.
        let rej = v.validate_idea("a tool to SUDO things for me").unwrap_err();
        assert!(rej.is_security_alert());
        assert!(matches!(
            v.validate_idea("app that can delete my notes"),
            Err(IdeaRejection::DangerousKeyword("delete"))
        ));
        assert!(v.validate_idea("ファイル削除ツール").unwrap_err().is_security_alert());
    }

    #[test]
    fn dangerous_patterns_catch_what_keywords_miss() {
        let v = InputValidator::new();
        let rej = v.validate_idea("viewer for ../secret files").unwrap_err();
        assert!(matches!(rej, IdeaRejection::DangerousPattern(_)));
        assert!(rej.is_security_alert());
    }

    #[test]
    fn banned_topics_are_rejected_case_insensitively() {
        let v = InputValidator::new();
        assert_eq!(
            v.validate_idea("a cool Virus simulator"),
            Err(IdeaRejection::BannedKeyword("virus"))
        );
        assert_eq!(
            v.validate_idea("SPAM sender"),
            Err(IdeaRejection::BannedKeyword("spam"))
        );
        assert!(!IdeaRejection::BannedKeyword("virus").is_security_alert());
    }

    #[test]
    fn sanitization_is_fail_closed() {
        let v = InputValidator::new();
        assert_eq!(
            v.validate_idea("todo <b>app</b>"),
            Err(IdeaRejection::UnsafeCharacters)
        );
        assert_eq!(
            v.validate_idea("JavaScript:alert page"),
            Err(IdeaRejection::UnsafeCharacters)
        );
        assert_eq!(
            v.validate_idea("img onload= viewer"),
            Err(IdeaRejection::UnsafeCharacters)
        );
        assert_eq!(
            v.validate_idea("todo\x07app"),
            Err(IdeaRejection::UnsafeCharacters)
        );
        // Leading/trailing whitespace would be trimmed, so it is rejected too.
        assert_eq!(
            v.validate_idea(" todo app"),
            Err(IdeaRejection::UnsafeCharacters)
        );
    }

    #[test]
    fn accepted_ideas_come_back_unchanged() {
        let v = InputValidator::new();
        assert_eq!(v.validate_idea("todo app").unwrap(), "todo app");
        assert_eq!(v.validate_idea("todoアプリ").unwrap(), "todoアプリ");
    }

    #[test]
    fn path_safety_rejects_traversal_and_home_shorthand() {
        assert!(!validate_path(&PathBuf::from("/srv/projects/../etc")));
        assert!(!validate_path(&PathBuf::from("~/projects/x")));
        assert!(validate_path(&PathBuf::from("/srv/projects/todo_app_2026")));
    }
}
