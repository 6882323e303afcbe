//! Subject and body text for security alerts.

use chrono::{DateTime, Utc};

const SIGN_OFF: &str = "SafeVault Security Team";

pub const FAILED_LOGIN_SUBJECT: &str =
    "🚨 SafeVault Security Alert - Multiple Failed Login Attempts";
pub const PASSWORD_CHANGED_SUBJECT: &str = "🔐 SafeVault - Password Changed Successfully";

/// A rendered alert ready for a [`Notifier`](super::Notifier)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Alert sent when failed logins for a username reach the threshold
pub fn failed_login_alert(
    username: &str,
    ip_address: &str,
    at: DateTime<Utc>,
    window_minutes: i64,
    failures: u64,
) -> AlertMessage {
    let body = format!(
        "Security Alert for your SafeVault account!\n\
         \n\
         Multiple failed login attempts detected:\n\
         - Username: {username}\n\
         - IP Address: {ip_address}\n\
         - Time: {time}\n\
         - Failed attempts in last {window_minutes} minutes: {failures}\n\
         \n\
         If this wasn't you, please:\n\
         1. Change your password immediately\n\
         2. Check your account for unauthorized access\n\
         3. Contact support if needed\n\
         \n\
         Stay secure!\n\
         {SIGN_OFF}\n",
        time = format_time(at),
    );

    AlertMessage { subject: FAILED_LOGIN_SUBJECT.to_string(), body }
}

/// Confirmation sent after every password change
pub fn password_changed_alert(username: &str, ip_address: &str, at: DateTime<Utc>) -> AlertMessage {
    let body = format!(
        "Your SafeVault password has been changed successfully.\n\
         \n\
         Details:\n\
         - Username: {username}\n\
         - IP Address: {ip_address}\n\
         - Time: {time}\n\
         \n\
         If you didn't make this change, please contact support immediately.\n\
         \n\
         {SIGN_OFF}\n",
        time = format_time(at),
    );

    AlertMessage { subject: PASSWORD_CHANGED_SUBJECT.to_string(), body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 5).unwrap()
    }

    #[test]
    fn test_failed_login_alert() {
        let message = failed_login_alert("alice", "10.0.0.7", at(), 15, 3);

        assert_eq!(message.subject, FAILED_LOGIN_SUBJECT);
        assert!(message.body.contains("- Username: alice\n"));
        assert!(message.body.contains("- IP Address: 10.0.0.7\n"));
        assert!(message.body.contains("- Time: 2025-03-01 09:30:05 UTC\n"));
        assert!(message.body.contains("Failed attempts in last 15 minutes: 3\n"));
        assert!(message.body.contains("1. Change your password immediately"));
        assert!(message.body.ends_with("Stay secure!\nSafeVault Security Team\n"));
    }

    #[test]
    fn test_password_changed_alert() {
        let message = password_changed_alert("bob", "192.168.1.2", at());

        assert_eq!(message.subject, PASSWORD_CHANGED_SUBJECT);
        assert!(message.body.starts_with("Your SafeVault password has been changed successfully."));
        assert!(message.body.contains("- Username: bob\n"));
        assert!(message.body.contains("please contact support immediately."));
    }
}
