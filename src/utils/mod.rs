//! Utility functions.

/// Format a username for display.
///
/// If the user has a username, returns @username.
/// Otherwise, returns the first name.
pub fn format_username(username: Option<&str>, first_name: &str) -> String {
    match username {
        Some(u) => format!("@{}", u),
        None => first_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_username() {
        assert_eq!(format_username(Some("ada"), "Ada"), "@ada");
        assert_eq!(format_username(None, "Ada"), "Ada");
    }
}
