//! Request extractors that answer rejections with the server's JSON errors.

mod json;
mod path;

pub use json::Json;
pub use path::Path;

/// Keeps the first lines of a rejection message, bounded in length.
fn sanitize_error_message(message: &str) -> String {
    let lines = message.lines().take(3).collect::<Vec<_>>();
    lines.join(" ").chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_long_messages() {
        let message = "a\nb\nc\nd";
        assert_eq!(sanitize_error_message(message), "a b c");
        assert_eq!(sanitize_error_message(&"x".repeat(500)).len(), 200);
    }
}
