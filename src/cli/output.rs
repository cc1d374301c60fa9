use colored::Colorize;

use crate::error::OxApiError;

/// Status line shown above a response body.
pub fn format_status(status: reqwest::StatusCode, is_tty: bool) -> String {
    let line = status.to_string();
    if !is_tty {
        return line;
    }
    if status.is_success() {
        line.green().to_string()
    } else if status.is_client_error() || status.is_server_error() {
        line.red().bold().to_string()
    } else {
        line.yellow().to_string()
    }
}

/// Pretty-print JSON bodies; leave anything else untouched.
pub fn format_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}

pub fn print_response(status: reqwest::StatusCode, body: &str, raw: bool, is_tty: bool) {
    if raw {
        print!("{body}");
        return;
    }
    eprintln!("{}", format_status(status, is_tty));
    if !body.is_empty() {
        println!("{}", format_body(body));
    }
}

pub fn print_error(err: &OxApiError, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_plain_when_not_tty() {
        assert_eq!(format_status(reqwest::StatusCode::OK, false), "200 OK");
        assert_eq!(
            format_status(reqwest::StatusCode::NOT_FOUND, false),
            "404 Not Found"
        );
    }

    #[test]
    fn json_body_is_pretty_printed() {
        assert_eq!(format_body(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn non_json_body_is_unchanged() {
        assert_eq!(format_body("<html></html>"), "<html></html>");
        assert_eq!(format_body(""), "");
    }
}
