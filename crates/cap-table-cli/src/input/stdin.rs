use serde_json::Value;
use std::io::{self, Read};

/// Read piped input from stdin as JSON, falling back to YAML.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => match serde_yaml::from_str::<Value>(trimmed) {
            Ok(value) if value.is_object() => Ok(Some(value)),
            _ => Err(format!("Failed to parse stdin: {}", json_err).into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_none() {
        assert!(parse_piped("  \n").unwrap().is_none());
    }

    #[test]
    fn test_yaml_fallback() {
        let value = parse_piped("event:\n  exit_value: \"1000\"\n").unwrap().unwrap();
        assert_eq!(value["event"]["exit_value"], "1000");
    }

    #[test]
    fn test_garbage_reports_json_error() {
        let err = parse_piped("{ not json").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse stdin"));
    }
}
