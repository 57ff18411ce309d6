//! Output formatting for CLI

use serde::Serialize;
use std::fmt::Display;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Render one record in the selected format
pub fn format_output<T: Serialize + Display>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        // One object per line so simulate output can be streamed
        OutputFormat::Json => serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Text => data.to_string(),
    }
}

pub fn print_output<T: Serialize + Display>(data: &T, format: &str) {
    println!("{}", format_output(data, format));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        value: u32,
    }

    impl Display for Sample {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "value={}", self.value)
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }

    #[test]
    fn test_format_output() {
        let sample = Sample { value: 7 };
        assert_eq!(format_output(&sample, "text"), "value=7");
        assert_eq!(format_output(&sample, "json"), r#"{"value":7}"#);
    }
}
