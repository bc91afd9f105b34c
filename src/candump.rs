//! Minimal reading of candump log files (`candump -l` format).
//!
//! Only the interface column is extracted; frames are never decoded.
//!
//! ```text
//! (1600000000.120000) can0 0C9#CA182530
//! ```

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interface name recorded on one log line, if the line is a frame record.
pub fn line_interface(line: &str) -> Option<&str> {
    let mut fields = line.split_whitespace();
    let stamp = fields.next()?;
    if !(stamp.starts_with('(') && stamp.ends_with(')')) {
        return None;
    }
    let interface = fields.next()?;
    // A frame field must follow, otherwise this is not a record.
    fields.next().filter(|frame| frame.contains('#'))?;
    Some(interface)
}

/// Distinct interfaces recorded in `contents`, in first-seen order.
pub fn interfaces(contents: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for interface in contents.lines().filter_map(line_interface) {
        remember(&mut seen, interface);
    }
    seen
}

/// Stream `path` line by line and return the interfaces it records.
///
/// Lines are decoded lossily, so stray non-UTF-8 bytes in a frame or
/// comment do not hide the interface column.
pub async fn read_interfaces(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).split(b'\n');

    let mut seen = Vec::new();
    while let Some(raw) = lines.next_segment().await? {
        let line = String::from_utf8_lossy(&raw);
        if let Some(interface) = line_interface(&line) {
            remember(&mut seen, interface);
        }
    }
    Ok(seen)
}

fn remember(seen: &mut Vec<String>, interface: &str) {
    if !seen.iter().any(|s| s == interface) {
        seen.push(interface.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_interface() {
        assert_eq!(
            line_interface("(1600000000.120000) can0 0C9#CA182530"),
            Some("can0")
        );
        assert_eq!(line_interface("(1.0) vcan1 7DF#R"), Some("vcan1"));
        assert_eq!(line_interface(""), None);
        assert_eq!(line_interface("# comment can0 0C9#00"), None);
        assert_eq!(line_interface("(1.0) can0"), None);
    }

    #[test]
    fn test_interfaces_dedup_in_order() {
        let log = "(1.0) can1 100#00\n\
                   (1.1) can0 101#01\n\
                   \n\
                   (1.2) can1 102#02\n";
        assert_eq!(interfaces(log), ["can1", "can0"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_keeps_interfaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.log");
        std::fs::write(
            &path,
            b"(1.0) can0 100#00\n(1.1) can0 101#01 \xff\n(1.2) can1 102#02\n",
        )
        .unwrap();

        let found = read_interfaces(&path).await.unwrap();
        assert_eq!(found, ["can0", "can1"]);
    }

    #[tokio::test]
    async fn test_missing_log_is_error() {
        let err = read_interfaces(Path::new("/nonexistent/vcan-sim.log"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_bundled_log_records_can0() {
        let path = crate::config::bundled_default_source();
        let found = read_interfaces(&path).await.unwrap();
        assert_eq!(found, ["can0"]);
    }
}
