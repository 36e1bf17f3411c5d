//! Line splitting for subprocess output.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Reads `reader` to the end, sending each non-empty line to `tx`.
///
/// Progress meters redraw with `\r`, so carriage returns split lines too.
/// Invalid UTF-8 is replaced rather than dropped. Returns the number of lines sent.
pub async fn forward_lines<R>(reader: R, tx: &mpsc::UnboundedSender<String>) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut sent = 0;

    while let Some(segment) = segments.next_segment().await? {
        for part in segment.split(|b| *b == b'\r') {
            let line = String::from_utf8_lossy(part);
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            // A closed receiver only means nobody cares about the output any more.
            let _ = tx.send(line.to_string());
            sent += 1;
        }
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_lines(input, &tx).await.unwrap();
        drop(tx);
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_splits_on_newlines() {
        let lines = collect(b"first\nsecond\n").await;
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_splits_on_carriage_returns_and_skips_blanks() {
        let lines = collect(b"[download]  1.0%\r[download]  2.0%\r\n\n  \nlast").await;
        assert_eq!(lines, vec!["[download]  1.0%", "[download]  2.0%", "last"]);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_not_an_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sent = forward_lines(&b"a\nb\n"[..], &tx).await.unwrap();
        assert_eq!(sent, 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let lines = collect(b"ok \xff end\n").await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ok "));
        assert!(lines[0].ends_with(" end"));
    }
}
