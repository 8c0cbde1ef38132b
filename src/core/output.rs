//! Backend output forwarding - drains the child's pipes into the shell log

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Forward every line of `reader` to the log until EOF
///
/// Lines are logged and dropped; nothing is retained. Invalid UTF-8 is
/// replaced rather than treated as an error so the pipe keeps draining.
/// Returns the number of non-empty lines forwarded.
pub async fn forward_lines<R>(reader: R, stream: OutputStream) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut forwarded = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end();
                if line.is_empty() {
                    continue;
                }
                match stream {
                    OutputStream::Stdout => {
                        info!(target: "homestock::backend", stream = stream.label(), "{}", line)
                    }
                    OutputStream::Stderr => {
                        warn!(target: "homestock::backend", stream = stream.label(), "{}", line)
                    }
                }
                forwarded += 1;
            }
            Err(e) => {
                warn!("Failed to read backend {}: {}", stream.label(), e);
                break;
            }
        }
    }

    debug!("Backend {} closed after {} lines", stream.label(), forwarded);
    forwarded
}

/// Start draining both pipes of a freshly spawned child
///
/// Must be called from within the tokio runtime.
pub fn spawn_forwarders(child: &mut Child) -> Vec<JoinHandle<usize>> {
    let mut tasks = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        tasks.push(tokio::spawn(forward_lines(stdout, OutputStream::Stdout)));
    }
    if let Some(stderr) = child.stderr.take() {
        tasks.push(tokio::spawn(forward_lines(stderr, OutputStream::Stderr)));
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_non_empty_lines_including_unterminated_tail() {
        let input: &[u8] = b"one\ntwo\r\n\n   \nthree";
        assert_eq!(forward_lines(input, OutputStream::Stdout).await, 3);
    }

    #[tokio::test]
    async fn invalid_utf8_keeps_draining() {
        let input: &[u8] = b"ok\n\xff\xfe broken\nafter\n";
        assert_eq!(forward_lines(input, OutputStream::Stderr).await, 3);
    }

    #[tokio::test]
    async fn empty_stream_forwards_nothing() {
        let input: &[u8] = b"";
        assert_eq!(forward_lines(input, OutputStream::Stdout).await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn drains_both_pipes_of_a_child() {
        use std::process::Stdio;

        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("echo out1; echo out2; echo err1 >&2")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let tasks = spawn_forwarders(&mut child);
        assert_eq!(tasks.len(), 2);
        assert!(child.stdout.is_none() && child.stderr.is_none());

        let mut counts = Vec::new();
        for task in tasks {
            counts.push(task.await.unwrap());
        }
        assert_eq!(counts, vec![2, 1]);
        assert!(child.wait().await.unwrap().success());
    }
}
