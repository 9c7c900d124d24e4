//! Streaming tree builder
//!
//! Consumes a chunked byte stream of newline-delimited patches and builds a
//! `UiTree` incrementally. Observers receive a shallow snapshot of the tree
//! after every applied patch through a `watch` channel.
//!
//! # Lifecycle
//!
//! ```text
//!   send() ──▶ [Streaming] ──end of stream──▶ Completed(tree)
//!                  │   │
//!                  │   └──transport error──▶ Err(Transport), partial tree kept
//!                  │
//!                  └──send()/abort()/clear()──▶ Aborted (not an error)
//! ```
//!
//! Starting a new `send` cancels any in-flight send on the same builder
//! (last writer wins). Each send carries a generation number so a superseded
//! stream can never write into the tree of its successor.

use crate::patch::{apply_patch, parse_patch_line};
use crate::tree::UiTree;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Mutex;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Line decoding
// ============================================================================

/// Incremental newline splitter for a byte stream
///
/// Bytes are buffered until a `\n` arrives, so multi-byte UTF-8 sequences split
/// across chunks decode correctly. Invalid UTF-8 is replaced, not fatal.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode(&self.buffer[start..end]));
            start = end + 1;
        }
        self.buffer.drain(..start);

        lines
    }

    /// Take whatever remains once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        let rest = decode(&std::mem::take(&mut self.buffer));
        (!rest.trim().is_empty()).then_some(rest)
    }
}

fn decode(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

// ============================================================================
// Outcomes and errors
// ============================================================================

/// Line counters for one send
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Complete lines seen (including the trailing partial line)
    pub lines: usize,
    /// Patches that changed the tree
    pub applied: usize,
    /// Blank, comment, malformed or inapplicable lines
    pub skipped: usize,
}

/// How a send ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The stream ended normally
    Completed { tree: UiTree, stats: StreamStats },
    /// A newer send, `abort()` or `clear()` took over
    Aborted,
}

/// Errors surfaced by a send
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// The underlying byte stream failed; the partial tree stays in the builder
    #[error("patch stream failed after {lines} line(s): {message}")]
    Transport { message: String, lines: usize },
}

// ============================================================================
// Builder
// ============================================================================

struct BuilderState {
    tree: UiTree,
    error: Option<StreamError>,
    generation: u64,
    streaming: bool,
    cancel: Option<CancellationToken>,
    stats: StreamStats,
}

/// Builds a tree from patch streams; share it behind an `Arc` to send from tasks
pub struct StreamBuilder {
    state: Mutex<BuilderState>,
    snapshots: watch::Sender<UiTree>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(UiTree::new());
        Self {
            state: Mutex::new(BuilderState {
                tree: UiTree::new(),
                error: None,
                generation: 0,
                streaming: false,
                cancel: None,
                stats: StreamStats::default(),
            }),
            snapshots,
        }
    }

    /// Receive a snapshot after every applied patch
    pub fn subscribe(&self) -> watch::Receiver<UiTree> {
        self.snapshots.subscribe()
    }

    /// Current tree (shallow copy)
    pub fn tree(&self) -> UiTree {
        self.lock().tree.clone()
    }

    /// Transport error from the most recent send, if it failed
    pub fn error(&self) -> Option<StreamError> {
        self.lock().error.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.lock().streaming
    }

    /// Cancel any in-flight send, keeping the tree built so far
    pub fn abort(&self) {
        let mut state = self.lock();
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        state.generation = state.generation.wrapping_add(1);
        state.streaming = false;
    }

    /// Cancel any in-flight send and reset tree and error
    pub fn clear(&self) {
        self.abort();
        let mut state = self.lock();
        state.tree = UiTree::new();
        state.error = None;
        state.stats = StreamStats::default();
        self.snapshots.send_replace(state.tree.clone());
    }

    /// Consume a patch stream, building a fresh tree
    ///
    /// Returns `Aborted` if another send (or `abort`/`clear`) takes over before
    /// the stream ends. On a transport error the partial tree remains available
    /// through `tree()` and the error through `error()`.
    pub async fn send<S, B, E>(&self, stream: S) -> Result<StreamOutcome, StreamError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let (generation, cancel) = self.begin();
        let mut stream = std::pin::pin!(stream);
        let mut decoder = LineDecoder::new();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(generation, "Patch stream aborted");
                    return Ok(StreamOutcome::Aborted);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    for line in decoder.push(chunk.as_ref()) {
                        if !self.apply_line(generation, &line) {
                            return Ok(StreamOutcome::Aborted);
                        }
                    }
                }
                Some(Err(e)) => return self.fail(generation, e.to_string()),
                None => break,
            }
        }

        if let Some(rest) = decoder.finish() {
            if !self.apply_line(generation, &rest) {
                return Ok(StreamOutcome::Aborted);
            }
        }

        Ok(self.complete(generation))
    }

    /// Consume an `AsyncRead` (file, stdin, socket) as a patch stream
    pub async fn send_reader<R>(&self, reader: R) -> Result<StreamOutcome, StreamError>
    where
        R: AsyncRead,
    {
        self.send(ReaderStream::new(reader)).await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BuilderState> {
        // A poisoned lock only means a panic elsewhere; the tree itself is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut state = self.lock();
        if let Some(previous) = state.cancel.take() {
            tracing::debug!("Superseding in-flight patch stream");
            previous.cancel();
        }

        let cancel = CancellationToken::new();
        state.generation = state.generation.wrapping_add(1);
        state.cancel = Some(cancel.clone());
        state.streaming = true;
        state.error = None;
        state.tree = UiTree::new();
        state.stats = StreamStats::default();
        self.snapshots.send_replace(state.tree.clone());

        (state.generation, cancel)
    }

    /// Apply one line; false when this send has been superseded
    fn apply_line(&self, generation: u64, line: &str) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }

        state.stats.lines += 1;
        let changed = match parse_patch_line(line) {
            Some(patch) => {
                tracing::trace!(op = patch.op(), path = patch.path(), "Applying patch");
                apply_patch(&mut state.tree, &patch)
            }
            None => false,
        };

        if changed {
            state.stats.applied += 1;
            self.snapshots.send_replace(state.tree.clone());
        } else {
            state.stats.skipped += 1;
        }
        true
    }

    fn fail(&self, generation: u64, message: String) -> Result<StreamOutcome, StreamError> {
        let mut state = self.lock();
        if state.generation != generation {
            return Ok(StreamOutcome::Aborted);
        }

        let error = StreamError::Transport {
            message,
            lines: state.stats.lines,
        };
        tracing::error!("{}", error);
        state.error = Some(error.clone());
        state.streaming = false;
        state.cancel = None;
        Err(error)
    }

    fn complete(&self, generation: u64) -> StreamOutcome {
        let mut state = self.lock();
        if state.generation != generation {
            return StreamOutcome::Aborted;
        }

        state.streaming = false;
        state.cancel = None;
        tracing::info!(
            "Patch stream complete: {} line(s), {} applied, {} skipped",
            state.stats.lines,
            state.stats.applied,
            state.stats.skipped
        );
        StreamOutcome::Completed {
            tree: state.tree.clone(),
            stats: state.stats,
        }
    }
}

impl Default for StreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;
    use std::convert::Infallible;
    use std::sync::Arc;

    const THREE_PATCHES: &str = concat!(
        r#"{"op":"add","path":"/root","value":"a"}"#,
        "\n",
        r#"{"op":"add","path":"/elements/a","value":{"key":"a","type":"Text","props":{}}}"#,
        "\n",
        r#"{"op":"replace","path":"/elements/a/props/text","value":"hi"}"#,
        "\n",
    );

    fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = Result<&'static str, Infallible>> {
        stream::iter(parts.into_iter().map(Ok))
    }

    #[test]
    fn test_decoder_splits_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\n{\"b\""), vec!["{\"a\":1}".to_string()]);
        assert_eq!(decoder.push(b":2}\r\n\n"), vec!["{\"b\":2}".to_string(), String::new()]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decoder_utf8_split_and_trailing_line() {
        let bytes = "héllo\nwörld".as_bytes();
        let mut decoder = LineDecoder::new();
        // Split inside the two-byte "é"
        let mut lines = decoder.push(&bytes[..2]);
        lines.extend(decoder.push(&bytes[2..]));
        assert_eq!(lines, vec!["héllo".to_string()]);
        assert_eq!(decoder.finish(), Some("wörld".to_string()));
    }

    #[tokio::test]
    async fn test_send_builds_tree() {
        let builder = StreamBuilder::new();
        let outcome = builder
            .send(chunks(vec![&THREE_PATCHES[..30], &THREE_PATCHES[30..]]))
            .await
            .unwrap();

        let StreamOutcome::Completed { tree, stats } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(tree.root_element().unwrap().props["text"], json!("hi"));
        assert_eq!(stats.applied, 3);
        assert!(!builder.is_streaming());
        assert_eq!(builder.tree(), tree);
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_stop_stream() {
        let builder = StreamBuilder::new();
        let body = concat!(
            r#"{"op":"set","path":"/root","value":"a"}"#,
            "\n{oops\n// a comment\n\n",
            r#"{"op":"set","path":"/elements/a","value":{"type":"Text"}}"#,
        );
        let outcome = builder.send(chunks(vec![body])).await.unwrap();
        let StreamOutcome::Completed { tree, stats } = outcome else {
            panic!("expected completion");
        };
        // Final line had no trailing newline and was still applied
        assert!(tree.root_element().is_some());
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.skipped, 3);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_partial_tree() {
        let builder = StreamBuilder::new();
        let parts: Vec<Result<&str, String>> = vec![
            Ok("{\"op\":\"set\",\"path\":\"/root\",\"value\":\"a\"}\n"),
            Err("connection reset".to_string()),
            Ok("{\"op\":\"set\",\"path\":\"/root\",\"value\":\"b\"}\n"),
        ];
        let err = builder.send(stream::iter(parts)).await.unwrap_err();

        assert!(matches!(err, StreamError::Transport { lines: 1, .. }));
        assert_eq!(builder.tree().root, "a");
        assert_eq!(builder.error(), Some(err));
        assert!(!builder.is_streaming());

        builder.clear();
        assert_eq!(builder.error(), None);
        assert!(builder.tree().root.is_empty());
    }

    #[tokio::test]
    async fn test_snapshots_are_published() {
        let builder = StreamBuilder::new();
        let rx = builder.subscribe();
        builder.send(chunks(vec![THREE_PATCHES])).await.unwrap();
        assert_eq!(rx.borrow().root, "a");
        assert_eq!(
            rx.borrow().root_element().unwrap().props["text"],
            json!("hi")
        );
    }

    #[tokio::test]
    async fn test_new_send_aborts_previous() {
        let builder = Arc::new(StreamBuilder::new());
        let mut rx = builder.subscribe();

        // First stream delivers one patch and then never ends
        let first = {
            let builder = builder.clone();
            tokio::spawn(async move {
                let body = chunks(vec!["{\"op\":\"set\",\"path\":\"/root\",\"value\":\"old\"}\n"])
                    .chain(stream::pending());
                builder.send(body).await
            })
        };

        while rx.borrow_and_update().root != "old" {
            rx.changed().await.unwrap();
        }
        assert!(builder.is_streaming());

        let second = builder
            .send(chunks(vec!["{\"op\":\"set\",\"path\":\"/root\",\"value\":\"new\"}\n"]))
            .await
            .unwrap();
        assert!(matches!(second, StreamOutcome::Completed { .. }));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first, StreamOutcome::Aborted);
        assert_eq!(builder.tree().root, "new");
        assert_eq!(builder.error(), None);
    }

    #[tokio::test]
    async fn test_send_reader() {
        let builder = StreamBuilder::new();
        let outcome = builder.send_reader(THREE_PATCHES.as_bytes()).await.unwrap();
        assert!(matches!(outcome, StreamOutcome::Completed { .. }));
        assert_eq!(builder.tree().root, "a");
    }
}
