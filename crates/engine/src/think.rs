//! The Think step — stream one model reply, filter it, and parse the
//! next Form out of it.
//!
//! The stream is iterated manually so the loop can walk away from it:
//! once a complete tool block shows up mid-stream there is no reason to
//! keep paying for the epilogue, and on a user abort we must not await
//! provider teardown (some providers hold the HTTP connection open in
//! their cleanup path). Abandoning the stream is a plain drop — the
//! producer task notices on its next send.
//!
//! Whenever the stream is abandoned, its end-of-stream hook (which pushes
//! the assistant message to history) has not run, so this step appends
//! the accumulated text manually; the next turn still gets full context.

use gloop_core::{Effects, EngineError, Form, Usage, World};
use gloop_parser::{has_complete_tool_block, parse_to_form, StreamFilter};
use tracing::debug;

enum Next {
    Chunk(Option<Result<gloop_core::StreamChunk, gloop_core::ProviderError>>),
    Cancelled,
}

/// Send `input` as a user turn, stream and filter the reply, and return
/// the Form the reply parses to.
pub async fn think_step(
    input: &str,
    world: &World,
    effects: &dyn Effects,
) -> Result<Form, EngineError> {
    let mut stream = world.conversation.stream(input).await?;
    let mut filter = StreamFilter::new();
    let mut raw = String::new();
    let mut usage: Option<Usage> = None;
    let mut early_break = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = world.cancel.cancelled() => Next::Cancelled,
            chunk = stream.next() => Next::Chunk(chunk),
        };

        match next {
            Next::Cancelled => {
                // Keep the partial reply so the next input has context.
                if !raw.is_empty() && !stream.finished() {
                    world.conversation.push_assistant(raw.clone());
                }
                stream.abandon();
                return Err(EngineError::Aborted);
            }
            Next::Chunk(Some(Ok(chunk))) => {
                if let Some(u) = chunk.usage {
                    usage = Some(u);
                }
                if let Some(text) = chunk.content.as_deref() {
                    raw.push_str(text);
                    let out = filter.feed(text);
                    if !out.text.is_empty() {
                        effects.stream_chunk(&out.text).await;
                    }
                    for sighting in out.tools {
                        effects.tool_parsed(&sighting.name, &sighting.preview).await;
                    }
                    if has_complete_tool_block(&raw) {
                        early_break = true;
                        break;
                    }
                }
                if chunk.done {
                    break;
                }
            }
            Next::Chunk(Some(Err(e))) => return Err(EngineError::Provider(e)),
            Next::Chunk(None) => break,
        }
    }

    if early_break {
        debug!(len = raw.len(), "complete tool block mid-stream, breaking early");
        if !stream.finished() {
            world.conversation.push_assistant(raw.clone());
        }
        stream.abandon();
    }

    let tail = filter.flush();
    if !tail.is_empty() {
        effects.stream_chunk(&tail).await;
    }
    effects.stream_done().await;
    if let Some(u) = usage {
        effects.usage(u).await;
    }

    Ok(parse_to_form(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{worlds, worlds_chunked, RecordingEffects};
    use gloop_core::ChatMessage;

    #[tokio::test]
    async fn plain_reply_streams_and_parses_to_nil() {
        let (world, _) = worlds(vec!["Hello, world!"]);
        let effects = RecordingEffects::default();
        let next = think_step("hi", &world, &effects).await.unwrap();
        assert_eq!(next.tag(), "nil");
        assert_eq!(effects.streamed_text(), "Hello, world!");

        // Full consumption: the stream's own hook appended the reply.
        let history = world.conversation.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], ChatMessage::assistant("Hello, world!"));
    }

    #[tokio::test]
    async fn tool_block_breaks_early_and_appends_manually() {
        // The epilogue chunk after the closing tag must never be consumed.
        let (world, _) = worlds_chunked(vec![vec![
            "Let me check. <tools><tool>Echo(\"x\")</tool></tools>",
            " ignored epilogue",
        ]]);
        let effects = RecordingEffects::default();
        let next = think_step("go", &world, &effects).await.unwrap();
        assert_eq!(next.tag(), "invoke");

        let history = world.conversation.history();
        assert_eq!(history.len(), 2);
        // Accumulated text stops at the closing tag.
        assert!(history[1].content.ends_with("</tools>"));
        assert!(!history[1].content.contains("epilogue"));
        assert!(effects.events().contains(&"tool_parsed(Echo, x)".to_string()));
    }

    #[tokio::test]
    async fn markup_is_suppressed_from_streamed_text() {
        let (world, _) = worlds_chunked(vec![vec![
            "Before <tools><tool>Echo(\"x\")</tool></tools>",
            " after",
        ]]);
        let effects = RecordingEffects::default();
        think_step("go", &world, &effects).await.unwrap();
        // Early break fires at "</tools>", so " after" is never streamed.
        assert_eq!(effects.streamed_text(), "Before ");
    }

    #[tokio::test]
    async fn abort_mid_stream_keeps_partial_history() {
        let (world, _) = worlds(vec!["some partial text"]);
        world.cancel.cancel();
        let effects = RecordingEffects::default();
        let err = think_step("go", &world, &effects).await.unwrap_err();
        assert!(err.is_aborted());
    }

    #[tokio::test]
    async fn stream_done_fires_exactly_once() {
        let (world, _) = worlds(vec!["just text"]);
        let effects = RecordingEffects::default();
        think_step("go", &world, &effects).await.unwrap();
        let dones = effects
            .events()
            .iter()
            .filter(|e| *e == "stream_done")
            .count();
        assert_eq!(dones, 1);
    }
}
