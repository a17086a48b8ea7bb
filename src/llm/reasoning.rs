//! Reasoning decorator: moves `<think>` segments out of the answer text.

use super::types::{GenerationRequest, StreamPart};
use super::{GenerationStream, LanguageModel};
use crate::error::Result;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;

/// Incremental splitter for text that interleaves answer and tagged thinking.
///
/// Tags may arrive split across chunks; any trailing fragment that could
/// still become a tag is held back until the next chunk decides it.
#[derive(Debug, Clone)]
pub struct TagSplitter {
    open: String,
    close: String,
    buffer: String,
    inside: bool,
    after_close: bool,
}

impl TagSplitter {
    pub fn new(tag_name: &str) -> Self {
        Self {
            open: format!("<{}>", tag_name),
            close: format!("</{}>", tag_name),
            buffer: String::new(),
            inside: false,
            after_close: false,
        }
    }

    /// Feed a chunk; returns the parts that are now unambiguous.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamPart> {
        self.buffer.push_str(chunk);
        let mut parts = Vec::new();

        loop {
            let needle = if self.inside { &self.close } else { &self.open };
            if let Some(pos) = self.buffer.find(needle.as_str()) {
                let consumed = pos + needle.len();
                let before = self.buffer[..pos].to_string();
                self.buffer.drain(..consumed);
                self.emit(&before, &mut parts);
                self.after_close = self.inside;
                self.inside = !self.inside;
                continue;
            }

            let keep = partial_suffix(&self.buffer, needle);
            let ready: String = self.buffer.drain(..self.buffer.len() - keep).collect();
            self.emit(&ready, &mut parts);
            break;
        }

        parts
    }

    /// Flush whatever is still buffered. An unterminated thinking segment
    /// stays reasoning.
    pub fn finish(&mut self) -> Vec<StreamPart> {
        let rest = std::mem::take(&mut self.buffer);
        let mut parts = Vec::new();
        self.emit(&rest, &mut parts);
        parts
    }

    fn emit(&mut self, text: &str, parts: &mut Vec<StreamPart>) {
        if self.inside {
            if !text.is_empty() {
                parts.push(StreamPart::Reasoning(text.to_string()));
            }
            return;
        }

        let text = if self.after_close {
            text.trim_start_matches(['\n', '\r'])
        } else {
            text
        };
        if !text.is_empty() {
            self.after_close = false;
            parts.push(StreamPart::Text(text.to_string()));
        }
    }
}

/// Length of the longest suffix of `haystack` that is a proper prefix of `needle`.
fn partial_suffix(haystack: &str, needle: &str) -> usize {
    (1..needle.len())
        .rev()
        .find(|&k| haystack.ends_with(&needle[..k]))
        .unwrap_or(0)
}

/// Split complete text into `(answer, reasoning)`.
pub fn split_reasoning(text: &str, tag_name: &str) -> (String, String) {
    let mut splitter = TagSplitter::new(tag_name);
    let mut parts = splitter.push(text);
    parts.extend(splitter.finish());

    let mut answer = String::new();
    let mut reasoning = String::new();
    for part in parts {
        match part {
            StreamPart::Text(t) => answer.push_str(&t),
            StreamPart::Reasoning(r) => reasoning.push_str(&r),
            _ => {}
        }
    }
    (answer, reasoning)
}

/// Wraps a model whose raw output carries a thinking segment.
pub struct ReasoningModel {
    inner: Arc<dyn LanguageModel>,
    tag_name: String,
}

impl ReasoningModel {
    pub fn new(inner: Arc<dyn LanguageModel>, tag_name: &str) -> Self {
        Self {
            inner,
            tag_name: tag_name.to_string(),
        }
    }
}

struct SplitState {
    inner: GenerationStream,
    splitter: TagSplitter,
    pending: VecDeque<Result<StreamPart>>,
    done: bool,
}

#[async_trait]
impl LanguageModel for ReasoningModel {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn stream(&self, request: GenerationRequest) -> Result<GenerationStream> {
        let inner = self.inner.stream(request).await?;
        let state = SplitState {
            inner,
            splitter: TagSplitter::new(&self.tag_name),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.done {
                    return None;
                }
                match state.inner.next().await {
                    Some(Ok(StreamPart::Text(text))) => {
                        state.pending.extend(state.splitter.push(&text).into_iter().map(Ok));
                    }
                    Some(Ok(StreamPart::Finish(reason))) => {
                        state.pending.extend(state.splitter.finish().into_iter().map(Ok));
                        state.pending.push_back(Ok(StreamPart::Finish(reason)));
                    }
                    Some(other) => state.pending.push_back(other),
                    None => {
                        state.pending.extend(state.splitter.finish().into_iter().map(Ok));
                        state.done = true;
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}
