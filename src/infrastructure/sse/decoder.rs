//! SSE 帧解码器
//!
//! 帧以空行结束；多行 `data:` 用 `\n` 拼接；以 `:` 开头的注释行忽略。
//! 同时兼容 `\n` 与 `\r\n` 行尾，跨 chunk 的半行会保留到下一次 feed。

use futures_util::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::application::ports::{ApiError, EventStream};

/// 一个完整的 SSE 帧
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// 增量解码器
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一段字节，返回其中所有已完整的帧
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// 流结束时取出未以空行结束的最后一帧
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buf.is_empty() {
            let raw = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            if let Some(frame) = self.process_line(&line) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseFrame {
            event: self.event.take(),
            id: self.id.clone(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// 把字节流解码为类型化事件流
///
/// 无法解析的 JSON 帧记录 warn 后跳过；传输错误原样向下传递。
pub fn decode_events<T, S, B>(bytes: S) -> EventStream<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<B, ApiError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = (bytes.boxed(), SseDecoder::new(), false);
    stream::unfold(state, |(mut bytes, mut decoder, ended)| async move {
        if ended {
            return None;
        }
        match bytes.next().await {
            Some(Ok(chunk)) => {
                let frames = decoder.feed(chunk.as_ref());
                Some((frames_to_items(frames), (bytes, decoder, false)))
            }
            Some(Err(e)) => Some((vec![Err(e)], (bytes, decoder, true))),
            None => {
                let frames = decoder.finish().into_iter().collect();
                Some((frames_to_items(frames), (bytes, decoder, true)))
            }
        }
    })
    .flat_map(stream::iter)
    .boxed()
}

fn frames_to_items<T: DeserializeOwned>(frames: Vec<SseFrame>) -> Vec<Result<T, ApiError>> {
    frames
        .into_iter()
        .filter_map(|frame| match serde_json::from_str::<T>(&frame.data) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(
                    event = ?frame.event,
                    error = %e,
                    data_len = frame.data.len(),
                    "Skipping undecodable SSE frame"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::GenerationEvent;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":").is_empty());
        let frames = decoder.feed(b"\"chunk\"}\n\ndata: second\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, r#"{"type":"chunk"}"#);

        let frames = decoder.feed(b"\n");
        assert_eq!(frames[0].data, "second");
    }

    #[test]
    fn test_crlf_multiline_and_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keep-alive\r\nevent: update\r\nid: 7\r\ndata: a\r\ndata: b\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("update".to_string()),
                id: Some("7".to_string()),
                data: "a\nb".to_string(),
            }]
        );

        // 只有注释的帧不产生输出
        assert!(decoder.feed(b": ping\n\n").is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish().unwrap().data, "tail");
        assert!(decoder.finish().is_none());
    }

    #[tokio::test]
    async fn test_decode_events_skips_bad_json() {
        let chunks: Vec<Result<Vec<u8>, ApiError>> = vec![
            Ok(b"data: {\"type\":\"chunk\",\"content\":\"\xe4\xbb\x96\"}\n\n".to_vec()),
            Ok(b"data: not-json\n\n".to_vec()),
            Ok(b"data: {\"type\":\"done\"}\n\n".to_vec()),
        ];
        let events: Vec<_> = decode_events::<GenerationEvent, _, _>(stream::iter(chunks))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &GenerationEvent::Chunk {
                content: "他".to_string()
            }
        );
        assert_eq!(events[1].as_ref().unwrap(), &GenerationEvent::Done);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let chunks: Vec<Result<Vec<u8>, ApiError>> = vec![
            Ok(b"data: {\"type\":\"ping\"}\n\n".to_vec()),
            Err(ApiError::Network("reset".to_string())),
            Ok(b"data: {\"type\":\"done\"}\n\n".to_vec()),
        ];
        let events: Vec<_> = decode_events::<GenerationEvent, _, _>(stream::iter(chunks))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(events[1].is_err());
    }
}
