//! Server-Sent Events 解码
//!
//! 增量帧解码器 + 字节流到类型化事件流的适配

mod decoder;

pub use decoder::{decode_events, SseDecoder, SseFrame};
