//! HTTP Layer - 后端 REST / SSE 客户端

mod client;
mod dto;

pub use client::HttpBackendClient;
