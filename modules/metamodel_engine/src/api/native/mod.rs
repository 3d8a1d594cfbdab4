mod client;

pub use client::{NativeClient, RequestLimits};
