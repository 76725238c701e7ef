//! Mock upstream providers
//!
//! - `realtime_mock`: an in-process [`BaseRealtime`] whose events are driven
//!   by the test and which records every frame it is sent
//! - `gemini_mock`: a WebSocket server speaking the Gemini Live wire format

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

pub mod gemini_mock;
pub mod realtime_mock;
