//! OpenAI-compatible chat-completions wire protocol.
//!
//! Both configured backends speak the same `/chat/completions` shape, so the
//! request/response types and the SSE stream accumulator live here once.

use crate::{ChatMessage, CompletionOptions, LlmError};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Issue one chat completion against an OpenAI-compatible endpoint.
///
/// When `options.stream` is set, the SSE response is accumulated by
/// concatenating successive text deltas into one final string.
pub(crate) async fn send_chat(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
    options: &CompletionOptions,
) -> Result<String, LlmError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let request_body = ChatCompletionRequest {
        model,
        messages,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        stream: options.stream,
    };

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let detail = response.text().await.unwrap_or_default();
        return Err(LlmError::Auth(format!("HTTP {}: {}", status, detail)));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited);
    }
    if !status.is_success() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(LlmError::Communication(format!(
            "HTTP {}: {}",
            status, detail
        )));
    }

    if options.stream {
        accumulate_stream(response).await
    } else {
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse("Response carried no content".to_string()))
    }
}

/// Concatenate SSE `data:` deltas into the final completion text.
async fn accumulate_stream(response: reqwest::Response) -> Result<String, LlmError> {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut content = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| LlmError::Communication(format!("Stream read failed: {}", e)))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline) = buffer.find('\n') {
            let line = buffer[..newline].trim().to_string();
            buffer.drain(..=newline);
            append_delta(&line, &mut content);
        }
    }

    // Trailing line without a newline terminator
    append_delta(buffer.trim(), &mut content);

    Ok(content.trim().to_string())
}

fn append_delta(line: &str, content: &mut String) {
    let Some(data) = line.strip_prefix("data:") else {
        return;
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return;
    }
    // Malformed keep-alive frames are skipped rather than failing the call
    if let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) {
        if let Some(delta) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
        {
            content.push_str(&delta);
        }
    }
}
