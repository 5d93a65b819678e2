use anyhow::anyhow;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, error};

mod types;

pub use types::*;

#[derive(Debug, Clone)]
pub struct DeepSeekService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DeepSeekService {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Start a streaming completion and hand back the update channel.
    ///
    /// The request is sent and its status checked before the reader task is
    /// spawned, so a rejected request surfaces as an error here instead of
    /// an empty stream.
    pub async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> anyhow::Result<mpsc::Receiver<StreamUpdate>> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
            temperature: 0.7,
            max_tokens: None,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("model request failed with {}: {}", status, body));
        }

        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            'read: while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        // Dropping tx without a Done marks the stream as
                        // ended abnormally.
                        error!("Error reading model stream: {}", e);
                        break;
                    }
                };

                buffer.extend_from_slice(&chunk);

                // Decode only complete lines. A newline byte never falls
                // inside a multibyte UTF-8 sequence, so a character split
                // across network chunks stays buffered until its line is
                // whole.
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line_bytes[..pos]);
                    let line = line.trim();

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    if data == "[DONE]" {
                        let _ = tx.send(StreamUpdate::Done).await;
                        break 'read;
                    }

                    let parsed = match serde_json::from_str::<StreamResponse>(data) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            debug!("Skipping unparseable stream line: {}", e);
                            continue;
                        }
                    };

                    let choice = parsed.choices.first();
                    let content = choice.and_then(|c| c.delta.content.clone());
                    let finished = choice.and_then(|c| c.finish_reason.as_deref()).is_some();

                    let update = StreamUpdate::Chunk {
                        data: data.to_string(),
                        content,
                    };
                    if tx.send(update).await.is_err() {
                        break 'read;
                    }

                    if finished {
                        let _ = tx.send(StreamUpdate::Done).await;
                        break 'read;
                    }
                }
            }
        });

        Ok(rx)
    }
}
