// Chunked NDJSON streaming utilities
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use tokio::sync::broadcast;

use crate::domain::update::StreamMessage;

/// Build a chunked HTTP response that emits one JSON document per line
pub fn ndjson_stream<S>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = StreamMessage> + Send + 'static,
{
    let byte_stream = stream.map(serialize_line);
    let body = Body::from_stream(byte_stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn serialize_line(message: StreamMessage) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(&message)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Streaming response fed by a line's subscriber group. The stream starts
/// with the given snapshot message, then forwards every broadcast message
/// until the client disconnects. A lagged subscriber skips what it missed
/// and continues with the next message.
pub fn stream_from_group(
    first: StreamMessage,
    mut rx: broadcast::Receiver<StreamMessage>,
) -> impl IntoResponse {
    let stream = async_stream::stream! {
        yield first;
        loop {
            match rx.recv().await {
                Ok(message) => yield message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Subscriber lagged, skipped {} messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    match ndjson_stream(stream) {
        Ok(response) => response.into_response(),
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::update::{AlertDelta, DashboardUpdate};
    use chrono::Utc;

    #[test]
    fn test_serialize_line_is_newline_terminated_json() {
        let message = StreamMessage::Update(DashboardUpdate {
            line_id: 4,
            generated_at: Utc::now(),
            sensors: Vec::new(),
            removed_sensor_ids: Vec::new(),
            posts: Vec::new(),
            removed_post_ids: Vec::new(),
            line: None,
            oee: None,
            alerts: AlertDelta::default(),
            has_any_changes: false,
        });

        let bytes = serialize_line(message).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));

        let parsed: serde_json::Value = serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(parsed["kind"], "Update");
        assert_eq!(parsed["payload"]["line_id"], 4);
    }
}
