//! reqwest-backed [`ServerTransport`].

use futures_util::stream;
use portage_protocol::{OffsetResponse, ServerError, TicketRequest, UploadTicket};
use portage_upload::{ChunkUpload, ProgressReporter, ServerTransport, TransportFuture, UploadError};
use tracing::debug;

use crate::multipart;

/// Streaming frame size for chunk bodies. Small enough to give useful
/// progress granularity, large enough to keep syscall overhead down.
const FRAME_SIZE: usize = 64 * 1024;

/// REST client for the upload surface of a portage server.
///
/// Endpoints, relative to the base URL:
/// `POST file`, `PUT file/{id}/contents`, `POST file/chunk`,
/// `GET file/offset`, `DELETE system/uploads`.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Uses a preconfigured client (auth headers, proxies, timeouts).
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Any transport-level failure (refused connection, reset, timeout)
/// surfaces as a connection interruption; only responses the server
/// actually produced become rejections.
fn connection(e: reqwest::Error) -> UploadError {
    UploadError::Connection(e.to_string())
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, UploadError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ServerError>(&body) {
        Ok(err) => Err(UploadError::from(err)),
        Err(_) => Err(UploadError::Rejected {
            message: status.to_string(),
            identifier: None,
        }),
    }
}

impl ServerTransport for RestClient {
    fn request_ticket<'a>(&'a self, req: &'a TicketRequest) -> TransportFuture<'a, UploadTicket> {
        Box::pin(async move {
            let builder = match req {
                TicketRequest::CreateFile(create) => {
                    debug!(name = %create.name, size = create.size, "requesting upload ticket");
                    self.http.post(self.url("file")).json(create)
                }
                TicketRequest::UpdateContents { file_id, size } => {
                    debug!(%file_id, size, "requesting contents-update ticket");
                    self.http
                        .put(self.url(&format!("file/{file_id}/contents")))
                        .query(&[("size", size)])
                }
            };
            let resp = check(builder.send().await.map_err(connection)?).await?;
            let body = resp.bytes().await.map_err(connection)?;
            Ok(serde_json::from_slice(&body)?)
        })
    }

    fn send_chunk<'a>(
        &'a self,
        chunk: &'a ChunkUpload,
        progress: &'a ProgressReporter,
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let (content_type, body) =
                multipart::encode_chunk_form(&chunk.upload_id, chunk.offset, &chunk.data);
            let total_body = body.len() as i64;

            // Frames report cumulative body bytes as the connection
            // pulls them.
            let reporter = progress.clone();
            let frames: Vec<Vec<u8>> = body.chunks(FRAME_SIZE).map(<[u8]>::to_vec).collect();
            let framed = stream::iter(frames.into_iter().scan(0i64, move |sent, frame| {
                *sent += frame.len() as i64;
                reporter.transport_progress(*sent, Some(total_body));
                Some(Ok::<_, std::io::Error>(frame))
            }));

            let resp = self
                .http
                .post(self.url("file/chunk"))
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(reqwest::Body::wrap_stream(framed))
                .send()
                .await
                .map_err(connection)?;
            check(resp).await?;
            Ok(())
        })
    }

    fn query_offset<'a>(&'a self, upload_id: &'a str) -> TransportFuture<'a, i64> {
        Box::pin(async move {
            let resp = self
                .http
                .get(self.url("file/offset"))
                .query(&[("uploadId", upload_id)])
                .send()
                .await
                .map_err(connection)?;
            let body = check(resp).await?.bytes().await.map_err(connection)?;
            let offset: OffsetResponse = serde_json::from_slice(&body)?;
            Ok(offset.offset)
        })
    }

    fn release_upload<'a>(&'a self, upload_id: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let resp = self
                .http
                .delete(self.url("system/uploads"))
                .query(&[("uploadId", upload_id)])
                .send()
                .await
                .map_err(connection)?;
            check(resp).await?;
            Ok(())
        })
    }
}
