//! File responses with HTTP range support
//!
//! Bodies are read lazily in bounded chunks; the file handle lives inside the
//! body stream and is closed when the response finishes or the client goes
//! away.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ApiResult};
use crate::range::ByteRange;

/// Upper bound on a single body chunk (1 MiB)
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Forward-only chunk stream over one byte range of a file
pub type RangeStream = ReaderStream<Take<File>>;

/// Serve `path`, honoring an optional `Range` header
pub async fn serve_file(path: &Path, range_header: Option<&HeaderValue>) -> ApiResult<Response> {
    let file = File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound("File not found")
        } else {
            ApiError::Internal(format!("Failed to open file: {}", e))
        }
    })?;

    let file_size = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to get file metadata: {}", e)))?
        .len();

    match range_header {
        Some(value) => {
            let range_str = value.to_str().map_err(|_| ApiError::RangeNotParseable)?;
            let range =
                ByteRange::parse(range_str, file_size).map_err(|e| ApiError::from_range(e, file_size))?;
            partial_response(file, file_size, range).await
        }
        None => full_response(file, file_size, path),
    }
}

/// Open a chunk stream positioned at `range.start`
///
/// The stream ends after `range.end` or at end of file, whichever comes
/// first; a short file ends the stream early without an error.
pub async fn open_range_stream(mut file: File, range: ByteRange) -> std::io::Result<RangeStream> {
    file.seek(SeekFrom::Start(range.start)).await?;
    Ok(ReaderStream::with_capacity(file.take(range.len()), CHUNK_SIZE))
}

fn full_response(file: File, file_size: u64, path: &Path) -> ApiResult<Response> {
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    let body = Body::from_stream(ReaderStream::with_capacity(file, CHUNK_SIZE));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CONTENT_LENGTH, file_size)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_DISPOSITION, content_disposition(path))
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

async fn partial_response(file: File, file_size: u64, range: ByteRange) -> ApiResult<Response> {
    let stream = open_range_stream(file, range)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to seek file: {}", e)))?;

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, range.len())
        .header(header::CONTENT_RANGE, range.content_range(file_size))
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// `attachment; filename="..."` built from the last path segment
fn content_disposition(path: &Path) -> String {
    let name: String = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string())
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_file(size: usize, name: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_full_file() {
        let (_dir, path) = create_test_file(1000, "clip.mp4");
        let response = serve_file(&path, None).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_LENGTH], "1000");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clip.mp4\""
        );

        let body = body_bytes(response).await;
        assert_eq!(body.len(), 1000);
        assert_eq!(body, std::fs::read(&path).unwrap());
    }

    #[tokio::test]
    async fn test_unknown_extension_is_octet_stream() {
        let (_dir, path) = create_test_file(10, "blob.zzzunknown");
        let response = serve_file(&path, None).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_range_first_hundred() {
        let (_dir, path) = create_test_file(1000, "clip.mp4");
        let range = HeaderValue::from_static("bytes=0-99");
        let response = serve_file(&path, Some(&range)).await.unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 0-99/1000");
        assert_eq!(headers[header::CONTENT_LENGTH], "100");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");

        let body = body_bytes(response).await;
        assert_eq!(body.len(), 100);
        assert_eq!(body, std::fs::read(&path).unwrap()[..100].to_vec());
    }

    #[tokio::test]
    async fn test_range_open_ended() {
        let (_dir, path) = create_test_file(1000, "clip.mp4");
        let range = HeaderValue::from_static("bytes=900-");
        let response = serve_file(&path, Some(&range)).await.unwrap();

        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 900-999/1000");
        let body = body_bytes(response).await;
        assert_eq!(body, std::fs::read(&path).unwrap()[900..].to_vec());
    }

    #[tokio::test]
    async fn test_range_not_satisfiable() {
        let (_dir, path) = create_test_file(1000, "clip.mp4");
        let range = HeaderValue::from_static("bytes=950-2000");
        let result = serve_file(&path, Some(&range)).await;
        assert!(matches!(
            result,
            Err(ApiError::RangeNotSatisfiable { file_size: 1000 })
        ));
    }

    #[tokio::test]
    async fn test_range_not_parseable() {
        let (_dir, path) = create_test_file(1000, "clip.mp4");
        let range = HeaderValue::from_static("items=0-10");
        let result = serve_file(&path, Some(&range)).await;
        assert!(matches!(result, Err(ApiError::RangeNotParseable)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = serve_file(&dir.path().join("gone.mp4"), None).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_range_stream_is_chunked() {
        let size = CHUNK_SIZE * 2 + 10;
        let (_dir, path) = create_test_file(size, "big.bin");
        let file = File::open(&path).await.unwrap();
        let range = ByteRange {
            start: 5,
            end: size as u64 - 1,
        };

        let mut reader = tokio_util::io::StreamReader::new(open_range_stream(file, range).await.unwrap());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), size - 5);
        assert_eq!(out[0], 5);
    }

    #[tokio::test]
    async fn test_range_stream_short_file_ends_early() {
        let (_dir, path) = create_test_file(100, "short.bin");
        let file = File::open(&path).await.unwrap();
        // Range computed against a larger size than the file now has
        let range = ByteRange { start: 50, end: 499 };

        let mut reader = tokio_util::io::StreamReader::new(open_range_stream(file, range).await.unwrap());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), 50);
    }

    #[test]
    fn test_content_disposition_sanitized() {
        let value = content_disposition(Path::new("/files/we\"ird\\name.mkv"));
        assert_eq!(value, "attachment; filename=\"we_ird_name.mkv\"");
    }
}
