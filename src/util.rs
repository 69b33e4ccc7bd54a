use reqwest::Body;
use tokio_util::codec::{BytesCodec, FramedRead};

/// Join the Graph base URL and an endpoint path with exactly one slash.
pub fn graph_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub fn file_to_body(file: tokio::fs::File) -> Body {
    let stream = FramedRead::new(file, BytesCodec::new());
    Body::wrap_stream(stream)
}
