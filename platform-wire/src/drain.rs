use bytes::Buf;
use hyper::body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Upper bound on a drained response body, pages from the platforms stay well below this.
pub const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

pin_project! {
    /// Collects every data frame of a body into one buffer.
    pub struct DrainBodyFuture<B: Body> {
        #[pin]
        body: B,
        buf: Vec<u8>,
        limit: usize,
    }
}

impl<B> DrainBodyFuture<B>
where
    B: Body,
{
    /// `size_hint` is usually the advertised content length; it only preallocates.
    #[inline]
    #[must_use]
    pub fn new(body: B, size_hint: usize) -> Self {
        Self {
            body,
            buf: Vec::with_capacity(size_hint.min(MAX_BODY_LEN)),
            limit: MAX_BODY_LEN,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl<B> Future for DrainBodyFuture<B>
where
    B: Body,
{
    type Output = Result<Vec<u8>, anyhow::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slf = self.project();
        loop {
            let Some(next_res) = std::task::ready!(slf.body.as_mut().poll_frame(cx)) else {
                return Poll::Ready(Ok(std::mem::take(slf.buf)));
            };
            let Ok(frame) = next_res else {
                return Poll::Ready(Err(anyhow::anyhow!("Failed to poll next frame")));
            };
            // Trailers carry nothing we read
            let Ok(mut data) = frame.into_data() else {
                continue;
            };
            if slf.buf.len() + data.remaining() > *slf.limit {
                return Poll::Ready(Err(anyhow::anyhow!(
                    "Body exceeds limit of {} bytes",
                    slf.limit
                )));
            }
            while data.has_remaining() {
                let chunk = data.chunk();
                let len = chunk.len();
                slf.buf.extend_from_slice(chunk);
                data.advance(len);
            }
            if slf.body.is_end_stream() {
                return Poll::Ready(Ok(std::mem::take(slf.buf)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_body;

    #[tokio::test]
    async fn drains_the_whole_body() {
        let drained = DrainBodyFuture::new(byte_body("{\"ok\":true}"), 0).await.unwrap();
        assert_eq!(drained, b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn rejects_bodies_over_the_limit() {
        let drained = DrainBodyFuture::new(byte_body("too long"), 8)
            .with_limit(4)
            .await;
        assert!(drained.is_err());
    }
}
