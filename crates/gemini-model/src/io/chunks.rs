#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

/// The body stream broke before it was complete.
#[derive(Debug, PartialEq, Eq)]
pub struct Error;

/// Source of raw body bytes for the event reader.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Preset(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn from_preset<I: IntoIterator<Item = Bytes>>(chunks: I) -> Self {
        Chunks::Preset(chunks.into_iter().collect())
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Response(response) => response.chunk().await.map_err(|err| {
                debug!("body stream failed: {err}");
                Error
            }),
            #[cfg(test)]
            Chunks::Preset(chunks) => Ok(chunks.pop_front()),
        }
    }
}
