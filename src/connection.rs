use crate::error::{Result, TransportError};
use std::sync::{Arc, Mutex, PoisonError};

/// One physical link to the amplifier
///
/// An exchange is a complete open-write-[read]-close cycle: implementations
/// acquire the device at the start of `exchange` and release it before
/// returning, on every path. An empty or short reply is returned as-is; it is
/// up to the caller whether silence is a failure.
pub trait Transport: Send {
    fn exchange(
        &mut self,
        frame: &[u8],
        expect_response: bool,
    ) -> std::result::Result<Vec<u8>, TransportError>;
}

/// Serialized access to a [`Transport`]
///
/// The amplifier has a single half-duplex link, so every exchange takes the
/// same lock; clones share it. Exchanges run on the blocking thread pool and,
/// once started, always run to completion even if the caller stops waiting.
#[derive(Clone)]
pub struct Link {
    transport: Arc<Mutex<Box<dyn Transport>>>,
}

impl Link {
    /// Wrap a transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(Mutex::new(Box::new(transport))),
        }
    }

    /// Run one exchange, waiting for any exchange already in flight
    pub async fn exchange(&self, frame: Vec<u8>, expect_response: bool) -> Result<Vec<u8>> {
        let transport = self.transport.clone();

        let reply = tokio::task::spawn_blocking(move || {
            let mut transport = transport.lock().unwrap_or_else(PoisonError::into_inner);
            tracing::debug!("Sending: {:?}", String::from_utf8_lossy(&frame));
            let reply = transport.exchange(&frame, expect_response)?;
            if expect_response {
                tracing::debug!("Received: {:?}", String::from_utf8_lossy(&reply));
            }
            Ok::<_, TransportError>(reply)
        })
        .await
        .map_err(|e| TransportError::Worker(e.to_string()))??;

        Ok(reply)
    }
}
