//! Interactive console loop.
//!
//! Reads customer ids line by line, sends one request per id and prints the
//! result. Holds no correlation or timeout logic of its own.

use crate::messages::SimpleRequest;
use crate::node::CustomerClient;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const PROMPT: &str = "Enter customer id (quit exits): ";

/// Word that ends the session.
pub const QUIT: &str = "quit";

/// Routes an interrupt (Ctrl+C) to the in-flight request, or ends the
/// session when nothing is in flight.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptState>,
}

#[derive(Debug, Default)]
struct InterruptState {
    session: CancellationToken,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a request was cancelled, false if the session ended.
    pub fn trigger(&self) -> bool {
        match self.inner.in_flight.lock().take() {
            Some(request) => {
                request.cancel();
                true
            }
            None => {
                self.inner.session.cancel();
                false
            }
        }
    }

    pub fn session(&self) -> &CancellationToken {
        &self.inner.session
    }

    fn begin_request(&self) -> CancellationToken {
        let token = self.inner.session.child_token();
        *self.inner.in_flight.lock() = Some(token.clone());
        token
    }

    fn end_request(&self) {
        self.inner.in_flight.lock().take();
    }
}

/// Run the prompt/request/print loop until `quit`, end of input, or an
/// interrupt while idle.
pub async fn run_console<R, W>(
    client: &CustomerClient,
    input: R,
    mut output: W,
    interrupt: &Interrupt,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = interrupt.session().cancelled() => None,
        };
        let Some(line) = line else {
            break;
        };

        let customer_id = line.trim();
        if customer_id == QUIT {
            break;
        }
        if customer_id.is_empty() {
            continue;
        }

        let cancel = interrupt.begin_request();
        let result = client.request(&SimpleRequest::new(customer_id), &cancel).await;
        interrupt.end_request();

        let text = match result {
            Ok(response) => format!("Customer Name: {}\n", response.customer_name),
            Err(e) => format!("Request failed: {e}\n"),
        };
        output.write_all(text.as_bytes()).await?;
    }

    output.flush().await?;
    debug!("Console session ended");
    Ok(())
}
