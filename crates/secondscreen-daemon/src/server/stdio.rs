//! NDJSON serve loop over any async line source and sink.

use std::future::Future;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::handler::{MethodHandler, Outbound};

/// Serve calls read from `reader` until it reaches EOF.
///
/// Calls are handled one at a time in arrival order. Frames arriving on
/// `outbound` are written between responses.
pub async fn serve<R, W>(
    handler: &MethodHandler,
    reader: R,
    mut writer: W,
    mut outbound: mpsc::Receiver<Outbound>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let response = handler.handle_line(line).await;
                write_frame(&mut writer, &response).await?;
            }
            Some(frame) = outbound.recv() => {
                write_frame(&mut writer, &frame).await?;
            }
        }
    }

    // Flush anything already queued before returning.
    while let Ok(frame) = outbound.try_recv() {
        write_frame(&mut writer, &frame).await?;
    }
    writer.flush().await
}

/// Serve until EOF, an I/O failure or `shutdown`, then detach the host.
///
/// Host teardown runs on every exit path; the serve error, if any, is
/// returned afterwards.
pub async fn run<R, W, S>(
    handler: &MethodHandler,
    reader: R,
    writer: W,
    outbound: mpsc::Receiver<Outbound>,
    shutdown: S,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let served = tokio::select! {
        result = serve(handler, reader, writer, outbound) => result,
        () = shutdown => Ok(()),
    };
    if let Err(e) = &served {
        warn!(error = %e, "Method channel failed");
    }
    let dismissed = handler.manager().detach_host().await;
    info!(dismissed, "Method channel closed, host detached");
    served
}

async fn write_frame<W, T>(writer: &mut W, frame: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(frame)?;
    debug!(frame = %line, "Writing frame");
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::manager::{ManagerConfig, PresentationManager};
    use crate::platform::HostContext;
    use crate::platform::sim::SimulatedPlatform;
    use serde_json::{Value, json};
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    async fn serve_input(input: &str) -> Vec<Value> {
        let sim = SimulatedPlatform::with_external_displays(1);
        let (manager, _notifications) =
            PresentationManager::new(sim.platform(), ManagerConfig::default());
        manager.attach_host(HostContext::new("app")).await;
        let (tx, rx) = mpsc::channel(8);
        let handler = MethodHandler::new(Arc::new(manager), tx);

        let mut out = Vec::new();
        serve(&handler, input.as_bytes(), &mut out, rx).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn answers_each_call_in_order() {
        let input = concat!(
            r#"{"id":1,"method":"showPresentation","args":{"displayId":1,"routerName":"menu"}}"#,
            "\n\n",
            r#"{"id":2,"method":"getActivePresentations"}"#,
            "\n",
            r#"{"id":3,"method":"hidePresentation","args":"menu"}"#,
            "\n",
        );
        let frames = serve_input(input).await;
        let responses: Vec<&Value> = frames.iter().filter(|f| f.get("id").is_some()).collect();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"], Value::Bool(true));
        assert_eq!(responses[1]["result"], serde_json::json!(["menu"]));
        assert_eq!(responses[2]["id"], 3);
        assert_eq!(responses[2]["result"], Value::Bool(true));
    }

    #[tokio::test]
    async fn malformed_line_gets_error_frame() {
        let frames = serve_input("not json\n").await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["id"], Value::Null);
        assert_eq!(frames[0]["error"]["code"], "MALFORMED_CALL");
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_failure_still_detaches_host() {
        let sim = SimulatedPlatform::with_external_displays(1);
        let (manager, _notifications) =
            PresentationManager::new(sim.platform(), ManagerConfig::default());
        manager.attach_host(HostContext::new("app")).await;
        let manager = Arc::new(manager);
        let (tx, rx) = mpsc::channel(8);
        let handler = MethodHandler::new(Arc::clone(&manager), tx);

        let show = json!({
            "id": 1,
            "method": "showPresentation",
            "args": {"displayId": 1, "routerName": "menu"}
        });
        let shown = handler.handle_line(&show.to_string()).await;
        assert_eq!(shown.result, Some(Value::Bool(true)));

        let input = "{\"id\":2,\"method\":\"getActivePresentations\"}\n";
        let err = run(&handler, input.as_bytes(), BrokenPipe, rx, std::future::pending())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let stats = manager.stats().await;
        assert_eq!(stats.active_sessions, 0);
        assert!(!stats.host_attached);
        assert_eq!(sim.visible_on("menu"), None);
    }

    #[tokio::test]
    async fn shutdown_signal_detaches_host() {
        let sim = SimulatedPlatform::with_external_displays(1);
        let (manager, _notifications) =
            PresentationManager::new(sim.platform(), ManagerConfig::default());
        manager.attach_host(HostContext::new("app")).await;
        let manager = Arc::new(manager);
        let (tx, rx) = mpsc::channel(8);
        let handler = MethodHandler::new(Arc::clone(&manager), tx);

        let (_input_tx, input) = tokio::io::duplex(64);
        let input = tokio::io::BufReader::new(input);
        run(&handler, input, Vec::new(), rx, async {}).await.unwrap();
        assert!(!manager.stats().await.host_attached);
    }
}
