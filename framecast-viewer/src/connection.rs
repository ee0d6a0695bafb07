//! TCP connection to the server.

use tokio::net::TcpStream;
use tracing::error;

use framecast_core::StreamError;
use framecast_core::network;

use crate::config::ViewerConfig;

/// Connect to the configured server, logging a diagnostic that names
/// the failure class when it does not work out.
pub async fn connect_to_server(config: &ViewerConfig) -> Result<TcpStream, StreamError> {
    let info = config.server_info();
    network::connect(&info, config.connect_timeout())
        .await
        .inspect_err(|e| {
            error!(
                class = e.class(),
                server = %info,
                "{}: {e}",
                network::connect_hint(e)
            );
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_listening_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = ViewerConfig::default();
        config.server.port = listener.local_addr().unwrap().port();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let stream = connect_to_server(&config).await.unwrap();
        let (_server_side, peer) = accept.await.unwrap();
        assert_eq!(stream.local_addr().unwrap(), peer);
    }

    #[tokio::test]
    async fn refused_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = ViewerConfig::default();
        config.server.port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect_to_server(&config).await.unwrap_err();
        assert!(matches!(err, StreamError::Transport(_)));
    }
}
