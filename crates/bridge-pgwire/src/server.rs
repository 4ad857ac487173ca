//! PostgreSQL server

use crate::backend::BridgeServerHandlers;
use anyhow::Context;
use bridge_executor::QueryBridge;
use pgwire::tokio::process_socket;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// PostgreSQL-compatible server in front of a [`QueryBridge`]
///
/// # Example
///
/// ```no_run
/// use bridge_executor::{DuckDbEngine, QueryBridge};
/// use bridge_pgwire::PgServer;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let engine = DuckDbEngine::open("analytics.db")?;
///     let bridge = Arc::new(QueryBridge::new(Arc::new(engine)));
///     PgServer::new("127.0.0.1:5432", bridge).start().await
/// }
/// ```
pub struct PgServer {
    listen_addr: String,
    bridge: Arc<QueryBridge>,
}

impl PgServer {
    pub fn new(listen_addr: impl Into<String>, bridge: Arc<QueryBridge>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            bridge,
        }
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    /// Bind the listen address and serve until the process exits
    pub async fn start(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("failed to listen on {}", self.listen_addr))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!("PostgreSQL server listening on {}", addr);
        info!("Connect with: psql -h {} -p {}", addr.ip(), addr.port());
        warn!("Authentication is DISABLED - server accepts all connections");

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    info!("New connection from {}", peer_addr);
                    let bridge = Arc::clone(&self.bridge);

                    tokio::spawn(async move {
                        let handlers = Arc::new(BridgeServerHandlers::new(bridge));

                        if let Err(e) = process_socket(socket, None, handlers).await {
                            error!("Connection error: {}", e);
                        }
                        info!("Connection from {} closed", peer_addr);
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_executor::{seed_sample_database, DuckDbEngine};
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Backend messages seen until the next ReadyForQuery
    #[derive(Debug, Default)]
    struct Exchange {
        row_descriptions: usize,
        data_rows: Vec<Vec<Option<String>>>,
        command_tags: Vec<String>,
        error_codes: Vec<String>,
    }

    async fn start_server() -> SocketAddr {
        let engine = DuckDbEngine::open_in_memory().unwrap();
        seed_sample_database(&engine).unwrap();
        let bridge = Arc::new(QueryBridge::new(Arc::new(engine)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(PgServer::new(addr.to_string(), bridge).serve(listener));
        addr
    }

    fn frame(tag: Option<u8>, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len() + 5);
        out.extend(tag);
        out.extend_from_slice(&((body.len() + 4) as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn cstr(bytes: &[u8]) -> (String, &[u8]) {
        let end = bytes.iter().position(|b| *b == 0).unwrap();
        (
            String::from_utf8(bytes[..end].to_vec()).unwrap(),
            &bytes[end + 1..],
        )
    }

    async fn read_message(stream: &mut TcpStream) -> (u8, Vec<u8>) {
        let tag = stream.read_u8().await.unwrap();
        let len = stream.read_u32().await.unwrap() as usize;
        let mut body = vec![0; len - 4];
        stream.read_exact(&mut body).await.unwrap();
        (tag, body)
    }

    async fn read_until_ready(stream: &mut TcpStream) -> Exchange {
        let mut exchange = Exchange::default();
        loop {
            let (tag, body) = read_message(stream).await;
            match tag {
                b'Z' => return exchange,
                b'T' => exchange.row_descriptions += 1,
                b'C' => exchange.command_tags.push(cstr(&body).0),
                b'D' => {
                    let count = u16::from_be_bytes([body[0], body[1]]) as usize;
                    let mut rest = &body[2..];
                    let mut row = Vec::with_capacity(count);
                    for _ in 0..count {
                        let len = i32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
                        rest = &rest[4..];
                        if len < 0 {
                            row.push(None);
                        } else {
                            let len = len as usize;
                            row.push(Some(String::from_utf8(rest[..len].to_vec()).unwrap()));
                            rest = &rest[len..];
                        }
                    }
                    exchange.data_rows.push(row);
                }
                b'E' => {
                    let mut fields = body.as_slice();
                    while fields[0] != 0 {
                        let field = fields[0];
                        let (value, rest) = cstr(&fields[1..]);
                        if field == b'C' {
                            exchange.error_codes.push(value);
                        }
                        fields = rest;
                    }
                }
                _ => {}
            }
        }
    }

    async fn connect(addr: SocketAddr) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut startup = Vec::new();
        startup.extend_from_slice(&196_608u32.to_be_bytes());
        startup.extend_from_slice(b"user\0rill\0database\0rill\0\0");
        stream.write_all(&frame(None, &startup)).await.unwrap();
        read_until_ready(&mut stream).await;
        stream
    }

    async fn simple_query(stream: &mut TcpStream, sql: &str) -> Exchange {
        let mut body = sql.as_bytes().to_vec();
        body.push(0);
        stream.write_all(&frame(Some(b'Q'), &body)).await.unwrap();
        read_until_ready(stream).await
    }

    #[tokio::test]
    async fn test_simple_query_end_to_end() {
        let addr = start_server().await;
        let mut stream = connect(addr).await;

        let exchange = simple_query(&mut stream, "SELECT * FROM commits").await;
        assert_eq!(exchange.row_descriptions, 1);
        assert_eq!(exchange.data_rows.len(), 10);
        assert_eq!(exchange.command_tags, vec!["SELECT 10"]);
        assert_eq!(
            exchange.data_rows[0],
            vec![
                Some("1".to_string()),
                Some("Alice".to_string()),
                Some("Initial commit".to_string()),
                Some("2024-01-01".to_string()),
                Some("100".to_string()),
                Some("0".to_string()),
                Some("main.go".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_meta_commands_end_to_end() {
        let addr = start_server().await;
        let mut stream = connect(addr).await;

        let tables = simple_query(&mut stream, "\\dt").await;
        assert_eq!(
            tables.data_rows,
            vec![
                vec![Some("commits".to_string())],
                vec![Some("projects".to_string())]
            ]
        );

        let empty = simple_query(&mut stream, "   ").await;
        assert_eq!(empty.row_descriptions, 0);
        assert_eq!(empty.command_tags, vec!["OK"]);

        let nulls = simple_query(&mut stream, "SELECT NULL AS nothing").await;
        assert_eq!(nulls.data_rows, vec![vec![None]]);
    }

    #[tokio::test]
    async fn test_errors_keep_connection_usable() {
        let addr = start_server().await;
        let mut stream = connect(addr).await;

        let failed = simple_query(&mut stream, "SELECT * FROM no_such_table").await;
        assert_eq!(failed.error_codes, vec!["42000"]);
        assert!(failed.data_rows.is_empty());

        let projects = simple_query(&mut stream, "SELECT name FROM projects ORDER BY id").await;
        assert_eq!(projects.command_tags, vec!["SELECT 3"]);
    }
}
