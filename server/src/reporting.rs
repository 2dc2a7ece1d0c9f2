//! Read-only HTTP endpoint for leaderboard standings.
//!
//! `GET /` renders a browser-viewable table and `GET /leaderboard` returns
//! the same standings as JSON. Both are ordered as `get_standings`.

use crate::leaderboard::{Standing, Standings};
use axum::{extract::State, response::Html, routing::get, Json, Router};
use log::{info, warn};
use std::fmt::Write;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builds the standings router. Unknown paths fall through to axum's 404.
pub fn router(standings: Arc<dyn Standings>) -> Router {
    Router::new()
        .route("/", get(standings_page))
        .route("/leaderboard", get(standings_json))
        .with_state(standings)
}

async fn standings_json(State(standings): State<Arc<dyn Standings>>) -> Json<Vec<Standing>> {
    Json(standings.get_standings())
}

async fn standings_page(State(standings): State<Arc<dyn Standings>>) -> Html<String> {
    Html(render_page(&standings.get_standings()))
}

/// Renders the HTML leaderboard page.
pub fn render_page(standings: &[Standing]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>Leaderboard</title></head>\n<body>\n<h1>Leaderboard</h1>\n",
    );

    if standings.is_empty() {
        page.push_str("<p>No games recorded yet.</p>\n");
    } else {
        page.push_str("<table>\n<tr><th>Rank</th><th>Player</th><th>Wins</th></tr>\n");
        for (rank, standing) in standings.iter().enumerate() {
            let _ = writeln!(
                page,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                rank + 1,
                escape_html(&standing.identity),
                standing.wins
            );
        }
        page.push_str("</table>\n");
    }

    page.push_str("</body>\n</html>\n");
    page
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serves standings until the listener fails. Runs independently of any
/// game session.
pub async fn serve_standings(listener: TcpListener, standings: Arc<dyn Standings>) {
    if let Ok(addr) = listener.local_addr() {
        info!("Leaderboard available at http://{}/", addr);
    }

    if let Err(e) = axum::serve(listener, router(standings)).await {
        warn!("Leaderboard endpoint stopped: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{Leaderboard, ResultRecorder};
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;

    fn sample_board() -> Arc<Leaderboard> {
        let board = Arc::new(Leaderboard::in_memory());
        board.record_win("HP");
        board.record_win("RM");
        board.record_win("HP");
        board
    }

    async fn start(board: Arc<Leaderboard>) -> (SocketAddr, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (addr, tokio::spawn(serve_standings(listener, board)))
    }

    /// Sends `request` (e.g. `GET /`) and returns the raw response.
    async fn fetch(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let message = format!(
            "{} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            request
        );
        stream.write_all(message.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_render_page_rows() {
        let page = render_page(&sample_board().get_standings());
        let hp = page.find("<td>1</td><td>HP</td><td>2</td>").unwrap();
        let rm = page.find("<td>2</td><td>RM</td><td>1</td>").unwrap();
        assert!(hp < rm);
        assert!(!page.contains("No games recorded yet."));
    }

    #[test]
    fn test_render_page_empty() {
        let page = render_page(&[]);
        assert!(page.contains("No games recorded yet."));
        assert!(!page.contains("<table>"));
    }

    #[test]
    fn test_identity_escaped() {
        let standings = vec![Standing {
            identity: "<B&B>".to_string(),
            wins: 1,
        }];
        assert!(render_page(&standings).contains("<td>&lt;B&amp;B&gt;</td>"));
    }

    #[tokio::test]
    async fn test_json_standings() {
        let (addr, server) = start(sample_board()).await;

        let response = fetch(addr, "GET /leaderboard").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("application/json"));
        assert!(response.ends_with(r#"[{"identity":"HP","wins":2},{"identity":"RM","wins":1}]"#));

        server.abort();
    }

    #[tokio::test]
    async fn test_query_string_ignored() {
        let (addr, server) = start(sample_board()).await;

        let response = fetch(addr, "GET /leaderboard?sort=wins").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains(r#""identity":"HP""#));

        server.abort();
    }

    #[tokio::test]
    async fn test_head_request() {
        let (addr, server) = start(sample_board()).await;

        let response = fetch(addr, "HEAD /leaderboard").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(!response.contains("identity"));

        server.abort();
    }

    #[tokio::test]
    async fn test_html_page_served() {
        let (addr, server) = start(Arc::new(Leaderboard::in_memory())).await;

        let response = fetch(addr, "GET /").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("text/html"));
        assert!(response.contains("No games recorded yet."));

        server.abort();
    }

    #[tokio::test]
    async fn test_unknown_path_not_found() {
        let (addr, server) = start(sample_board()).await;

        assert!(fetch(addr, "GET /admin").await.starts_with("HTTP/1.1 404"));
        assert!(fetch(addr, "POST /leaderboard")
            .await
            .starts_with("HTTP/1.1 405"));

        server.abort();
    }
}
