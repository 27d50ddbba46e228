//! UCI engine subprocess client (spec §4.E step 1-2).
//!
//! A `tokio::process::Command` + `BufReader` line-reading subprocess client,
//! generalized from a one-shot "run and wait" command into a long-lived
//! request/response child process that's queried once per ply.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

/// Locate the engine binary: an explicit path wins, then `STOCKFISH_PATH`,
/// then `stockfish` on `PATH` (spec §6 "Configuration").
pub fn resolve_engine_path(explicit: Option<&Path>) -> EngineResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("STOCKFISH_PATH") {
        return Ok(PathBuf::from(path));
    }
    which::which("stockfish").map_err(|_| EngineError::EngineUnavailable)
}

/// One `score cp N` / `score mate N` / PV line parsed out of a UCI `info`
/// response.
#[derive(Debug, Clone, Default)]
pub struct UciInfo {
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub pv: Vec<String>,
}

/// A persistent UCI engine subprocess.
pub struct UciClient {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    timeout: Duration,
}

impl UciClient {
    /// Spawn the engine binary and complete the `uci`/`isready`/`ucinewgame`
    /// handshake.
    pub async fn spawn(engine_path: &Path, timeout: Duration) -> EngineResult<Self> {
        let mut child = Command::new(engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");
        let stdout = BufReader::new(stdout).lines();

        let mut client = Self {
            child,
            stdin,
            stdout,
            timeout,
        };
        client.send("uci").await?;
        client.read_until(|line| line.trim() == "uciok").await?;
        client.send("isready").await?;
        client.read_until(|line| line.trim() == "readyok").await?;
        client.send("ucinewgame").await?;
        Ok(client)
    }

    async fn send(&mut self, command: &str) -> EngineResult<()> {
        debug!(command, "sending UCI command");
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until one satisfies `predicate`, returning every line read
    /// (including the terminal one), bounded by this client's timeout.
    async fn read_until(&mut self, predicate: impl Fn(&str) -> bool) -> EngineResult<Vec<String>> {
        let fut = async {
            let mut lines = Vec::new();
            loop {
                match self.stdout.next_line().await? {
                    Some(line) => {
                        let done = predicate(&line);
                        lines.push(line);
                        if done {
                            return Ok(lines);
                        }
                    }
                    None => return Err(EngineError::EngineExited),
                }
            }
        };
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| EngineError::EngineTimeout)?
    }

    /// Query a fixed-depth search from `fen`, returning the deepest `info`
    /// line's score and PV (spec §4.E step 2).
    pub async fn analyze(&mut self, fen: &str, depth: u32) -> EngineResult<UciInfo> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;
        let lines = self.read_until(|line| line.starts_with("bestmove")).await?;

        let mut best = UciInfo::default();
        for line in &lines {
            if let Some(info) = parse_info_line(line) {
                best = info;
            }
        }
        Ok(best)
    }

    /// Terminate the subprocess.
    pub async fn shutdown(mut self) -> EngineResult<()> {
        let _ = self.send("quit").await;
        if let Err(err) = self.child.kill().await {
            warn!(%err, "failed to kill engine subprocess");
        }
        Ok(())
    }
}

/// Parse one `info ... score (cp|mate) N ... pv m1 m2 ...` line. Returns
/// `None` for lines that carry no score (e.g. `info string ...`).
fn parse_info_line(line: &str) -> Option<UciInfo> {
    if !line.starts_with("info") {
        return None;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut info = UciInfo::default();
    let mut found_score = false;

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "score" if i + 2 < tokens.len() => {
                match tokens[i + 1] {
                    "cp" => {
                        info.score_cp = tokens[i + 2].parse().ok();
                        found_score = true;
                    }
                    "mate" => {
                        info.score_mate = tokens[i + 2].parse().ok();
                        found_score = true;
                    }
                    _ => {}
                }
                i += 3;
            }
            "pv" => {
                info.pv = tokens[(i + 1)..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => i += 1,
        }
    }

    if found_score {
        Some(info)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_centipawn_score_and_pv() {
        let line = "info depth 12 seldepth 18 score cp 34 nodes 12345 pv e2e4 e7e5 g1f3";
        let info = parse_info_line(line).expect("should parse");
        assert_eq!(info.score_cp, Some(34));
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn parses_mate_score() {
        let line = "info depth 5 score mate 3 pv d1h5";
        let info = parse_info_line(line).expect("should parse");
        assert_eq!(info.score_mate, Some(3));
    }

    #[test]
    fn info_string_without_score_is_ignored() {
        let line = "info string NNUE evaluation using nn-abc123.nnue";
        assert!(parse_info_line(line).is_none());
    }

    #[test]
    fn resolves_explicit_path_first() {
        let path = resolve_engine_path(Some(Path::new("/opt/stockfish"))).unwrap();
        assert_eq!(path, PathBuf::from("/opt/stockfish"));
    }
}
