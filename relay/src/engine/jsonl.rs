use super::{Participant, TickEngine};
use crate::error::EngineError;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record {
    Tick {
        tick: i64,
        #[serde(default)]
        players: Vec<Option<Participant>>,
    },
    Stop,
}

/// Engine for a newline-delimited JSON tick feed.
///
/// Each line is either `{"type":"tick","tick":N,"players":[...]}` or
/// `{"type":"stop"}`. Blank lines are skipped. Over a [`crate::tail::TailSource`]
/// a half-written line simply keeps `advance` waiting for the rest of it.
pub struct JsonLinesEngine<R> {
    reader: R,
    line: Vec<u8>,
    line_number: u64,
    tick: i64,
    players: Vec<Option<Participant>>,
    finished: bool,
}

impl<R> JsonLinesEngine<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Wraps a line reader. No bytes are read until the first `advance`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_number: 0,
            tick: 0,
            players: Vec::new(),
            finished: false,
        }
    }
}

impl<R> TickEngine for JsonLinesEngine<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn advance(&mut self) -> Result<bool, EngineError> {
        if self.finished {
            return Ok(false);
        }

        loop {
            self.line.clear();
            // Raw bytes: invalid UTF-8 is a decode failure, not an I/O one.
            let read = self.reader.read_until(b'\n', &mut self.line).await?;
            if read == 0 {
                // Only finite readers get here.
                self.finished = true;
                return Ok(false);
            }
            self.line_number += 1;

            let text = self.line.trim_ascii();
            if text.is_empty() {
                continue;
            }

            match serde_json::from_slice::<Record>(text) {
                Ok(Record::Tick { tick, players }) => {
                    self.tick = tick;
                    self.players = players;
                    return Ok(true);
                }
                Ok(Record::Stop) => {
                    self.finished = true;
                    return Ok(false);
                }
                Err(source) => {
                    return Err(EngineError::Malformed {
                        line: self.line_number,
                        source,
                    });
                }
            }
        }
    }

    fn current_tick(&self) -> i64 {
        self.tick
    }

    fn participants(&self) -> &[Option<Participant>] {
        &self.players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Team;
    use shared::Vec3;
    use tokio::io::BufReader;

    const PLAYER_A: &str = r#"{"name":"a","steamid":1,"team":2,"alive":true,"health":100,"armor":100,"helmet":true,"defuse_kit":false,"position":[1.0,2.0,3.0]}"#;
    const PLAYER_B: &str = r#"{"name":"b","steamid":2,"team":3,"alive":false,"health":0,"armor":0,"helmet":false,"defuse_kit":true,"position":[4.0,5.0,6.0]}"#;

    fn engine(feed: String) -> JsonLinesEngine<BufReader<std::io::Cursor<Vec<u8>>>> {
        JsonLinesEngine::new(BufReader::new(std::io::Cursor::new(feed.into_bytes())))
    }

    #[tokio::test]
    async fn test_advances_through_ticks_then_stops() {
        let feed = format!(
            "{{\"type\":\"tick\",\"tick\":10,\"players\":[{a}]}}\n\n{{\"type\":\"tick\",\"tick\":11,\"players\":[{a},null,{b}]}}\n{{\"type\":\"stop\"}}\n{{\"type\":\"tick\",\"tick\":12}}\n",
            a = PLAYER_A,
            b = PLAYER_B
        );
        let mut engine = engine(feed);

        assert!(engine.advance().await.unwrap());
        assert_eq!(engine.current_tick(), 10);
        assert_eq!(engine.participants().len(), 1);

        assert!(engine.advance().await.unwrap());
        assert_eq!(engine.current_tick(), 11);
        let players = engine.participants();
        assert_eq!(players.len(), 3);
        assert!(players[1].is_none());
        let b = players[2].as_ref().unwrap();
        assert_eq!(b.team, Team::CounterTerrorists);
        assert!(b.defuse_kit);
        assert_eq!(b.position, Vec3::new(4.0, 5.0, 6.0));

        assert!(!engine.advance().await.unwrap());
        // Stays finished, the tick after the stop record is never read.
        assert!(!engine.advance().await.unwrap());
        assert_eq!(engine.current_tick(), 11);
    }

    #[tokio::test]
    async fn test_tick_without_players_is_empty() {
        let mut engine = engine("{\"type\":\"tick\",\"tick\":1}\n".to_string());
        assert!(engine.advance().await.unwrap());
        assert!(engine.participants().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_reports_line_number() {
        let feed = format!(
            "{{\"type\":\"tick\",\"tick\":1,\"players\":[{}]}}\n{{\"type\":\"tick\",\"tick\":\n",
            PLAYER_A
        );
        let mut engine = engine(feed);

        assert!(engine.advance().await.unwrap());
        match engine.advance().await {
            Err(EngineError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_malformed() {
        let bytes = b"\xff\xfe garbage\n".to_vec();
        let mut engine = JsonLinesEngine::new(BufReader::new(std::io::Cursor::new(bytes)));

        match engine.advance().await {
            Err(EngineError::Malformed { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_of_finite_reader_is_end_of_stream() {
        let mut engine = engine(String::new());
        assert!(!engine.advance().await.unwrap());
    }
}
