use super::command::Command;
use crate::error::{MarketError, Result};
use std::io::{BufRead, BufReader, Read};

/// Reads marketplace commands from a JSON-lines source.
///
/// Each non-blank line holds one command object. A malformed line yields an
/// `InvalidInput` error for that line only; reading carries on with the next.
pub struct CommandReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily reads and decodes commands, so large
    /// replay files are streamed rather than loaded whole.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .lines()
            .enumerate()
            .filter(|(_, line)| !matches!(line, Ok(text) if text.trim().is_empty()))
            .map(|(index, line)| {
                let line = line?;
                serde_json::from_str(&line).map_err(|e| {
                    MarketError::InvalidInput(format!("line {}: {e}", index + 1))
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderStatus, OrderUpdate};

    const ADMIN: &str = r#"{"user_id":"00000000-0000-0000-0000-000000000001","role":"ADMIN"}"#;

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{{\"op\":\"cancel_order\",\"caller\":{ADMIN},\"order_id\":\"00000000-0000-0000-0000-0000000000a1\"}}\n\
             \n\
             {{\"op\":\"transition_order\",\"caller\":{ADMIN},\"order_id\":\"00000000-0000-0000-0000-0000000000a1\",\
             \"updates\":[{{\"field\":\"status\",\"value\":\"READY\"}}]}}\n"
        );
        let results: Vec<Result<Command>> = CommandReader::new(data.as_bytes()).commands().collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().op(), "cancel_order");
        match results[1].as_ref().unwrap() {
            Command::TransitionOrder { updates, .. } => {
                assert_eq!(updates, &vec![OrderUpdate::Status(OrderStatus::OutForDelivery)]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_reader_malformed_line_does_not_stop_stream() {
        let data = format!(
            "{{\"op\":\"launch_rocket\"}}\n\
             {{\"op\":\"transition_order\",\"caller\":{ADMIN},\"order_id\":\"00000000-0000-0000-0000-0000000000a1\",\
             \"updates\":[{{\"field\":\"user_id\",\"value\":\"x\"}}]}}\n\
             {{\"op\":\"record_payout\",\"caller\":{ADMIN},\"rental_id\":\"00000000-0000-0000-0000-0000000000b1\"}}\n"
        );
        let results: Vec<Result<Command>> = CommandReader::new(data.as_bytes()).commands().collect();

        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Err(MarketError::InvalidInput(ref m)) if m.starts_with("line 1")));
        assert!(matches!(results[1], Err(MarketError::InvalidInput(_))));
        assert!(results[2].is_ok());
    }
}
