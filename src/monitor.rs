use std::io::{Read, Write};

use crate::error::MonitorError;
use crate::extractor::{FieldExtractor, ParseOutcome};
use crate::hexdump::HexDumper;

/// Configuration for the monitor loop
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Show a hex dump instead of echoing bytes verbatim
    pub hex: bool,
    /// Flush the echo output after every byte (wanted on a terminal,
    /// wasteful into a pipe)
    pub flush_every_byte: bool,
    /// Longest token buffer kept between `<` and `>`; an overflowing buffer
    /// is discarded like any malformed token
    pub max_token_length: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            hex: false,
            flush_every_byte: false,
            max_token_length: 65536, // 64KB
        }
    }
}

/// Counters for one monitoring run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MonitorStats {
    pub bytes_read: u64,
    pub tokens_seen: u64,
    pub tokens_dropped: u64,
    pub fields_discovered: u64,
    pub rows_written: u64,
}

/// Drives the byte loop: echoes the stream and accumulates `<...>` tokens
/// for the extractor.
///
/// A `<` restarts the token buffer unconditionally, so garbage before a
/// token never poisons it. A `>` closes the buffer and hands it to
/// `FieldExtractor::parse_buffer`.
pub struct StreamMonitor {
    extractor: FieldExtractor,
    config: MonitorConfig,
    buffer: String,
}

impl StreamMonitor {
    pub fn new(extractor: FieldExtractor, config: MonitorConfig) -> Self {
        StreamMonitor {
            extractor,
            config,
            buffer: String::new(),
        }
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Consumes `input` until EOF or a read timeout, echoing to `output`.
    ///
    /// Timeouts are how serial reads signal silence; both end the run
    /// normally rather than erroring.
    pub fn run<R: Read, W: Write>(
        &mut self,
        input: R,
        output: &mut W,
    ) -> Result<MonitorStats, MonitorError> {
        let mut stats = MonitorStats::default();
        let mut dumper = HexDumper::new();

        for byte_result in input.bytes() {
            let byte = match byte_result {
                Ok(byte) => byte,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    eprintln!("sertap: no data");
                    break;
                }
                Err(e) => return Err(MonitorError::Io(e)),
            };
            stats.bytes_read += 1;

            if self.config.hex {
                dumper.push(byte, output)?;
            } else {
                output.write_all(&[byte])?;
            }
            if self.config.flush_every_byte {
                output.flush()?;
            }

            self.feed(byte, &mut stats)?;
        }

        if self.config.hex {
            dumper.finish(output)?;
        }
        output.flush()?;
        Ok(stats)
    }

    /// Advances the token buffer by one byte and parses on `>`.
    fn feed(&mut self, byte: u8, stats: &mut MonitorStats) -> Result<(), MonitorError> {
        let ch = char::from(byte);
        if ch == '<' {
            self.buffer.clear();
        }
        if self.buffer.len() < self.config.max_token_length {
            self.buffer.push(ch);
        }
        if ch == '>' {
            stats.tokens_seen += 1;
            match self.extractor.parse_buffer(&self.buffer)? {
                ParseOutcome::RowStarted => {}
                ParseOutcome::RowFlushed => stats.rows_written += 1,
                ParseOutcome::FieldRecorded { new_field } => {
                    if new_field {
                        stats.fields_discovered += 1;
                    }
                }
                ParseOutcome::Ignored => stats.tokens_dropped += 1,
            }
            self.buffer.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn monitor(dir: &TempDir, config: MonitorConfig) -> StreamMonitor {
        let extractor =
            FieldExtractor::new(dir.path().join("fields.txt"), dir.path().join("stats.tsv"))
                .unwrap();
        StreamMonitor::new(extractor, config)
    }

    #[test]
    fn test_plain_echo_passes_bytes_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut mon = monitor(&dir, MonitorConfig::default());
        let mut out = Vec::new();

        let stats = mon
            .run(Cursor::new(b"hello <a=1> world".to_vec()), &mut out)
            .unwrap();

        assert_eq!(out, b"hello <a=1> world");
        assert_eq!(stats.bytes_read, 17);
        assert_eq!(stats.tokens_seen, 1);
        assert_eq!(stats.fields_discovered, 1);
    }

    #[test]
    fn test_tokens_extracted_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut mon = monitor(&dir, MonitorConfig::default());
        let mut out = Vec::new();

        let stats = mon
            .run(
                Cursor::new(b"boot ok\n<start><temp=21.5><rssi=-70><complete>\n".to_vec()),
                &mut out,
            )
            .unwrap();

        assert_eq!(stats.rows_written, 1);
        assert_eq!(stats.fields_discovered, 2);
        assert_eq!(stats.tokens_dropped, 0);
        assert_eq!(
            fs::read_to_string(dir.path().join("stats.tsv")).unwrap(),
            "temp\trssi\n21.5\t-70\n"
        );
    }

    #[test]
    fn test_open_bracket_restarts_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut mon = monitor(&dir, MonitorConfig::default());
        let mut out = Vec::new();

        // The truncated "<a" token is abandoned when the next "<" arrives.
        let stats = mon.run(Cursor::new(b"x<a<b=1>".to_vec()), &mut out).unwrap();

        assert_eq!(stats.tokens_seen, 1);
        assert_eq!(stats.tokens_dropped, 0);
        assert!(mon.extractor().registry().contains("b"));
        assert!(!mon.extractor().registry().contains("a"));
    }

    #[test]
    fn test_garbage_between_tokens_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut mon = monitor(&dir, MonitorConfig::default());
        let mut out = Vec::new();

        let stats = mon
            .run(Cursor::new(b"stray > close\n<bad>\n<a=1>".to_vec()), &mut out)
            .unwrap();

        // "stray >" closes a buffer that never saw "<"; "<bad>" has no "=".
        assert_eq!(stats.tokens_seen, 3);
        assert_eq!(stats.tokens_dropped, 2);
        assert_eq!(stats.fields_discovered, 1);
    }

    #[test]
    fn test_token_split_across_reads() {
        let dir = tempfile::tempdir().unwrap();
        let mut mon = monitor(&dir, MonitorConfig::default());
        let mut out = Vec::new();

        // Chained readers deliver the token in fragments.
        let input = Cursor::new(b"<te".to_vec())
            .chain(Cursor::new(b"mp=9".to_vec()))
            .chain(Cursor::new(b">".to_vec()));
        let stats = mon.run(input, &mut out).unwrap();

        assert_eq!(stats.tokens_seen, 1);
        assert!(mon.extractor().registry().contains("temp"));
    }

    #[test]
    fn test_oversized_buffer_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            max_token_length: 8,
            ..MonitorConfig::default()
        };
        let mut mon = monitor(&dir, config);
        let mut out = Vec::new();

        let stats = mon
            .run(Cursor::new(b"<aaaaaaaaaaaaaaaa=1>".to_vec()), &mut out)
            .unwrap();

        assert_eq!(stats.tokens_dropped, 1);
        assert!(mon.extractor().registry().is_empty());
    }

    #[test]
    fn test_hex_mode_dumps_instead_of_echoing() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            hex: true,
            ..MonitorConfig::default()
        };
        let mut mon = monitor(&dir, config);
        let mut out = Vec::new();

        let stats = mon
            .run(Cursor::new(b"<a=1>".to_vec()), &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("3c 61 3d 31 3e "));
        assert!(text.ends_with("<a=1>  \n"));
        // extraction still runs in hex mode
        assert_eq!(stats.fields_discovered, 1);
    }
}
