use std::io::{Result as IoResult, Write};

const BYTES_PER_LINE: usize = 16;
const GROUP: usize = 8;

/// Streaming hex formatter: 16 bytes per line in two groups of 8, followed
/// by an ASCII gutter with `.` for non-printable bytes.
#[derive(Debug, Default)]
pub struct HexDumper {
    count: usize,
    ascii: String,
}

impl HexDumper {
    pub fn new() -> Self {
        HexDumper::default()
    }

    /// Writes one byte of the dump. Emits the ASCII gutter and a newline
    /// once a full line of 16 bytes has accumulated.
    pub fn push<W: Write>(&mut self, byte: u8, out: &mut W) -> IoResult<()> {
        write!(out, "{:02x} ", byte)?;
        self.count += 1;
        self.ascii.push(printable(byte));
        if self.count % GROUP == 0 {
            write!(out, "  ")?;
        }
        if self.count % BYTES_PER_LINE == 0 {
            writeln!(out, "{}  {}", &self.ascii[..GROUP], &self.ascii[GROUP..])?;
            self.ascii.clear();
            self.count = 0;
        }
        Ok(())
    }

    /// Pads and emits a partial final line, if any.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> IoResult<()> {
        if self.count == 0 {
            return Ok(());
        }
        for n in self.count..BYTES_PER_LINE {
            write!(out, "   ")?;
            if (n + 1) % GROUP == 0 {
                write!(out, "  ")?;
            }
        }
        let (first, rest) = if self.ascii.len() > GROUP {
            self.ascii.split_at(GROUP)
        } else {
            (self.ascii.as_str(), "")
        };
        writeln!(out, "{}  {}", first, rest)?;
        self.ascii.clear();
        self.count = 0;
        Ok(())
    }
}

fn printable(byte: u8) -> char {
    if (b' '..=b'~').contains(&byte) {
        byte as char
    } else {
        '.'
    }
}
