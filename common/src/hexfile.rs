use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};

/// Entries written per data line.
const ENTRIES_PER_LINE: usize = 16;

/// Shortest repeat worth writing as a run.
const MIN_RUN: usize = 4;

pub enum HexFileLine {
    Data(Vec<HexFileData>),
    Comment(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum HexFileData {
    Byte(u8),
    Run(u32, u8),
}

/// A ROM image in the Logisim "v2.0 raw" format.
pub struct HexFile {
    pub lines: Vec<HexFileLine>,
}

fn invalid(message: String) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, message)
}

impl HexFile {
    pub const fn header() -> &'static str {
        "v2.0 raw"
    }

    pub fn from_bytes(comments: &[String], bytes: &[u8]) -> HexFile {
        let mut lines: Vec<HexFileLine> = comments.iter()
            .map(|c| HexFileLine::Comment(c.clone()))
            .collect();

        let mut data = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let value = bytes[i];
            let run = bytes[i..].iter().take_while(|b| **b == value).count();
            if run >= MIN_RUN {
                data.push(HexFileData::Run(run as u32, value));
                i += run;
            } else {
                data.push(HexFileData::Byte(value));
                i += 1;
            }

            if data.len() == ENTRIES_PER_LINE {
                lines.push(HexFileLine::Data(std::mem::take(&mut data)));
            }
        }
        if !data.is_empty() {
            lines.push(HexFileLine::Data(data));
        }

        HexFile { lines }
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for line in &self.lines {
            if let HexFileLine::Data(data) = line {
                for data in data {
                    match data {
                        HexFileData::Byte(b) => bytes.push(*b),
                        HexFileData::Run(count, b) => {
                            bytes.extend(std::iter::repeat(*b).take(*count as usize));
                        }
                    }
                }
            }
        }

        bytes
    }

    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "{}", HexFile::header())?;
        for line in &self.lines {
            match line {
                HexFileLine::Comment(text) => writeln!(w, "# {}", text)?,
                HexFileLine::Data(data) => {
                    let blocks: Vec<String> = data.iter()
                        .map(|d| match d {
                            HexFileData::Byte(b) => format!("{:02x}", b),
                            HexFileData::Run(count, b) => format!("{}*{:02x}", count, b),
                        })
                        .collect();
                    writeln!(w, "{}", blocks.join(" "))?;
                }
            }
        }
        w.flush()
    }

    pub fn read<R: Read>(r: R) -> io::Result<HexFile> {
        let file = BufReader::new(r);
        let mut lines = file.lines();

        let header = lines.next().transpose()?;
        if header.as_deref() != Some(HexFile::header()) {
            return Err(invalid(format!("missing '{}' header", HexFile::header())));
        }

        let mut parsed = Vec::new();

        for line in lines {
            let line = line?;
            let line = line.trim();

            if let Some(comment) = line.strip_prefix('#') {
                parsed.push(HexFileLine::Comment(comment.trim_start().to_string()));
                continue;
            }

            let mut data = Vec::new();

            for block in line.split_whitespace() {
                let parse = |text: &str, radix| u32::from_str_radix(text, radix)
                    .map_err(|e| invalid(format!("bad block '{}': {}", block, e)));

                data.push(match block.split_once('*') {
                    Some((count, value)) => HexFileData::Run(parse(count, 10)?, parse(value, 16)? as u8),
                    None => HexFileData::Byte(parse(block, 16)? as u8),
                });
            }

            parsed.push(HexFileLine::Data(data));
        }

        Ok(HexFile {
            lines: parsed,
        })
    }
}
