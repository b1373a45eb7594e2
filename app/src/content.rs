use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use common::{as_binary, binary_width, hexfile::HexFile, GlobalData, InputPin, InputPins, OutputPins, Rom, BITS_IN_BYTE};
use tracing::info;
use ucode::{Content, ContentEntry, MicroCode};

const BYTE: usize = BITS_IN_BYTE as usize;

/// Lines between repeated headers of the map.
const SECTION_SIZE: usize = 48;
const OPCODE_WIDTH: usize = 15;
const ROM_DATA_WIDTH: usize = 11;
const ADDRESS_HEX_WIDTH: usize = 6;

/// Data bytes per S-record.
const SREC_LENGTH: usize = 16;

/// Longest S0 header that fits in a record.
const SREC_MAX_HEADER: usize = 252;

pub const MAP_FILE: &str = "Eeprom_map.txt";

/// Lines naming the project, written at the top of every ROM image.
fn headers(global: &GlobalData, rom: Rom) -> Vec<String> {
    let mut headers = vec![
        format!("Name: {}", global.name()),
        format!("Version: {}", global.version()),
        format!("ROM: {}", rom.number()),
    ];
    headers.extend(global.descriptions().iter().cloned());
    headers
}

/// Fixed width columns of flag names, blank where the flag is clear.
struct FlagFormatter {
    flags: Vec<InputPin>,
    width: usize,
}

impl FlagFormatter {
    fn new(inputs: &InputPins) -> FlagFormatter {
        let mut flags = inputs.flags().to_vec();
        flags.sort();
        let width = flags.iter().map(|f| f.name().len()).max().unwrap_or(0) + 1;
        FlagFormatter { flags, width }
    }

    fn width(&self) -> usize {
        self.width * self.flags.len()
    }

    fn format<'e>(&self, active: impl Iterator<Item = &'e InputPin>) -> String {
        let active: Vec<&InputPin> = active.collect();
        self.flags.iter()
            .map(|f| {
                let name = if active.contains(&f) { f.name() } else { "" };
                format!("{:<width$}", name, width = self.width)
            })
            .collect()
    }
}

/// Human readable listing of every address: opcode, flags, cycle, address and data.
pub struct MapWriter<W: Write> {
    writer: W,
    flags: FlagFormatter,
    address_lines: usize,
    header: String,
    lines: usize,
}

impl<W: Write> MapWriter<W> {
    pub fn new(writer: W, global: &GlobalData, inputs: &InputPins, outputs: &OutputPins) -> MapWriter<W> {
        let flags = FlagFormatter::new(inputs);
        let address_lines = global.address_lines() as usize;

        let mut header = format!(
            "{:<opcode$}{:<flags$}M    {:<address$}   ",
            "OpCode",
            "Flags",
            "Address",
            opcode = OPCODE_WIDTH,
            flags = flags.width() + 2,
            address = binary_width(address_lines) + ADDRESS_HEX_WIDTH);
        for rom in outputs.roms() {
            header.push_str(&format!("{:<width$}      ", rom.to_string(), width = ROM_DATA_WIDTH));
        }
        header.push_str("Note");

        MapWriter { writer, flags, address_lines, header, lines: 0 }
    }
}

impl<W: Write> Content for MapWriter<W> {
    fn entry(&mut self, entry: &ContentEntry<'_>) -> io::Result<()> {
        if self.lines % SECTION_SIZE == 0 {
            if self.lines != 0 {
                writeln!(self.writer)?;
            }
            writeln!(self.writer, "{}", self.header)?;
        }
        self.lines += 1;

        let data: String = entry.data.iter()
            .map(|(_, byte)| format!("{} ({:02x})   ", as_binary(*byte as u32, BYTE), byte))
            .collect();
        writeln!(
            self.writer,
            "{} ({:02x}) {} {:2}    {} ({:04x})   {}{}",
            as_binary(entry.opcode, BYTE),
            entry.opcode,
            self.flags.format(entry.active_flags()),
            entry.cycle,
            as_binary(entry.address, self.address_lines),
            entry.address,
            data,
            entry.annotation)
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Collects the content of one ROM, starting from `initial` and zero beyond it.
struct Image {
    rom: Rom,
    headers: Vec<String>,
    bytes: Vec<u8>,
}

impl Image {
    fn new(global: &GlobalData, rom: Rom, initial: &[u8]) -> Image {
        let mut bytes = initial.to_vec();
        bytes.resize(global.rom_size(), 0);
        Image { rom, headers: headers(global, rom), bytes }
    }

    fn store(&mut self, entry: &ContentEntry<'_>) {
        if let (Some(slot), Some(byte)) = (self.bytes.get_mut(entry.address as usize), entry.byte(self.rom)) {
            *slot = byte;
        }
    }
}

/// One ROM in the Logisim `v2.0 raw` format.
pub struct HexWriter<W: Write> {
    writer: W,
    image: Image,
}

impl<W: Write> HexWriter<W> {
    pub fn new(writer: W, global: &GlobalData, rom: Rom, initial: &[u8]) -> HexWriter<W> {
        HexWriter { writer, image: Image::new(global, rom, initial) }
    }
}

impl<W: Write> Content for HexWriter<W> {
    fn entry(&mut self, entry: &ContentEntry<'_>) -> io::Result<()> {
        self.image.store(entry);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        HexFile::from_bytes(&self.image.headers, &self.image.bytes).write(&mut self.writer)
    }
}

/// Writes one Motorola S-record: type, count, address, data and checksum.
fn srec(w: &mut dyn Write, kind: u8, address: u32, address_bytes: usize, data: &[u8]) -> io::Result<()> {
    let mut bytes = vec![(address_bytes + data.len() + 1) as u8];
    bytes.extend_from_slice(&address.to_be_bytes()[4 - address_bytes..]);
    bytes.extend_from_slice(data);
    let checksum = !bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b));

    write!(w, "S{}", kind)?;
    for byte in &bytes {
        write!(w, "{:02X}", byte)?;
    }
    writeln!(w, "{:02X}", checksum)
}

/// One ROM as Motorola S-records, S1/S9 up to 64K and S2/S8 beyond.
pub struct SRecWriter<W: Write> {
    writer: W,
    image: Image,
}

impl<W: Write> SRecWriter<W> {
    pub fn new(writer: W, global: &GlobalData, rom: Rom, initial: &[u8]) -> SRecWriter<W> {
        SRecWriter { writer, image: Image::new(global, rom, initial) }
    }
}

impl<W: Write> Content for SRecWriter<W> {
    fn entry(&mut self, entry: &ContentEntry<'_>) -> io::Result<()> {
        self.image.store(entry);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let (data, end, address_bytes) = if self.image.bytes.len() > 0x10000 { (2, 8, 3) } else { (1, 9, 2) };

        for header in &self.image.headers {
            let header = header.as_bytes();
            srec(&mut self.writer, 0, 0, 2, &header[..header.len().min(SREC_MAX_HEADER)])?;
        }
        for (i, chunk) in self.image.bytes.chunks(SREC_LENGTH).enumerate() {
            srec(&mut self.writer, data, (i * SREC_LENGTH) as u32, address_bytes, chunk)?;
        }
        srec(&mut self.writer, end, 0, address_bytes, &[])?;
        self.writer.flush()
    }
}

/// Feeds every entry to the map and to a hex and S-record writer per ROM. The ROM
/// writers start from the materialised images, so addresses on unwired lines keep
/// the halt byte.
pub struct ContentGenerator {
    targets: Vec<(String, Box<dyn Content>)>,
}

impl ContentGenerator {
    pub fn create(target: &Path, microcode: &MicroCode<'_>) -> io::Result<ContentGenerator> {
        let create = |name: &str| -> io::Result<BufWriter<File>> {
            Ok(BufWriter::new(File::create(target.join(name))?))
        };
        let (global, outputs) = (microcode.global(), microcode.outputs());

        let map = MapWriter::new(create(MAP_FILE)?, global, microcode.inputs(), outputs);
        let mut targets = vec![(MAP_FILE.to_owned(), Box::new(map) as Box<dyn Content>)];
        for rom in outputs.roms() {
            let initial = microcode.eeprom().image(rom).unwrap_or_default();

            let hex = rom.file_name("hex");
            let writer = HexWriter::new(create(&hex)?, global, rom, initial);
            targets.push((hex, Box::new(writer) as Box<dyn Content>));

            let srec = rom.file_name("srec");
            let writer = SRecWriter::new(create(&srec)?, global, rom, initial);
            targets.push((srec, Box::new(writer) as Box<dyn Content>));
        }

        Ok(ContentGenerator { targets })
    }
}

impl Content for ContentGenerator {
    fn entry(&mut self, entry: &ContentEntry<'_>) -> io::Result<()> {
        for (_, target) in self.targets.iter_mut() {
            target.entry(entry)?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        for (name, mut target) in self.targets.drain(..) {
            info!(file = name.as_str(), "generating");
            target.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assemble::Project;
    use common::hexfile::HexFileLine;
    use std::{fs, path::PathBuf};

    fn demo() -> Project {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/simple");
        Project::load(&path).unwrap()
    }

    #[test]
    fn records() {
        let mut out = Vec::new();
        srec(&mut out, 0, 0, 2, b"HDR").unwrap();
        srec(&mut out, 9, 0, 2, &[]).unwrap();
        srec(&mut out, 1, 0x0038, 2, &[0x4b, 0x4c, 0x4d]).unwrap();
        assert_eq!(
            "S00600004844521B\nS9030000FC\nS10600384B4C4DDD\n",
            String::from_utf8(out).unwrap());
    }

    #[test]
    fn map() {
        let project = demo();
        let microcode = project.compile().unwrap();
        let mut out = Vec::new();
        {
            let mut map = MapWriter::new(&mut out, project.global(), project.inputs(), project.outputs());
            microcode.generate(&mut map).unwrap();
            map.close().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        // 16 opcodes, 4 flag states and 8 cycles, with a header every 48 entries
        assert_eq!(512 + 11 + 10, lines.len());
        assert!(lines[0].starts_with("OpCode         Flags         M    Address              ROM_1"));
        assert!(lines[0].ends_with("ROM_2            Note"));
        assert_eq!("", lines[49]);
        assert_eq!(lines[0], lines[50]);

        let lda = format!(
            "0000 0001 (01) {} {:2}    00 0000 1010 (000a)   1100 1000 (c8)   0000 0000 (00)   {}",
            " ".repeat(12),
            2,
            "opCode 0x01 (001), cycle 02: LDA");
        assert!(lines.contains(&lda.as_str()), "{}", lda);

        let jc = lines.iter()
            .find(|l| l.starts_with(&format!("0000 0111 (07) carry{} 2", " ".repeat(7))))
            .unwrap();
        assert!(jc.ends_with("cycle 02: JC"));
    }

    #[test]
    fn hex_image() {
        let project = demo();
        let microcode = project.compile().unwrap();
        let mut out = Vec::new();
        {
            let mut hex = HexWriter::new(&mut out, project.global(), Rom::Rom1, &[]);
            microcode.generate(&mut hex).unwrap();
            hex.close().unwrap();
        }

        let file = HexFile::read(out.as_slice()).unwrap();
        assert_eq!(microcode.eeprom().image(Rom::Rom1).unwrap(), file.bytes().as_slice());
        let comments: Vec<&str> = file.lines.iter()
            .filter_map(|l| match l {
                HexFileLine::Comment(c) => Some(c.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(&["Name: SAP-1", "Version: 1.0", "ROM: 1"][..], &comments[..3]);
    }

    #[test]
    fn srec_image() {
        let project = demo();
        let microcode = project.compile().unwrap();
        let mut out = Vec::new();
        {
            let mut srec = SRecWriter::new(&mut out, project.global(), Rom::Rom2, &[]);
            microcode.generate(&mut srec).unwrap();
            srec.close().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        // name, version, rom and two description lines
        assert_eq!(5 + 1024 / 16 + 1, lines.len());
        assert!(lines[..5].iter().all(|l| l.starts_with("S0")));
        assert!(lines[5].starts_with("S1130000"));
        assert!(lines[6].starts_with("S1130010"));
        assert_eq!("S9030000FC", lines[lines.len() - 1]);
    }

    #[test]
    fn large_srec() {
        let global = GlobalData::new("Big", "1", 16).unwrap();
        let mut out = Vec::new();
        {
            let mut srec = SRecWriter::new(&mut out, &global, Rom::Rom1, &[]);
            srec.close().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(3 + (1 << 17) / 16 + 1, lines.len());
        assert!(lines[3].starts_with("S214000000"));
        assert_eq!("S804000000FB", lines[lines.len() - 1]);
    }

    #[test]
    fn unwired_lines_keep_halt() {
        let dir = tempfile::tempdir().unwrap();
        let source = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/simple");
        for name in ["project.txt", "input_pins.txt", "output_pins.txt"] {
            fs::copy(source.join(name), dir.path().join(name)).unwrap();
        }
        // no [*] group, so the halt byte only releases /HLT
        fs::write(dir.path().join("code.txt"), "[fetch]\n  CO MI\n  RO II CE\n[HALT]\nIR 1111\n  HLT\n").unwrap();

        let project = Project::load(dir.path()).unwrap();
        let microcode = project.compile().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        let mut generator = ContentGenerator::create(&target, &microcode).unwrap();
        microcode.generate(&mut generator).unwrap();
        generator.close().unwrap();

        // A9 is not wired to any input
        let image = microcode.eeprom().image(Rom::Rom1).unwrap();
        assert_eq!(0x80, image[0x200]);

        let hex = HexFile::read(fs::read(target.join("Rom1.hex")).unwrap().as_slice()).unwrap();
        assert_eq!(image, hex.bytes().as_slice());

        let srec = fs::read_to_string(target.join("Rom1.srec")).unwrap();
        let record = srec.lines().find(|l| l.starts_with("S1130200")).unwrap();
        assert!(record.starts_with(&format!("S1130200{}", "80".repeat(16))), "{}", record);
    }

    #[test]
    fn generator_files() {
        let dir = tempfile::tempdir().unwrap();
        let project = demo();
        let microcode = project.compile().unwrap();
        let mut generator = ContentGenerator::create(dir.path(), &microcode).unwrap();
        microcode.generate(&mut generator).unwrap();
        generator.close().unwrap();

        for name in [MAP_FILE, "Rom1.hex", "Rom1.srec", "Rom2.hex", "Rom2.srec"] {
            assert!(dir.path().join(name).is_file(), "{}", name);
        }
        assert!(!dir.path().join("Rom3.hex").exists());
        let hex = fs::read_to_string(dir.path().join("Rom2.hex")).unwrap();
        assert!(hex.starts_with("v2.0 raw\n# Name: SAP-1\n"));
    }
}
