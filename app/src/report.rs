use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use common::{as_binary, BITS_IN_BYTE};
use itertools::Itertools;
use tracing::info;
use ucode::Report;

const BYTE: usize = BITS_IN_BYTE as usize;

/// A report written to its own file once every opcode has been seen.
pub trait ReportFile: Report {
    fn file_name(&self) -> &'static str;

    fn render(&self, w: &mut dyn Write) -> io::Result<()>;
}

fn save(target: &Path, report: &dyn ReportFile) -> io::Result<()> {
    let path: PathBuf = target.join(report.file_name());
    info!(path = %path.display(), "writing report");
    let mut w = BufWriter::new(File::create(&path)?);
    report.render(&mut w)?;
    w.flush()
}

/// Opcodes no instruction claims.
#[derive(Default)]
pub struct Available {
    unused: BTreeSet<u32>,
}

impl Report for Available {
    fn unused_code(&mut self, code: u32) {
        self.unused.insert(code);
    }

    fn used_code(&mut self, _code: u32, _names: &[&str]) {}

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReportFile for Available {
    fn file_name(&self) -> &'static str {
        "AvailableCodes.txt"
    }

    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "Hex\t\tDec\t\t Binary")?;
        for code in &self.unused {
            writeln!(w, "0x{:02x}\t{:03}\t\t{}", code, code, as_binary(*code, BYTE))?;
        }
        writeln!(w)?;
        writeln!(w, "{} OpCodes available", self.unused.len())
    }
}

#[derive(Default)]
pub struct ByCode {
    codes: BTreeMap<u32, Vec<String>>,
}

impl Report for ByCode {
    fn unused_code(&mut self, _code: u32) {}

    fn used_code(&mut self, code: u32, names: &[&str]) {
        self.codes.insert(code, names.iter().map(|n| n.to_string()).collect());
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReportFile for ByCode {
    fn file_name(&self) -> &'static str {
        "OpCodes.txt"
    }

    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "Hex\t\tDec\t\t Binary\t\tInstruction(s)")?;
        for (code, names) in &self.codes {
            writeln!(w, "0x{:02x}\t{:03}\t\t{}\t{}", code, code, as_binary(*code, BYTE), names.iter().join(", "))?;
        }
        writeln!(w)?;
        writeln!(w, "{} OpCodes defined", self.codes.len())
    }
}

#[derive(Default)]
pub struct ByInstruction {
    names: BTreeMap<String, BTreeSet<u32>>,
}

impl ByInstruction {
    /// Instructions sharing exactly the same opcodes are listed together.
    fn merged(&self) -> BTreeMap<String, &BTreeSet<u32>> {
        let mut merged = BTreeMap::new();
        let mut reverse: BTreeMap<&BTreeSet<u32>, String> = BTreeMap::new();

        for (name, codes) in &self.names {
            let name = match reverse.get(codes) {
                Some(existing) => {
                    merged.remove(existing);
                    format!("{}, {}", existing, name)
                }
                None => name.clone(),
            };
            merged.insert(name.clone(), codes);
            reverse.insert(codes, name);
        }

        merged
    }
}

impl Report for ByInstruction {
    fn unused_code(&mut self, _code: u32) {}

    fn used_code(&mut self, code: u32, names: &[&str]) {
        for name in names {
            self.names.entry(name.to_string()).or_default().insert(code);
        }
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReportFile for ByInstruction {
    fn file_name(&self) -> &'static str {
        "Instructions.txt"
    }

    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let merged = self.merged();
        writeln!(w, "Name\tHex\t\tDec\t\t Binary")?;
        for (name, codes) in &merged {
            writeln!(w, "{}", name)?;
            for code in codes.iter() {
                writeln!(w, "\t\t0x{:02x}\t{:03}\t\t{}", code, code, as_binary(*code, BYTE))?;
            }
            writeln!(w)?;
        }
        writeln!(w)?;
        writeln!(w, "{} instructions defined", merged.len())
    }
}

/// Every report, saved to the target directory on close.
pub struct Reporter {
    target: PathBuf,
    reports: Vec<Box<dyn ReportFile>>,
}

impl Reporter {
    pub fn new(target: &Path) -> Reporter {
        Reporter {
            target: target.to_owned(),
            reports: vec![
                Box::new(Available::default()),
                Box::new(ByCode::default()),
                Box::new(ByInstruction::default()),
            ],
        }
    }
}

impl Report for Reporter {
    fn unused_code(&mut self, code: u32) {
        self.reports.iter_mut().for_each(|r| r.unused_code(code));
    }

    fn used_code(&mut self, code: u32, names: &[&str]) {
        self.reports.iter_mut().for_each(|r| r.used_code(code, names));
    }

    fn close(&mut self) -> io::Result<()> {
        for mut report in self.reports.drain(..) {
            report.close()?;
            save(&self.target, report.as_ref())?;
        }
        Ok(())
    }
}
