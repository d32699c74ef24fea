//! Persisted mount table (`/etc/fstab`) model.
//!
//! The table is kept as the original sequence of lines so that comments,
//! blank lines, ineligible records and anything we fail to parse survive a
//! rewrite byte-for-byte. Only record lines the engine decides to change are
//! re-rendered.

use std::fmt;
use std::path::{Path, PathBuf};

/// One record of a mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    /// `UUID=...`, `LABEL=...` or a device path
    pub device_spec: String,
    /// Mount point, with octal escapes decoded
    pub target: PathBuf,
    pub fs_type: String,
    /// Comma-separated options as written
    pub options: String,
    pub dump: u32,
    pub pass_number: u32,
}

impl MountRecord {
    /// Parse a record line. Returns `None` for comments, blanks and lines
    /// with fewer than four fields or non-numeric dump/pass columns.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return None;
        }

        let dump = match fields.get(4) {
            Some(v) => v.parse().ok()?,
            None => 0,
        };
        let pass_number = match fields.get(5) {
            Some(v) => v.parse().ok()?,
            None => 0,
        };

        Some(Self {
            device_spec: unescape(fields[0]),
            target: PathBuf::from(unescape(fields[1])),
            fs_type: fields[2].to_string(),
            options: fields[3].to_string(),
            dump,
            pass_number,
        })
    }

    /// Render as an aligned table line (no trailing newline)
    pub fn to_line(&self) -> String {
        format!(
            "{:<41} {:<15} {:<7} {:<31} {} {}",
            escape(&self.device_spec),
            escape(&self.target.to_string_lossy()),
            self.fs_type,
            self.options,
            self.dump,
            self.pass_number
        )
        .trim_end()
        .to_string()
    }
}

/// A line of the persisted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLine {
    Comment(String),
    Blank(String),
    Record { raw: String, record: MountRecord },
    /// Non-comment line that does not parse as a record
    Unparsed(String),
}

impl TableLine {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Blank(raw.to_string())
        } else if trimmed.starts_with('#') {
            Self::Comment(raw.to_string())
        } else {
            match MountRecord::parse(raw) {
                Some(record) => Self::Record {
                    raw: raw.to_string(),
                    record,
                },
                None => Self::Unparsed(raw.to_string()),
            }
        }
    }

    /// Text written back for this line
    pub fn as_text(&self) -> &str {
        match self {
            Self::Comment(raw) | Self::Blank(raw) | Self::Unparsed(raw) => raw.as_str(),
            Self::Record { raw, .. } => raw.as_str(),
        }
    }

    pub fn record(&self) -> Option<&MountRecord> {
        match self {
            Self::Record { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// How a line of the persisted table was terminated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    /// Last line of a file without a trailing newline
    Missing,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Missing => "",
        }
    }
}

/// Full contents of the persisted table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedTable {
    pub lines: Vec<TableLine>,
    /// Terminator of each entry in `lines`
    endings: Vec<LineEnding>,
}

impl PersistedTable {
    pub fn parse(content: &str) -> Self {
        let mut table = Self::default();
        for chunk in content.split_inclusive('\n') {
            let (text, ending) = if let Some(text) = chunk.strip_suffix("\r\n") {
                (text, LineEnding::CrLf)
            } else if let Some(text) = chunk.strip_suffix('\n') {
                (text, LineEnding::Lf)
            } else {
                (chunk, LineEnding::Missing)
            };
            table.lines.push(TableLine::parse(text));
            table.endings.push(ending);
        }
        table
    }

    pub fn records(&self) -> impl Iterator<Item = &MountRecord> {
        self.lines.iter().filter_map(TableLine::record)
    }

    /// First record mounted at `target`
    pub fn find(&self, target: &Path) -> Option<&MountRecord> {
        self.records().find(|r| r.target == target)
    }

    /// Replace the line at `index` with a freshly rendered record
    pub fn replace_record(&mut self, index: usize, record: MountRecord) {
        let raw = record.to_line();
        self.lines[index] = TableLine::Record { raw, record };
    }

    /// Append a record, terminated the way the rest of the file is
    pub fn push_record(&mut self, record: MountRecord) {
        let newline = self.newline();
        if let Some(last) = self.endings.last_mut() {
            if *last == LineEnding::Missing {
                *last = newline;
            }
        }
        let raw = record.to_line();
        self.lines.push(TableLine::Record { raw, record });
        self.endings.push(newline);
    }

    /// `\r\n` when the file already uses it, `\n` otherwise
    fn newline(&self) -> LineEnding {
        if self.endings.contains(&LineEnding::CrLf) {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    /// Every line followed by its original terminator
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, line) in self.lines.iter().enumerate() {
            out.push_str(line.as_text());
            let ending = self.endings.get(index).copied().unwrap_or_default();
            out.push_str(ending.as_str());
        }
        out
    }
}

impl fmt::Display for PersistedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Decode `\ooo` octal escapes used by fstab and mountinfo
pub fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encode characters that would split a whitespace-delimited field
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            ' ' => out.push_str("\\040"),
            '\t' => out.push_str("\\011"),
            '\n' => out.push_str("\\012"),
            '\\' => out.push_str("\\134"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# /etc/fstab: static file system information.
#
UUID=1111-aaaa /               ext4    relatime        0 1

/dev/xvdb      /rw             ext4    defaults,discard 0 2
none           swap            swap    sw              0 0
/dev/sdc1 /broken
";

    #[test]
    fn test_parse_classifies_lines() {
        let table = PersistedTable::parse(SAMPLE);
        assert_eq!(table.lines.len(), 7);
        assert!(matches!(table.lines[0], TableLine::Comment(_)));
        assert!(matches!(table.lines[3], TableLine::Blank(_)));
        assert!(matches!(table.lines[6], TableLine::Unparsed(_)));
        assert_eq!(table.records().count(), 3);

        let root = table.find(Path::new("/")).expect("root record");
        assert_eq!(root.device_spec, "UUID=1111-aaaa");
        assert_eq!(root.options, "relatime");
        assert_eq!(root.pass_number, 1);
    }

    #[test]
    fn test_render_preserves_untouched_lines() {
        let table = PersistedTable::parse(SAMPLE);
        assert_eq!(table.render(), SAMPLE);
    }

    #[test]
    fn test_render_keeps_line_terminators() {
        let crlf = "# header\r\nUUID=a /home ext4 relatime 0 2\r\n";
        assert_eq!(PersistedTable::parse(crlf).render(), crlf);

        let unterminated = "# header\nUUID=a /home ext4 relatime 0 2";
        assert_eq!(PersistedTable::parse(unterminated).render(), unterminated);
        assert_eq!(PersistedTable::parse("").render(), "");
    }

    #[test]
    fn test_rewritten_crlf_line_keeps_crlf() {
        let mut table = PersistedTable::parse("# header\r\nUUID=a /home ext4 relatime 0 2\r\n");
        let mut record = table.find(Path::new("/home")).expect("home").clone();
        record.options = "noatime".to_string();
        table.replace_record(1, record);

        let rendered = table.render();
        assert!(rendered.starts_with("# header\r\n"));
        assert!(rendered.contains(" noatime "));
        assert!(rendered.ends_with(" 0 2\r\n"));
        assert_eq!(rendered.matches('\n').count(), 2);
    }

    #[test]
    fn test_appending_terminates_unterminated_last_line() {
        let mut table = PersistedTable::parse("UUID=a / ext4 noatime 0 1");
        table.push_record(MountRecord {
            device_spec: "UUID=b".to_string(),
            target: PathBuf::from("/srv"),
            fs_type: "xfs".to_string(),
            options: "noatime".to_string(),
            dump: 0,
            pass_number: 2,
        });

        let rendered = table.render();
        let lines: Vec<&str> = rendered.split_inclusive('\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "UUID=a / ext4 noatime 0 1\n");
        assert!(lines[1].starts_with("UUID=b ") && lines[1].ends_with(" 0 2\n"));
    }

    #[test]
    fn test_record_defaults_dump_and_pass() {
        let record = MountRecord::parse("/dev/sda1 /data ext4 noatime").expect("record");
        assert_eq!(record.dump, 0);
        assert_eq!(record.pass_number, 0);
    }

    #[test]
    fn test_record_rejects_non_numeric_pass() {
        assert!(MountRecord::parse("/dev/sda1 /data ext4 noatime 0 x").is_none());
        assert!(MountRecord::parse("/dev/sda1 /data").is_none());
    }

    #[test]
    fn test_escaped_targets_round_trip() {
        let record =
            MountRecord::parse("/dev/sdb1 /mnt/My\\040Disk ext4 defaults 0 2").expect("record");
        assert_eq!(record.target, PathBuf::from("/mnt/My Disk"));

        let line = record.to_line();
        assert!(line.contains("/mnt/My\\040Disk"));
        assert_eq!(MountRecord::parse(&line), Some(record));
    }

    #[test]
    fn test_unescape_leaves_plain_backslashes() {
        assert_eq!(unescape("a\\040b"), "a b");
        assert_eq!(unescape("a\\9b"), "a\\9b");
        assert_eq!(unescape("tail\\04"), "tail\\04");
        assert_eq!(unescape("back\\134slash"), "back\\slash");
    }

    #[test]
    fn test_to_line_has_no_trailing_whitespace() {
        let record = MountRecord {
            device_spec: "UUID=abcd".to_string(),
            target: PathBuf::from("/home"),
            fs_type: "ext4".to_string(),
            options: "noatime".to_string(),
            dump: 0,
            pass_number: 2,
        };
        let line = record.to_line();
        assert!(line.starts_with("UUID=abcd "));
        assert!(line.ends_with(" 0 2"));
        assert_eq!(line, line.trim_end());
    }
}
