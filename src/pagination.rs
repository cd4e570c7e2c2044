use crate::importer::Message;
use crate::renderer::{self, NO_CONTENT};
use crate::utils::part_file_name;
use eyre::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lines charged for a fresh part's title block.
pub const PART_HEADER_LINES: usize = 5;

/// Estimated line cost of one message in a combined document:
/// header and blank, the content lines, then blank, separator, blank.
///
/// This is deliberately not a recount of what the renderer emits. Part
/// boundaries depend on it, so it must stay stable.
pub fn estimate_lines(msg: &Message) -> usize {
    let content = msg.body().unwrap_or(NO_CONTENT);
    2 + content.split('\n').count() + 3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Append to the part that is already open.
    Current,
    /// Close the open part (if any) and start this one.
    NewPart(usize),
}

/// Greedy sequential packing of message costs into parts of bounded size.
///
/// A new part starts when none is open yet, or when appending would push the
/// running count past `max_lines`. An oversized message therefore still gets a
/// part of its own.
#[derive(Debug)]
pub struct LinePacker {
    max_lines: usize,
    next_index: usize,
    current_lines: Option<usize>,
}

impl LinePacker {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            next_index: 1,
            current_lines: None,
        }
    }

    pub fn place(&mut self, cost: usize) -> Placement {
        let placement = match self.current_lines {
            Some(lines) if lines + cost <= self.max_lines => Placement::Current,
            _ => {
                let index = self.next_index;
                self.next_index += 1;
                self.current_lines = Some(PART_HEADER_LINES);
                Placement::NewPart(index)
            }
        };
        if let Some(lines) = self.current_lines.as_mut() {
            *lines += cost;
        }
        placement
    }

    /// Estimated lines in the open part.
    pub fn current_lines(&self) -> usize {
        self.current_lines.unwrap_or(0)
    }
}

/// What ended up in one part file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartReport {
    pub index: usize,
    pub path: PathBuf,
    pub messages: usize,
    /// Estimated, per [`estimate_lines`] plus the header charge.
    pub lines: usize,
}

struct OpenPart {
    index: usize,
    path: PathBuf,
    writer: BufWriter<File>,
    messages: usize,
}

/// Owns at most one open part file at a time.
///
/// Rotating or finishing flushes and closes the current part. If the writer is
/// dropped early (an error path), the `BufWriter` drop closes the handle.
pub struct PartWriter {
    dir: PathBuf,
    packer: LinePacker,
    open: Option<OpenPart>,
    finished: Vec<PartReport>,
}

impl PartWriter {
    pub fn new(dir: &Path, max_lines: usize) -> Self {
        Self {
            dir: dir.to_path_buf(),
            packer: LinePacker::new(max_lines),
            open: None,
            finished: Vec::new(),
        }
    }

    pub fn append(&mut self, msg: &Message) -> Result<()> {
        let cost = estimate_lines(msg);
        // lines before this message, for the report of the part being closed
        let before = self.packer.current_lines();
        if let Placement::NewPart(index) = self.packer.place(cost) {
            self.close_current(before)?;
            self.open_part(index)?;
        }

        let Some(part) = self.open.as_mut() else {
            unreachable!("packer always opens a part before the first message");
        };
        renderer::write_message_entry(&mut part.writer, msg)
            .wrap_err_with(|| format!("Failed to write message {}", msg.id))?;
        part.messages += 1;
        Ok(())
    }

    /// Close the last part and return every part written.
    pub fn finish(mut self) -> Result<Vec<PartReport>> {
        let lines = self.packer.current_lines();
        self.close_current(lines)?;
        Ok(self.finished)
    }

    fn open_part(&mut self, index: usize) -> Result<()> {
        let path = self.dir.join(part_file_name(index));
        let file = File::create(&path)
            .wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        renderer::write_part_header(&mut writer, index)
            .wrap_err_with(|| format!("Failed to write header of {}", path.display()))?;
        self.open = Some(OpenPart {
            index,
            path,
            writer,
            messages: 0,
        });
        Ok(())
    }

    fn close_current(&mut self, lines: usize) -> Result<()> {
        let Some(mut part) = self.open.take() else {
            return Ok(());
        };
        part.writer
            .flush()
            .wrap_err_with(|| format!("Failed to flush {}", part.path.display()))?;
        tracing::info!(
            "Created: {} ({} messages, {} lines)",
            part.path.display(),
            part.messages,
            lines
        );
        self.finished.push(PartReport {
            index: part.index,
            path: part.path,
            messages: part.messages,
            lines,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, content: Option<&str>) -> Message {
        Message {
            id,
            content: content.map(str::to_string),
            private_key: None,
            is_private: false,
            timestamp: None,
            user_id: None,
            comment_count: 0,
        }
    }

    #[test]
    fn estimate_counts_newline_separated_lines() {
        assert_eq!(estimate_lines(&message(1, Some("one"))), 6);
        assert_eq!(estimate_lines(&message(1, Some("a\nb\nc"))), 8);
        // trailing newline yields an empty final line
        assert_eq!(estimate_lines(&message(1, Some("a\n"))), 7);
        // placeholder is a single line
        assert_eq!(estimate_lines(&message(1, None)), 6);
        assert_eq!(estimate_lines(&message(1, Some(""))), 6);
    }

    #[test]
    fn first_message_always_opens_a_part() {
        let mut packer = LinePacker::new(20);
        assert_eq!(packer.place(6), Placement::NewPart(1));
        assert_eq!(packer.current_lines(), 11);
    }

    #[test]
    fn fills_up_to_the_limit_inclusive() {
        let mut packer = LinePacker::new(17);
        assert_eq!(packer.place(6), Placement::NewPart(1)); // 11
        assert_eq!(packer.place(6), Placement::Current); // 17
        assert_eq!(packer.place(6), Placement::NewPart(2)); // 11
        assert_eq!(packer.current_lines(), 11);
    }

    #[test]
    fn oversized_message_gets_its_own_part() {
        let mut packer = LinePacker::new(10);
        assert_eq!(packer.place(50), Placement::NewPart(1));
        assert_eq!(packer.place(1), Placement::NewPart(2));
        assert_eq!(packer.place(50), Placement::NewPart(3));
        assert_eq!(packer.place(2), Placement::NewPart(4));
        assert_eq!(packer.place(3), Placement::Current);
    }

    #[test]
    fn writer_rotates_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PartWriter::new(dir.path(), 17);
        for id in 1..=5 {
            writer.append(&message(id, Some("body"))).unwrap();
        }
        let parts = writer.finish().unwrap();

        let counts: Vec<(usize, usize, usize)> =
            parts.iter().map(|p| (p.index, p.messages, p.lines)).collect();
        assert_eq!(counts, vec![(1, 2, 17), (2, 2, 17), (3, 1, 11)]);

        let first = std::fs::read_to_string(dir.path().join("exported_messages_001.md")).unwrap();
        assert!(first.starts_with("# BlackPulse Messages Export (Part 1)\n\n**File Index:** 1\n\n---\n\n"));
        assert!(first.contains("## Message ID: 1\n"));
        assert!(first.contains("## Message ID: 2\n"));
        assert!(!first.contains("## Message ID: 3\n"));
        assert!(dir.path().join("exported_messages_003.md").exists());
        assert!(!dir.path().join("exported_messages_004.md").exists());
    }

    #[test]
    fn finishing_without_messages_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let parts = PartWriter::new(dir.path(), 100).finish().unwrap();
        assert!(parts.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
