use std::io::{self, Write};

const RULE_WIDTH: usize = 80;

/// Writes one framed block per collected command and flushes after each,
/// so an interrupted run still leaves every finished block on disk.
pub struct ReportWriter<W: Write> {
    sink: W,
    blocks: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, blocks: 0 }
    }

    pub fn write_block(&mut self, device_label: &str, command: &str, output: &str) -> io::Result<()> {
        let rule = "*".repeat(RULE_WIDTH);
        writeln!(self.sink, "{rule}")?;
        writeln!(self.sink, "* {}: {}", device_label.to_uppercase(), command)?;
        writeln!(self.sink, "{rule}")?;
        writeln!(self.sink, "{output}")?;
        self.sink.flush()?;
        self.blocks += 1;
        Ok(())
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_framed_and_label_uppercased() {
        let mut writer = ReportWriter::new(Vec::new());
        writer
            .write_block("core-sw1", "show clock", "12:00:00.000 UTC Mon Jan 1 2024")
            .unwrap();
        assert_eq!(writer.blocks_written(), 1);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let rule = "*".repeat(80);
        let expected = format!(
            "{rule}\n* CORE-SW1: show clock\n{rule}\n12:00:00.000 UTC Mon Jan 1 2024\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn output_trailing_newline_leaves_blank_line() {
        let mut writer = ReportWriter::new(Vec::new());
        writer.write_block("sw1", "show ver", "NX-OS 9.3\n").unwrap();
        writer.write_block("sw1", "show users", "").unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.contains("NX-OS 9.3\n\n"));
        assert!(text.ends_with(&format!("* SW1: show users\n{}\n\n", "*".repeat(80))));
        assert_eq!(text.matches("* SW1: ").count(), 2);
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_errors_propagate() {
        let mut writer = ReportWriter::new(FailingSink);
        let err = writer.write_block("sw1", "show ver", "x").unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(writer.blocks_written(), 0);
    }
}
