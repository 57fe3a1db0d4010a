use async_trait::async_trait;

use super::queue::CvParseJob;

/// First-stage safety check before any bytes are opened. The real antivirus
/// integration plugs in here; the shipped implementation passes everything.
#[async_trait]
pub trait VirusScanner: Send + Sync {
    async fn is_clean(&self, job: &CvParseJob) -> bool;
}

/// Placeholder scanner until an antivirus backend is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughVirusScanner;

#[async_trait]
impl VirusScanner for PassthroughVirusScanner {
    async fn is_clean(&self, _job: &CvParseJob) -> bool {
        true
    }
}

/// Second-stage structural check over the stored bytes.
pub trait ContentScanner: Send + Sync {
    fn is_safe(&self, bytes: &[u8]) -> bool;
}

/// Accepts the document formats candidates actually upload, judged by magic
/// bytes rather than file extensions. Executables and unrecognized binary
/// content are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicByteScanner;

impl ContentScanner for MagicByteScanner {
    fn is_safe(&self, bytes: &[u8]) -> bool {
        let head = &bytes[..bytes.len().min(8)];
        match head {
            // PDF: %PDF
            [0x25, 0x50, 0x44, 0x46, ..] => true,
            // Legacy MS Office container (doc)
            [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1] => true,
            // Zip container (docx, odt)
            [0x50, 0x4B, 0x03, 0x04, ..] => true,
            // RTF: "{\rtf"
            [0x7B, 0x5C, 0x72, 0x74, 0x66, ..] => true,
            // Windows and ELF executables
            [0x4D, 0x5A, ..] | [0x7F, 0x45, 0x4C, 0x46, ..] => false,
            _ => is_printable_text(bytes),
        }
    }
}

/// Plain-text fallback: valid UTF-8 and mostly printable characters in the
/// first chunk.
fn is_printable_text(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(4096)];
    if sample.is_empty() {
        return false;
    }

    let text = match std::str::from_utf8(sample) {
        Ok(text) => text,
        // The sample may end mid-codepoint; judge the valid prefix.
        Err(err) if err.error_len().is_none() && err.valid_up_to() > 0 => {
            match std::str::from_utf8(&sample[..err.valid_up_to()]) {
                Ok(text) => text,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    let total = text.chars().count();
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total.max(1) as f64 > 0.80
}
