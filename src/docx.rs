use anyhow::{anyhow, bail, Result};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use zip::ZipArchive;

// Plain-text extraction from a DOCX container. The missing-document-entry
// case is the one real failure mode of the import pipeline; the caller is
// expected to surface it with re-export guidance.
pub fn extract_docx_text(path: &Path) -> Result<String> {
    let xml = read_document_xml(path)?;
    Ok(flatten_document_xml(&xml))
}

fn read_document_xml(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 4];
    let read_len = file.read(&mut header)?;
    let is_zip = read_len >= 4
        && (header.starts_with(b"PK\x03\x04")
            || header.starts_with(b"PK\x05\x06")
            || header.starts_with(b"PK\x07\x08"));
    if !is_zip {
        bail!("{} is not a docx (zip) container", path.display());
    }
    file.seek(SeekFrom::Start(0))?;
    let mut archive =
        ZipArchive::new(file).map_err(|_| anyhow!("{} is not a valid docx archive", path.display()))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|_| anyhow!("missing word/document.xml inside docx archive"))?;
    let mut buffer = Vec::new();
    entry.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

// Event-driven markup strip: paragraph opens and explicit breaks become
// newlines, <w:t> text nodes are kept, everything else is dropped.
fn flatten_document_xml(xml: &str) -> String {
    let mut reader = XmlReader::from_reader(xml.as_bytes());
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut output = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"p" | b"br" => output.push('\n'),
                b"t" => in_text = true,
                b"tab" => output.push('\t'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"br" => output.push('\n'),
                b"tab" => output.push('\t'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    if let Ok(text) = e.unescape() {
                        output.push_str(text.as_ref());
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if local_name(e.name().as_ref()) == b"t" {
                    in_text = false;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        buf.clear();
    }
    normalize_block_text(&output)
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

// Collapse repeated blank lines and horizontal whitespace runs, keeping
// single newlines as paragraph boundaries.
fn normalize_block_text(text: &str) -> String {
    let mut output = String::new();
    let mut last_space = false;
    for ch in text.chars() {
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            if !output.ends_with('\n') {
                output.push('\n');
            }
            last_space = false;
            continue;
        }
        if ch.is_whitespace() {
            if !last_space {
                output.push(' ');
                last_space = true;
            }
            continue;
        }
        output.push(ch);
        last_space = false;
    }
    output.trim().to_string()
}
