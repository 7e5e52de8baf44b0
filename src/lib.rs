// Library entrypoint: meeting-transcript ingestion and normalization.
mod docx;
mod format;
mod importer;
mod json_walker;
mod parsers;

pub use docx::extract_docx_text;
pub use format::{detect_format, TranscriptFormat};
pub use importer::{
    import_transcript_file, merge_tags, normalize_transcript_text, ImportedTranscript,
    JSON_NO_PAIRS_WARNING,
};
