use clap::{Parser, Subcommand, ValueEnum};
use id3forge::{
    legacy_id_for, Frame, FrameBody, ParseOptions, ParsedTag, Tag, TagHeader, TextEncoding, Version,
    WriteOptions,
};
use serde::Serialize;
use std::path::PathBuf;

/// Bytes of an opaque payload shown by `dump`.
const HEX_PREVIEW: usize = 16;

#[derive(Parser)]
#[command(name = "id3forge", about = "Inspect and rewrite ID3v2 tags")]
struct Cli {
    /// Diagnostics verbosity (written to stderr)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the frames of the tag at the start of a file
    Dump {
        input: PathBuf,
        /// Emit a JSON document instead of one line per frame
        #[arg(long)]
        json: bool,
    },
    /// Re-render the leading tag and write it, followed by the rest of the file
    Rewrite {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Target version: 3 or 4
        #[arg(long, default_value = "4")]
        version: String,
        /// Zero padding after the frames, in bytes
        #[arg(long, default_value_t = id3forge::config::DEFAULT_PADDING)]
        padding: usize,
        /// Apply tag-level unsynchronisation
        #[arg(long)]
        unsync: bool,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn  => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info  => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

fn init_logging(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input, json } => {
            let data = std::fs::read(&input)?;
            let parsed = Tag::parse_with(&data, &ParseOptions::default())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&TagReport::from(&parsed))?);
            } else {
                print_tag(&input, &parsed);
            }
        }

        // ── Rewrite ──────────────────────────────────────────────────────────
        Commands::Rewrite { input, output, version, padding, unsync } => {
            let version = parse_version(&version)?;
            let data = std::fs::read(&input)?;
            let header = TagHeader::parse(&data)?;
            let tag = Tag::parse(&data)?;

            let options = WriteOptions {
                version,
                padding,
                unsynchronisation: unsync.then_some(true),
                ..WriteOptions::default()
            };
            let mut out = tag.render_with(&options)?;
            let audio_start = header.total_len().min(data.len());
            out.extend_from_slice(&data[audio_start..]);
            std::fs::write(&output, &out)?;
            println!(
                "{} ({}, {} B) → {} ({}, {} B)",
                input.display(), header.version, audio_start,
                output.display(), version, out.len() - (data.len() - audio_start),
            );
        }
    }

    Ok(())
}

// ── Text output ──────────────────────────────────────────────────────────────

fn print_tag(path: &std::path::Path, parsed: &ParsedTag) {
    let tag = &parsed.tag;
    println!("── {} ─────────────────────────────────────────", path.display());
    println!("  Version        {}.{}", tag.version, tag.revision);
    println!("  Unsync         {}", tag.flags.unsynchronisation);
    println!("  Extended hdr   {}", tag.extended_header.is_some());
    println!("  Footer         {}", tag.flags.footer);
    println!("  Frames         {}", tag.frames().len());
    let legacy = tag.version == Version::V2_2;
    for frame in tag.frames() {
        print_frame(frame, 1, legacy);
    }
    for issue in &parsed.issues {
        let severity = if issue.error.is_warning() { "warning" } else { "error" };
        println!("  ! {:<4} @{:<6} {:?} {}: {}", issue.id, issue.offset, issue.action, severity, issue.error);
    }
}

fn print_frame(frame: &Frame, depth: usize, legacy: bool) {
    let indent = "  ".repeat(depth);
    let origin = match legacy_id_for(frame.id()) {
        Some(old) if legacy => format!(" (from {})", old),
        _                   => String::new(),
    };
    println!("{}{:<4} {:<18} {}{}", indent, frame.id(), frame.body.kind_name(), describe(&frame.body), origin);
    let children = match &frame.body {
        FrameBody::Chapter(c)         => c.frames.as_slice(),
        FrameBody::TableOfContents(t) => t.frames.as_slice(),
        _                             => &[],
    };
    for child in children {
        print_frame(child, depth + 1, legacy);
    }
}

fn describe(body: &FrameBody) -> String {
    match opaque_bytes(body) {
        Some(data) => format!("{} [{}]", body.summary(), hex_preview(data)),
        None       => body.summary(),
    }
}

fn opaque_bytes(body: &FrameBody) -> Option<&[u8]> {
    match body {
        FrameBody::Opaque(data)    => Some(data.as_slice()),
        FrameBody::Encrypted(enc)  => Some(enc.data.as_slice()),
        _                          => None,
    }
}

fn hex_preview(data: &[u8]) -> String {
    let shown = &data[..data.len().min(HEX_PREVIEW)];
    let ellipsis = if data.len() > HEX_PREVIEW { "…" } else { "" };
    format!("{}{}", hex::encode(shown), ellipsis)
}

// ── JSON output ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TagReport {
    version:           String,
    revision:          u8,
    unsynchronisation: bool,
    extended_header:   bool,
    footer:            bool,
    frames:            Vec<FrameReport>,
    issues:            Vec<IssueReport>,
}

#[derive(Serialize)]
struct FrameReport {
    id:       String,
    kind:     &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
    summary:  String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hex:      Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frames:   Vec<FrameReport>,
}

#[derive(Serialize)]
struct IssueReport {
    id:      String,
    offset:  usize,
    action:  String,
    warning: bool,
    error:   String,
}

impl From<&ParsedTag> for TagReport {
    fn from(parsed: &ParsedTag) -> Self {
        let tag = &parsed.tag;
        TagReport {
            version:           tag.version.to_string(),
            revision:          tag.revision,
            unsynchronisation: tag.flags.unsynchronisation,
            extended_header:   tag.extended_header.is_some(),
            footer:            tag.flags.footer,
            frames:            tag.frames().iter().map(FrameReport::from).collect(),
            issues:            parsed
                .issues
                .iter()
                .map(|i| IssueReport {
                    id:      i.id.clone(),
                    offset:  i.offset,
                    action:  format!("{:?}", i.action),
                    warning: i.error.is_warning(),
                    error:   i.error.to_string(),
                })
                .collect(),
        }
    }
}

impl From<&Frame> for FrameReport {
    fn from(frame: &Frame) -> Self {
        let children = match &frame.body {
            FrameBody::Chapter(c)         => c.frames.iter().map(FrameReport::from).collect(),
            FrameBody::TableOfContents(t) => t.frames.iter().map(FrameReport::from).collect(),
            _                             => Vec::new(),
        };
        FrameReport {
            id:       frame.id().to_string(),
            kind:     frame.body.kind_name(),
            encoding: frame.body.text_encoding().map(TextEncoding::name),
            summary:  frame.body.summary(),
            hex:      opaque_bytes(&frame.body).map(hex::encode),
            frames:   children,
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_version(s: &str) -> Result<Version, Box<dyn std::error::Error>> {
    match Version::from_name(s) {
        Some(v) if v.is_writable() => Ok(v),
        _ => Err(format!("cannot write ID3 version '{}'; use 3 or 4", s).into()),
    }
}
