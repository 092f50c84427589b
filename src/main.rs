//! Streaming line counter with a live projected total.
//!
//! Counts newline-terminated lines across one or more files while reading in
//! fixed-size chunks. Because large files can take a while to scan, a single
//! transient status line extrapolates the final line count from the fraction
//! of bytes consumed so far and is redrawn in place at a bounded byte
//! interval. Per-file counts and the grand total are printed right-aligned in
//! a shared column.

use clap::Parser;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use colored::*;
use terminal_size::{terminal_size, Width};

// One read() call per chunk of this size.
const READ_BUF_SIZE: usize = 1 << 20;
const DEFAULT_REFRESH_INTERVAL: i64 = 20_000_000;
// Column width used when no projection was ever rendered.
const FALLBACK_COLUMN_WIDTH: usize = 10;
// The column width is sized from a five-fold overestimate of the first
// projected total so later, larger counts still fit.
const WIDTH_SAFETY_FACTOR: i64 = 5;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Counts lines across files, projecting the final total while it scans"
)]
struct Args {
    /// Files to count; anything that is not a regular file is skipped.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Minimum number of bytes between two progress redraws.
    #[arg(short = 'p', long, default_value_t = DEFAULT_REFRESH_INTERVAL)]
    progress_interval: i64,
}

/// A path that survived filtering, with its size from the same stat call.
struct FileEntry {
    path: PathBuf,
    size: u64,
}

/// State of the transient status line. Owns the terminal writer so tests can
/// substitute a capture buffer.
struct Progress {
    writer: Box<dyn Write + Send>,
    interval: u64,
    last_offset: u64,
    status: String,
    visible: bool,
    width: Option<usize>,
}

impl Progress {
    fn new(interval: u64) -> Self {
        Progress::with_writer(Box::new(io::stdout()), interval)
    }

    fn with_writer(writer: Box<dyn Write + Send>, interval: u64) -> Self {
        Progress {
            writer,
            interval,
            last_offset: 0,
            status: String::new(),
            visible: false,
            width: None,
        }
    }

    /// Column width for all printed counts. Fixed the first time a projection
    /// is rendered; until then a constant fallback keeps short runs aligned.
    fn column_width(&self) -> usize {
        self.width.unwrap_or(FALLBACK_COLUMN_WIDTH)
    }

    /// Builds the status line from the observed lines-per-byte density,
    /// assuming the remainder of the byte budget shares it. The first call
    /// also fixes the column width from the projection.
    fn compute_status(
        &mut self,
        total_bytes: u64,
        file_name: &str,
        bytes_consumed: u64,
        lines_so_far: u64,
    ) -> String {
        let fraction = bytes_consumed as f64 / total_bytes as f64;
        let projected = (lines_so_far as f64 / fraction).round() as i64;
        if self.width.is_none() {
            self.width =
                Some(format_thousands(projected.saturating_mul(WIDTH_SAFETY_FACTOR)).len());
        }
        let percent = (fraction * 100.0) as u64;
        let line = format!(
            "{:3}% [{}] projected line count: {} ",
            percent,
            file_name,
            format_thousands(projected)
        );
        clamp_to_terminal(line)
    }

    /// Writes the current status if it is not already on screen.
    fn render(&mut self) {
        if self.visible || self.status.is_empty() {
            return;
        }
        let _ = write!(self.writer, "{}", self.status);
        let _ = self.writer.flush();
        self.visible = true;
    }

    /// Erases the status line in place if one is showing.
    fn clear(&mut self) {
        if !self.visible {
            return;
        }
        let _ = write!(self.writer, "\r\x1b[K");
        let _ = self.writer.flush();
        self.visible = false;
    }

    /// Recomputes the status and redraws it, clear-then-print so the terminal
    /// never shows two copies. A zero byte budget has nothing to project
    /// against, so the status line is skipped entirely.
    fn refresh(
        &mut self,
        total_bytes: u64,
        file_name: &str,
        bytes_consumed: u64,
        lines_so_far: u64,
    ) {
        if total_bytes == 0 {
            return;
        }
        self.status = self.compute_status(total_bytes, file_name, bytes_consumed, lines_so_far);
        self.clear();
        self.render();
    }
}

/// Truncates the status line so it cannot wrap and defeat the in-place erase.
fn clamp_to_terminal(line: String) -> String {
    if let Some((Width(columns), _)) = terminal_size() {
        let columns = columns as usize;
        if line.chars().count() > columns {
            return line.chars().take(columns).collect();
        }
    }
    line
}

/// Renders `n` in decimal with a comma every three digits from the right.
fn format_thousands(n: i64) -> String {
    if n < 0 {
        return format!("-{}", group_digits(n.unsigned_abs()));
    }
    group_digits(n as u64)
}

fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Thousands-formats `n` and left-pads with spaces to `width`. Values wider
/// than the column are never truncated.
fn format_right_aligned(n: i64, width: usize) -> String {
    format!("{:>width$}", format_thousands(n))
}

/// Counts newlines in `chunk`, refreshing the status line whenever a newline
/// lands at least `interval` bytes past the previous refresh. The refresh
/// check is a single integer comparison so the per-byte scan stays tight, and
/// it runs per newline rather than per chunk so a chunk spanning several
/// refresh intervals still redraws along the way.
fn scan_chunk(
    progress: &mut Progress,
    total_bytes: u64,
    bytes_before: u64,
    lines_before: u64,
    file_name: &str,
    chunk: &[u8],
) -> u64 {
    let mut newlines = 0u64;
    for (index, byte) in chunk.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        newlines += 1;
        let offset = bytes_before + index as u64;
        // Saturating: a file resized between stat and read can put the seeded
        // offset behind the last refresh.
        if offset.saturating_sub(progress.last_offset) >= progress.interval {
            progress.refresh(total_bytes, file_name, offset, lines_before + newlines);
            progress.last_offset = offset;
        }
    }
    newlines
}

/// Reads `reader` to EOF in fixed-size chunks, returning the number of
/// newlines seen. `bytes_before` and `lines_before` seed the running offsets
/// the status line projects from, so the projection spans the whole
/// multi-file run rather than restarting per file.
fn read_file<R: Read>(
    progress: &mut Progress,
    total_bytes: u64,
    bytes_before: u64,
    lines_before: u64,
    file_name: &str,
    reader: &mut R,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; READ_BUF_SIZE];
    let mut bytes_in_file = 0u64;
    let mut lines_in_file = 0u64;
    loop {
        let length = reader.read(&mut buffer)?;
        if length == 0 {
            return Ok(lines_in_file);
        }
        lines_in_file += scan_chunk(
            progress,
            total_bytes,
            bytes_before + bytes_in_file,
            lines_before + lines_in_file,
            file_name,
            &buffer[..length],
        );
        bytes_in_file += length as u64;
    }
}

/// Stats each path and keeps the regular files, in input order. Skipped paths
/// get a diagnostic on stderr and never count toward the byte budget. This
/// runs before any scanning starts, so diagnostics cannot land in the middle
/// of a status line.
fn collect_regular_files(paths: &[PathBuf]) -> Vec<FileEntry> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => entries.push(FileEntry {
                path: path.clone(),
                size: metadata.len(),
            }),
            Ok(_) => eprintln!(
                "{} {} is not a regular file, skipping",
                "Warning:".yellow().bold(),
                path.display()
            ),
            Err(err) => eprintln!(
                "{} cannot stat {}, skipping: {}",
                "Warning:".yellow().bold(),
                path.display(),
                err
            ),
        }
    }
    entries
}

/// Scans every entry in order, printing one aligned count line per file and a
/// final total. The byte budget for the projection is fixed up front; running
/// byte and line offsets carry across files so the status line projects over
/// the whole run, not just the current file. Returns the grand total.
fn run_count(
    entries: &[FileEntry],
    progress: &mut Progress,
    out: &mut dyn Write,
) -> io::Result<u64> {
    let total_bytes: u64 = entries.iter().map(|entry| entry.size).sum();
    let mut bytes_so_far = 0u64;
    let mut lines_so_far = 0u64;

    for entry in entries {
        let file_name = entry
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.path.display().to_string());
        // The File drop closes the descriptor on the error path too.
        let mut file = File::open(&entry.path)?;
        let lines_in_file = read_file(
            progress,
            total_bytes,
            bytes_so_far,
            lines_so_far,
            &file_name,
            &mut file,
        )?;
        drop(file);

        progress.clear();
        writeln!(
            out,
            "{} {}",
            format_right_aligned(lines_in_file as i64, progress.column_width()),
            entry.path.display()
        )?;
        out.flush()?;
        // Put the stale status back so the display stays continuous until the
        // next refresh replaces it.
        progress.render();

        bytes_so_far += entry.size;
        lines_so_far += lines_in_file;
    }

    progress.clear();
    writeln!(
        out,
        "{} total",
        format_right_aligned(lines_so_far as i64, progress.column_width())
    )?;
    out.flush()?;
    Ok(lines_so_far)
}

fn run_with_args(args: Args) -> io::Result<()> {
    // A non-positive interval degenerates to refreshing at every newline.
    let interval = args.progress_interval.max(1) as u64;
    let entries = collect_regular_files(&args.files);
    let mut progress = Progress::new(interval);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_count(&entries, &mut progress, &mut out)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run_with_args(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
