use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// True for files named `*.gz`.
#[must_use]
pub fn is_gzip(path: &Utf8Path) -> bool {
    path.extension() == Some("gz")
}

/// Open a log for line-wise reading, decompressing `*.gz` files.
pub fn open_log(path: &Utf8Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Name of the filtered copy of `path`: its file name without a `.gz` suffix.
#[must_use]
pub fn output_name(path: &Utf8Path) -> String {
    let name = path.file_name().unwrap_or("log");
    name.strip_suffix(".gz").unwrap_or(name).to_string()
}

/// Uncompressed length of a log, reading gzip streams to the end.
pub(crate) fn logical_len(path: &Utf8Path) -> io::Result<u64> {
    if is_gzip(path) {
        let mut reader = open_log(path)?;
        io::copy(&mut reader, &mut io::sink())
    } else {
        Ok(path.metadata()?.len())
    }
}
