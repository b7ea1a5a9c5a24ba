use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Open a buffered reader; `.gz` files are decompressed transparently.
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let path = Path::new(input_file);
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", input_file, e))?;

    if path.extension() == Some(OsStr::new("gz")) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Open a buffered writer; `.gz` files are compressed transparently.
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    let path = Path::new(output_file);
    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", output_file, e))?;

    if path.extension() == Some(OsStr::new("gz")) {
        Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Read every line of the input file into memory.
///
/// * `input_file` - file name, either gzipped or not
pub fn read_lines(input_file: &str) -> anyhow::Result<Vec<Box<str>>> {
    let buf = open_buf_reader(input_file)?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?.into_boxed_str());
    }
    Ok(lines)
}

/// Write every line into the output file.
///
/// * `lines` - anything displayable, one per line
/// * `output_file` - file name, either gzipped or not
pub fn write_lines<T>(lines: &[T], output_file: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            } else {
                return Err(anyhow::anyhow!("unexpected error: {}", e));
            }
        }
    }
    buf.flush()?;
    Ok(())
}

/// Split a line on tabs, trimming the trailing newline only.
pub fn split_tsv(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\n', '\r']).split('\t').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        let path = path.to_str().unwrap();

        let lines: Vec<Box<str>> = vec!["a\t1".into(), "b\t2".into()];
        write_lines(&lines, path).unwrap();

        let back = read_lines(path).unwrap();
        assert_eq!(back, lines);
    }

    #[test]
    fn test_gz_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt.gz");
        let path = path.to_str().unwrap();

        let lines: Vec<Box<str>> = vec!["gene\ts1\ts2".into(), "g1\t0.5\t-1.25".into()];
        write_lines(&lines, path).unwrap();

        let back = read_lines(path).unwrap();
        assert_eq!(back, lines);
    }

    #[test]
    fn test_split_tsv() {
        assert_eq!(split_tsv("a\tb\tc\n"), vec!["a", "b", "c"]);
        assert_eq!(split_tsv("one"), vec!["one"]);
    }
}
