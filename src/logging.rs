use env_logger::{Builder, Env, Target};
use log::{debug, LevelFilter};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

pub const DEBUG_LOG: &str = "debug.log";

/// Append-only file created on the first record written to it.
struct LazyFile {
    path: PathBuf,
    file: Option<File>,
}

impl LazyFile {
    fn new(path: impl Into<PathBuf>) -> Self {
        LazyFile {
            path: path.into(),
            file: None,
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            self.file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "debug log is not open"))
    }
}

impl Write for LazyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Logs warnings to stderr (`RUST_LOG` overrides), or everything this program traces to [`DEBUG_LOG`].
pub fn init_logging(debug_mode: bool) {
    let mut builder = if debug_mode {
        let mut builder = Builder::new();
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("contributors", LevelFilter::Debug)
            .target(Target::Pipe(Box::new(LazyFile::new(DEBUG_LOG))))
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} {:<5} {}",
                    chrono::Local::now().format("%Y/%m/%d %H:%M:%S"),
                    record.level(),
                    record.args()
                )
            });
        builder
    } else {
        Builder::from_env(Env::default().default_filter_or("warn"))
    };
    if builder.try_init().is_err() {
        debug!("Logger already initialized");
    }
}

#[test]
fn lazy_file_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEBUG_LOG);
    let mut file = LazyFile::new(&path);
    file.flush().unwrap();
    assert!(!path.exists(), "Nothing written, nothing created");

    writeln!(file, "first").unwrap();
    writeln!(LazyFile::new(&path), "second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}
