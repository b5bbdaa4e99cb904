//! HTTP download step that never silently replaces an existing file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::step::Action;

/// Downloads `url` into `dest`.
///
/// The destination is opened before the request is sent. Unless `overwrite`
/// is set, an existing file fails the step and is left as it was. A transfer
/// that fails part-way removes the file it created. There are no retries.
#[derive(Debug, Clone)]
pub struct DownloadAction {
    url: String,
    dest: PathBuf,
    overwrite: bool,
}

impl DownloadAction {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            overwrite: false,
        }
    }

    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Action for DownloadAction {
    #[instrument(skip_all, fields(url = %self.url, dest = %self.dest.display()))]
    fn run(&self) -> Result<()> {
        let file = open_destination(&self.dest, self.overwrite)?;
        match fetch_into(&self.url, file) {
            Ok(bytes) => {
                info!(bytes, "download complete");
                Ok(())
            }
            Err(err) => {
                if let Err(rm) = fs::remove_file(&self.dest) {
                    warn!(err = %rm, "failed to remove partial download");
                }
                Err(err)
            }
        }
    }
}

fn open_destination(dest: &Path, overwrite: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    match options.open(dest) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(anyhow!(
            "refusing to overwrite existing file {}",
            dest.display()
        )),
        Err(e) => Err(e).with_context(|| format!("create {}", dest.display())),
    }
}

fn fetch_into(url: &str, file: File) -> Result<u64> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("steprun/", env!("CARGO_PKG_VERSION")))
        .timeout(Option::<Duration>::None)
        .build()
        .context("build http client")?;
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;

    let mut writer = BufWriter::new(file);
    let bytes = response
        .copy_to(&mut writer)
        .with_context(|| format!("read body of {url}"))?;
    writer.flush().context("flush download")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one HTTP response on a local port and return its base URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut line = String::new();
            while reader.read_line(&mut line).expect("read") > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let mut stream = stream;
            write!(
                stream,
                "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .expect("write response");
        });
        format!("http://{addr}")
    }

    #[test]
    fn downloads_into_new_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dest = temp.path().join("hermes.tar.gz");
        let url = format!("{}/archive.tar.gz", serve_once("HTTP/1.1 200 OK", "tarball"));

        DownloadAction::new(&url, &dest).run().expect("download");

        assert_eq!(fs::read_to_string(&dest).expect("read"), "tarball");
    }

    #[test]
    fn existing_destination_is_fatal_and_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dest = temp.path().join("hermes.tar.gz");
        fs::write(&dest, "previous").expect("seed");

        let err = DownloadAction::new("http://127.0.0.1:9/never", &dest)
            .run()
            .unwrap_err();

        assert!(err.to_string().contains("refusing to overwrite"), "{err}");
        assert_eq!(fs::read_to_string(&dest).expect("read"), "previous");
    }

    #[test]
    fn http_error_removes_partial_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dest = temp.path().join("missing.tar.gz");
        let url = format!("{}/missing", serve_once("HTTP/1.1 404 Not Found", "nope"));

        let err = DownloadAction::new(&url, &dest).run().unwrap_err();

        assert!(format!("{err:#}").contains("404"), "{err:#}");
        assert!(!dest.exists());
    }

    #[test]
    fn overwrite_replaces_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dest = temp.path().join("a.txt");
        fs::write(&dest, "old contents").expect("seed");
        let url = format!("{}/a.txt", serve_once("HTTP/1.1 200 OK", "new"));

        DownloadAction::new(&url, &dest)
            .overwrite(true)
            .run()
            .expect("download");

        assert_eq!(fs::read_to_string(&dest).expect("read"), "new");
    }
}
