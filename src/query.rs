//! `watch-project` and `query` operations.
//!
//! Each operation builds its request, exchanges it over a connection, and
//! pulls only the response fields it needs. Unknown fields are skipped, since
//! the daemon adds fields over time. The response buffer belongs to the
//! call and is dropped on every exit path.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::codec::{tags, Decoder, Encoder};
use crate::error::{Result, WatchwireError};
use crate::protocol::build_pdu;
use crate::transport::{AsyncConnection, Connection};

/// Response to `watch-project`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchProjectResult {
    /// Root the daemon actually watches.
    pub watch: PathBuf,
    /// Requested directory relative to `watch`, when they differ.
    pub relative_path: Option<PathBuf>,
}

/// Response to `query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// File names, relative to the query root.
    pub files: Vec<PathBuf>,
    /// Daemon clock at the time of the query.
    pub clock: Option<String>,
    /// True when the daemon has no history for this root.
    pub is_fresh_instance: bool,
}

fn path_bytes(path: &Path) -> &[u8] {
    path.as_os_str().as_bytes()
}

fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(bytes))
}

/// Build `["watch-project", root]`.
pub fn watch_project_request(root: &Path, capacity: usize) -> Bytes {
    let mut encoder = Encoder::with_capacity(capacity);
    encoder.write_array(2);
    encoder.write_str("watch-project");
    encoder.write_string(path_bytes(root));
    build_pdu(encoder)
}

/// Build `["query", root, {expression, fields, relative_root?}]`.
///
/// The expression selects regular files only and the projection asks for
/// names only.
pub fn query_request(root: &Path, relative_root: Option<&Path>, capacity: usize) -> Bytes {
    let mut encoder = Encoder::with_capacity(capacity);
    encoder.write_array(3);
    encoder.write_str("query");
    encoder.write_string(path_bytes(root));

    encoder.write_object(if relative_root.is_some() { 3 } else { 2 });
    encoder.write_str("expression");
    encoder.write_array(2);
    encoder.write_str("type");
    encoder.write_str("f");
    encoder.write_str("fields");
    encoder.write_array(1);
    encoder.write_str("name");
    if let Some(relative_root) = relative_root {
        encoder.write_str("relative_root");
        encoder.write_string(path_bytes(relative_root));
    }
    build_pdu(encoder)
}

/// Daemon-reported error. Non-string values still count as an error.
fn daemon_error(decoder: &mut Decoder) -> Result<WatchwireError> {
    if decoder.peek_tag()? == tags::STRING {
        let message = decoder.read_string()?;
        return Ok(WatchwireError::Daemon(
            String::from_utf8_lossy(&message).into_owned(),
        ));
    }
    decoder.skip_value()?;
    Ok(WatchwireError::Daemon("unrecognized error value".to_string()))
}

fn log_warning(decoder: &mut Decoder) -> Result<()> {
    if decoder.peek_tag()? == tags::STRING {
        let message = decoder.read_string()?;
        tracing::warn!(warning = %String::from_utf8_lossy(&message), "daemon warning");
    } else {
        decoder.skip_value()?;
    }
    Ok(())
}

fn skip_field(decoder: &mut Decoder, key: &[u8]) -> Result<()> {
    tracing::trace!(key = %String::from_utf8_lossy(key), "skipping response field");
    decoder.skip_value()?;
    Ok(())
}

/// Pull a `watch-project` response off `decoder`.
pub fn parse_watch_project(decoder: &mut Decoder) -> Result<WatchProjectResult> {
    let count = decoder.read_object()?;
    let mut watch = None;
    let mut relative_path = None;

    for _ in 0..count {
        let key = decoder.read_string()?;
        match key.as_ref() {
            b"watch" => watch = Some(bytes_to_path(&decoder.read_string()?)),
            b"relative_path" => relative_path = Some(bytes_to_path(&decoder.read_string()?)),
            b"error" => return Err(daemon_error(decoder)?),
            b"warning" => log_warning(decoder)?,
            _ => skip_field(decoder, &key)?,
        }
    }

    let watch = watch.ok_or(WatchwireError::MissingField("watch"))?;
    Ok(WatchProjectResult {
        watch,
        relative_path,
    })
}

/// One entry of a `files` array: a bare name, or an object with `name`.
fn read_file_entry(decoder: &mut Decoder, files: &mut Vec<PathBuf>) -> Result<()> {
    match decoder.peek_tag()? {
        tags::STRING => files.push(bytes_to_path(&decoder.read_string()?)),
        tags::OBJECT => {
            let count = decoder.read_object()?;
            for _ in 0..count {
                let key = decoder.read_string()?;
                if key.as_ref() == b"name" && decoder.peek_tag()? == tags::STRING {
                    files.push(bytes_to_path(&decoder.read_string()?));
                } else {
                    decoder.skip_value()?;
                }
            }
        }
        _ => decoder.skip_value()?,
    }
    Ok(())
}

fn read_files(decoder: &mut Decoder) -> Result<Vec<PathBuf>> {
    if decoder.peek_tag()? == tags::TEMPLATE {
        let (keys, rows) = decoder.read_template()?;
        let name_index = keys.iter().position(|k| k.as_ref() == b"name");
        let mut files = Vec::with_capacity(rows.min(decoder.remaining()));
        for _ in 0..rows {
            for index in 0..keys.len() {
                if Some(index) == name_index && decoder.peek_tag()? == tags::STRING {
                    files.push(bytes_to_path(&decoder.read_string()?));
                } else {
                    decoder.skip_value()?;
                }
            }
        }
        return Ok(files);
    }

    let count = decoder.read_array()?;
    let mut files = Vec::with_capacity(count.min(decoder.remaining()));
    for _ in 0..count {
        read_file_entry(decoder, &mut files)?;
    }
    Ok(files)
}

/// Pull a `query` response off `decoder`.
pub fn parse_query(decoder: &mut Decoder) -> Result<QueryResult> {
    let count = decoder.read_object()?;
    let mut files = None;
    let mut result = QueryResult::default();

    for _ in 0..count {
        let key = decoder.read_string()?;
        match key.as_ref() {
            b"files" => files = Some(read_files(decoder)?),
            b"clock" if decoder.peek_tag()? == tags::STRING => {
                result.clock = Some(String::from_utf8_lossy(&decoder.read_string()?).into_owned());
            }
            b"is_fresh_instance" => result.is_fresh_instance = decoder.read_bool()?,
            b"error" => return Err(daemon_error(decoder)?),
            b"warning" => log_warning(decoder)?,
            _ => skip_field(decoder, &key)?,
        }
    }

    result.files = files.ok_or(WatchwireError::MissingField("files"))?;
    Ok(result)
}

impl Connection {
    /// Ask the daemon to watch `root` (or the project containing it).
    pub fn watch_project(&mut self, root: impl AsRef<Path>) -> Result<WatchProjectResult> {
        let request = watch_project_request(root.as_ref(), self.config().request_capacity);
        let response = self.round_trip(&request)?;
        let mut decoder = response.decoder(self.config().max_depth);
        parse_watch_project(&mut decoder)
    }

    /// List the regular files under `root`, optionally below `relative_root`.
    pub fn query(
        &mut self,
        root: impl AsRef<Path>,
        relative_root: Option<&Path>,
    ) -> Result<QueryResult> {
        let request = query_request(root.as_ref(), relative_root, self.config().request_capacity);
        let response = self.round_trip(&request)?;
        let mut decoder = response.decoder(self.config().max_depth);
        let result = parse_query(&mut decoder)?;
        tracing::debug!(files = result.files.len(), "query complete");
        Ok(result)
    }
}

impl AsyncConnection {
    /// Async [`Connection::watch_project`].
    pub async fn watch_project(&mut self, root: impl AsRef<Path>) -> Result<WatchProjectResult> {
        let request = watch_project_request(root.as_ref(), self.config().request_capacity);
        let response = self.round_trip(&request).await?;
        let mut decoder = response.decoder(self.config().max_depth);
        parse_watch_project(&mut decoder)
    }

    /// Async [`Connection::query`].
    pub async fn query(
        &mut self,
        root: impl AsRef<Path>,
        relative_root: Option<&Path>,
    ) -> Result<QueryResult> {
        let request = query_request(root.as_ref(), relative_root, self.config().request_capacity);
        let response = self.round_trip(&request).await?;
        let mut decoder = response.decoder(self.config().max_depth);
        parse_query(&mut decoder)
    }
}
