// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CSV projection of feed items.

use crate::error::ExportError;
use crate::feed::FeedItem;
use crate::sanitizer::HtmlSanitizer;
use axum::body::Bytes;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};

/// Output columns, in order.
pub const HEADERS: [&str; 6] = ["Title", "Link", "Description", "PubDate", "ImageURL", "Content"];

/// One output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
    pub image_url: String,
    pub content: String,
}

impl CsvRow {
    fn record(&self) -> [&str; 6] {
        [
            &self.title,
            &self.link,
            &self.description,
            &self.pub_date,
            &self.image_url,
            &self.content,
        ]
    }
}

/// Writes feed items as CSV, optionally stripping HTML from the
/// description and content columns.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    sanitizer: HtmlSanitizer,
}

impl CsvExporter {
    pub fn new(sanitizer: HtmlSanitizer) -> Self {
        Self { sanitizer }
    }

    /// Project one item onto the output schema.
    pub fn project(&self, item: &FeedItem, sanitize: bool) -> CsvRow {
        let clean = |text: &str| {
            if sanitize {
                self.sanitizer.strip_html(text)
            } else {
                text.to_string()
            }
        };

        CsvRow {
            title: item.title.clone(),
            link: item.link.clone(),
            description: clean(&item.description),
            pub_date: item.pub_date.clone(),
            image_url: item.image_url().to_string(),
            content: clean(&item.content_encoded),
        }
    }

    /// Write the header and one row per item to `writer`.
    ///
    /// The header is flushed before any row, so a sink that cannot accept
    /// anything fails before items are projected. Returns the number of
    /// item rows written.
    pub fn export<W: io::Write>(
        &self,
        writer: W,
        items: &[FeedItem],
        sanitize: bool,
    ) -> Result<usize, ExportError> {
        let mut writer = csv::Writer::from_writer(writer);

        writer.write_record(HEADERS).map_err(write_error)?;
        writer.flush().map_err(ExportError::Write)?;

        for item in items {
            let row = self.project(item, sanitize);
            writer.write_record(row.record()).map_err(write_error)?;
        }

        writer.flush().map_err(ExportError::Write)?;
        Ok(items.len())
    }

    /// Stream the header and rows into `tx`, one encoded record per chunk.
    ///
    /// Each chunk must be accepted within `write_timeout`. A receiver that
    /// is gone or stalled aborts the export with [`ExportError::Write`].
    pub async fn export_to_channel(
        &self,
        tx: &mpsc::Sender<io::Result<Bytes>>,
        items: &[FeedItem],
        sanitize: bool,
        write_timeout: Duration,
    ) -> Result<usize, ExportError> {
        send_chunk(tx, encode_record(HEADERS)?, write_timeout).await?;

        for item in items {
            let row = self.project(item, sanitize);
            send_chunk(tx, encode_record(row.record())?, write_timeout).await?;
        }

        Ok(items.len())
    }
}

fn encode_record(record: [&str; 6]) -> Result<Bytes, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(record).map_err(write_error)?;
    let buf = writer
        .into_inner()
        .map_err(|e| ExportError::Write(e.into_error()))?;
    Ok(Bytes::from(buf))
}

async fn send_chunk(
    tx: &mpsc::Sender<io::Result<Bytes>>,
    chunk: Bytes,
    write_timeout: Duration,
) -> Result<(), ExportError> {
    tx.send_timeout(Ok(chunk), write_timeout)
        .await
        .map_err(|e| match e {
            SendTimeoutError::Timeout(_) => ExportError::Write(io::Error::new(
                io::ErrorKind::TimedOut,
                "client did not accept data within the write timeout",
            )),
            SendTimeoutError::Closed(_) => ExportError::Write(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "client connection closed",
            )),
        })
}

fn write_error(err: csv::Error) -> ExportError {
    ExportError::Write(io::Error::from(err))
}
