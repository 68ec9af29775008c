// src/output/mod.rs
use anyhow::{Context, Result};
use clap::ValueEnum;
use csv::WriterBuilder;
use std::{collections::HashSet, io::Write};
use tracing::{debug, warn};

use crate::process::FlatRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Comma separated, header from the first record.
    #[default]
    Csv,
    /// One JSON object per line.
    Jsonl,
}

/// Sink for flattened poll results.
pub trait PollWriter {
    fn write(&mut self, record: &FlatRecord) -> Result<()>;

    /// Flush buffered output. Must be called once all records are written.
    fn finish(&mut self) -> Result<()>;

    fn write_all<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = FlatRecord>,
        Self: Sized,
    {
        let mut written = 0;
        for record in records {
            self.write(&record)?;
            written += 1;
        }
        self.finish()?;
        debug!(records = written, "output finished");
        Ok(written)
    }
}

impl<P: PollWriter + ?Sized> PollWriter for Box<P> {
    fn write(&mut self, record: &FlatRecord) -> Result<()> {
        (**self).write(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

pub fn writer_for<'w, W: Write + 'w>(format: OutputFormat, out: W) -> Box<dyn PollWriter + 'w> {
    match format {
        OutputFormat::Csv => Box::new(CsvPollWriter::new(out)),
        OutputFormat::Jsonl => Box::new(JsonLinesWriter::new(out)),
    }
}

/// CSV with a column set fixed by the first record: the standard columns
/// followed by that record's passthrough fields. Passthrough fields first
/// seen later have no column and are dropped.
pub struct CsvPollWriter<W: Write> {
    inner: csv::Writer<W>,
    header: Option<Vec<String>>,
    dropped: HashSet<String>,
}

impl<W: Write> CsvPollWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: WriterBuilder::new().from_writer(out),
            header: None,
            dropped: HashSet::new(),
        }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing csv output: {}", e.error()))
    }
}

impl<W: Write> PollWriter for CsvPollWriter<W> {
    fn write(&mut self, record: &FlatRecord) -> Result<()> {
        if self.header.is_none() {
            let header: Vec<String> = FlatRecord::COLUMNS
                .iter()
                .map(|c| c.to_string())
                .chain(record.extra.keys().cloned())
                .collect();
            self.inner
                .write_record(&header)
                .context("writing csv header")?;
            self.header = Some(header);
        }
        let Some(header) = &self.header else {
            return Ok(());
        };

        for key in record.extra.keys() {
            if !header.contains(key) && self.dropped.insert(key.clone()) {
                warn!(column = %key, site_id = %record.site_id, "no csv column for field, dropping it");
            }
        }
        let row: Vec<String> = header
            .iter()
            .map(|column| record.get(column).unwrap_or_default())
            .collect();
        self.inner.write_record(&row).context("writing csv row")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.flush().context("flushing csv output")
    }
}

pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PollWriter for JsonLinesWriter<W> {
    fn write(&mut self, record: &FlatRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record).context("serializing record")?;
        self.out.write_all(b"\n").context("writing json line")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("flushing json output")
    }
}
