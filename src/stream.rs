//! Statement generator.
//!
//! A loaded table is moved onto its own thread, which walks it and hands the
//! statements to the consumer one at a time over a zero-capacity channel.
//! Every hand-off is a rendezvous: the generator blocks until the consumer
//! takes the item, so exactly one statement is in flight and nothing is
//! buffered.
//!
//! The stream is always `Drop`, `Create`, one `Insert` per row in load order,
//! `Trailer` with the skip count, then `EndOfStream`.

use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use log::debug;
use thiserror::Error;

use crate::{
    schema::Table,
    sql::{self, Statement},
};

#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Drop(Statement),
    Create(Statement),
    Insert {
        row_index: usize,
        statement: Statement,
    },
    Trailer {
        skipped: usize,
    },
    EndOfStream,
}

impl StreamItem {
    /// Whether a statement still follows this item. False only for the
    /// trailer and the end marker.
    pub fn has_more(&self) -> bool {
        !matches!(self, StreamItem::Trailer { .. } | StreamItem::EndOfStream)
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Building INSERT for row {row}: {message}")]
    Build { row: usize, message: String },
    #[error("Statement consumer stopped receiving")]
    ConsumerGone,
    #[error("Statement generator thread panicked")]
    Panicked,
    #[error("Statement stream closed before its end marker")]
    Truncated,
}

/// Consumer side of a running generator.
pub struct StatementStream {
    receiver: Receiver<StreamItem>,
    handle: JoinHandle<Result<(), StreamError>>,
}

/// Starts the generator for `table`.
pub fn spawn(table: Table) -> Result<StatementStream> {
    let (sender, receiver) = crossbeam_channel::bounded(0);
    let handle = thread::Builder::new()
        .name(format!("generate-{}", table.name))
        .spawn(move || generate(&table, &sender))
        .context("Spawning statement generator")?;
    Ok(StatementStream { receiver, handle })
}

fn send(sender: &Sender<StreamItem>, item: StreamItem) -> Result<(), StreamError> {
    sender.send(item).map_err(|_| StreamError::ConsumerGone)
}

fn generate(table: &Table, sender: &Sender<StreamItem>) -> Result<(), StreamError> {
    send(sender, StreamItem::Drop(sql::drop_table(table)))?;
    send(sender, StreamItem::Create(sql::create_table(table)))?;
    for (row_index, row) in table.rows.iter().enumerate() {
        let statement = sql::insert_row(table, row).map_err(|err| StreamError::Build {
            row: row_index + 1,
            message: format!("{err:#}"),
        })?;
        send(
            sender,
            StreamItem::Insert {
                row_index,
                statement,
            },
        )?;
    }
    send(
        sender,
        StreamItem::Trailer {
            skipped: table.skipped,
        },
    )?;
    send(sender, StreamItem::EndOfStream)?;
    debug!("Generator for '{}' finished", table.name);
    Ok(())
}

impl StatementStream {
    /// Blocks until the generator hands over the next item. `None` once the
    /// generator has stopped.
    pub fn recv(&self) -> Option<StreamItem> {
        self.receiver.recv().ok()
    }

    /// Stops receiving and waits for the generator. A generator that stopped
    /// only because the consumer went away is not an error.
    pub fn finish(self) -> Result<(), StreamError> {
        let StatementStream { receiver, handle } = self;
        drop(receiver);
        match handle.join() {
            Ok(Ok(())) | Ok(Err(StreamError::ConsumerGone)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(StreamError::Panicked),
        }
    }
}

/// Drains a stream into memory. Intended for inspection and tests; imports
/// consume the stream item by item instead.
pub fn collect(table: Table) -> Result<Vec<StreamItem>> {
    let stream = spawn(table)?;
    let mut items = Vec::new();
    while let Some(item) = stream.recv() {
        let done = matches!(item, StreamItem::EndOfStream);
        items.push(item);
        if done {
            break;
        }
    }
    stream.finish()?;
    Ok(items)
}
