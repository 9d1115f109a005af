// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{thread, time::Duration};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    cfg::config::{ReaderConfig, RetryConfig},
    control_block::common::MAX_SECTORS_PER_COMMAND,
    error::CdError,
    handlers::read_audio::{read_audio_with, validate_request},
    platform::ScsiExecutor,
};

/// Reads an audio range one command-sized chunk at a time, retrying
/// failed chunks.
///
/// Each call to [`AudioStream::next_chunk`] returns the next consecutive
/// sectors, always a full chunk of `max_per_command` sectors except for the
/// last one. When `reduce_chunk_on_retry` is set, a retry reads the same
/// chunk in smaller commands. A chunk that keeps failing after
/// `max_attempts` ends the stream with that error.
pub struct AudioStream<'a, E: ScsiExecutor + ?Sized> {
    exec: &'a mut E,
    next_lba: u32,
    remaining: u32,
    total: u32,
    max_per_command: u32,
    retry: RetryConfig,
}

impl<'a, E: ScsiExecutor + ?Sized> AudioStream<'a, E> {
    pub fn new(
        exec: &'a mut E,
        lba: u32,
        sectors: u32,
        config: &ReaderConfig,
    ) -> Result<Self, CdError> {
        validate_request(lba, sectors)?;
        Ok(Self {
            exec,
            next_lba: lba,
            remaining: sectors,
            total: sectors,
            max_per_command: config.max_sectors_per_command.clamp(1, MAX_SECTORS_PER_COMMAND),
            retry: config.retry.clone(),
        })
    }

    pub fn total_sectors(&self) -> u32 {
        self.total
    }

    pub fn consumed_sectors(&self) -> u32 {
        self.total - self.remaining
    }

    /// The next chunk of audio, or `None` once the range is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Bytes>, CdError> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let sectors = self.remaining.min(self.max_per_command);
        let mut per_read = sectors;
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        let data = loop {
            match read_audio_with(&mut *self.exec, self.next_lba, sectors, per_read) {
                Ok(data) => break data,
                Err(e) if e.scsi().is_some() && attempt < attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        lba = self.next_lba,
                        sectors,
                        per_read,
                        attempt,
                        ?delay,
                        %e,
                        "audio chunk failed, retrying"
                    );
                    thread::sleep(delay);
                    if self.retry.reduce_chunk_on_retry {
                        per_read = (per_read / 2)
                            .max(self.retry.min_sectors_per_read)
                            .clamp(1, per_read);
                    }
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        };

        debug!(lba = self.next_lba, sectors, per_read, attempt, "audio chunk read");
        self.remaining -= sectors;
        if self.remaining > 0 {
            self.next_lba += sectors;
        }
        Ok(Some(data))
    }

    /// `initial * 2^(attempt-1)`, capped at `max_backoff`.
    fn backoff(&self, attempt: u8) -> Duration {
        let factor = 1u32 << u32::from(attempt - 1).min(16);
        self.retry
            .initial_backoff
            .saturating_mul(factor)
            .min(self.retry.max_backoff)
    }
}
