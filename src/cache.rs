//! Segmented, round-robin byte cache sitting between a single [`StreamReader`]
//! and `T` parser threads.
//!
//! Segments are filled round-robin and handed off to parser threads; a
//! record that straddles two segments gets the tail of the lower segment
//! copied into the upper segment's set-aside buffer so no thread ever sees
//! a torn record. State transitions live in `perform_segment_maintenance`
//! and `fill_segment_from_stream`. Coordination uses a single `Mutex`
//! guarding all segment state plus a `Condvar` threads block on rather than
//! spinning; filling is already serialized round-robin, so one mutex across
//! a fill's I/O call affects throughput, not the observable contract.

use crate::error::{KmerGraphError, Result};
use crate::stream::StreamReader;
use std::sync::{Condvar, Mutex, MutexGuard};

struct CacheSegment {
    memory: Vec<u8>,
    /// Number of valid bytes currently in `memory`, starting at offset 0.
    size: u64,
    cursor: u64,
    cursor_in_sa_buffer: bool,
    sa_buffer_size: u64,
    sa_buffer_available: bool,
    /// False once the stream has been drained while trying to refill this
    /// segment. Never flips back to true.
    avail: bool,
    fill_id: u64,
}

impl CacheSegment {
    fn new(size: u64) -> Self {
        Self {
            memory: vec![0u8; size as usize],
            size: 0,
            cursor: 0,
            cursor_in_sa_buffer: false,
            sa_buffer_size: 0,
            sa_buffer_available: false,
            avail: true,
            fill_id: 0,
        }
    }
}

struct State {
    stream: StreamReader,
    segments: Vec<Option<CacheSegment>>,
    segment_to_fill: u32,
    segment_ref_count: u32,
    fill_counter: u64,
}

pub struct CacheManager {
    segment_size: u64,
    number_of_threads: u32,
    inner: Mutex<State>,
    cv: Condvar,
}

impl CacheManager {
    pub fn new(stream: StreamReader, number_of_threads: u32, cache_size: u64) -> Result<Self> {
        if number_of_threads == 0 || cache_size < number_of_threads as u64 {
            return Err(KmerGraphError::InvalidCacheSize {
                cache_size,
                threads: number_of_threads,
            });
        }
        let segment_size = cache_size / number_of_threads as u64;
        let segments = (0..number_of_threads).map(|_| None).collect();
        Ok(Self {
            segment_size,
            number_of_threads,
            inner: Mutex::new(State {
                stream,
                segments,
                segment_to_fill: 0,
                segment_ref_count: 0,
                fill_counter: 0,
            }),
            cv: Condvar::new(),
        })
    }

    pub fn number_of_threads(&self) -> u32 {
        self.number_of_threads
    }

    fn check_thread_id(&self, thread_id: u32) -> Result<()> {
        if thread_id >= self.number_of_threads {
            return Err(KmerGraphError::TooManyThreads {
                requested: thread_id,
                configured: self.number_of_threads,
            });
        }
        Ok(())
    }

    /// Creates and performs the first fill of `thread_id`'s segment if it
    /// has not been touched yet.
    fn ensure_segment<'a>(
        &'a self,
        mut guard: MutexGuard<'a, State>,
        thread_id: u32,
    ) -> Result<MutexGuard<'a, State>> {
        if guard.segments[thread_id as usize].is_none() {
            guard.segments[thread_id as usize] = Some(CacheSegment::new(self.segment_size));
            guard.segment_ref_count += 1;
            guard = self.fill_segment_from_stream(guard, thread_id)?;
        }
        Ok(guard)
    }

    /// Blocks (via the condvar, not a spin loop) until it is `thread_id`'s
    /// turn in the round-robin fill order, or the stream is exhausted.
    fn fill_segment_from_stream<'a>(
        &'a self,
        mut guard: MutexGuard<'a, State>,
        thread_id: u32,
    ) -> Result<MutexGuard<'a, State>> {
        loop {
            if guard.stream.is_at_eos() {
                let seg = guard.segments[thread_id as usize].as_mut().unwrap();
                seg.size = 0;
                seg.avail = false;
                guard.segment_ref_count -= 1;
                self.cv.notify_all();
                return Ok(guard);
            }
            if guard.segment_to_fill == thread_id {
                let n = {
                    let State {
                        stream, segments, ..
                    } = &mut *guard;
                    let seg = segments[thread_id as usize].as_mut().unwrap();
                    let cursor = seg.cursor as usize;
                    stream.read_into(&mut seg.memory[cursor..self.segment_size as usize])?
                };
                let fill_id = guard.fill_counter;
                let seg = guard.segments[thread_id as usize].as_mut().unwrap();
                seg.size = seg.cursor + n;
                seg.fill_id = fill_id;
                guard.fill_counter += 1;
                guard.segment_to_fill = (guard.segment_to_fill + 1) % self.number_of_threads;
                self.cv.notify_all();
                return Ok(guard);
            }
            guard = self.cv.wait(guard).expect("cache manager mutex poisoned");
        }
    }

    /// Keeps a segment's cursor valid: jumps it into its higher neighbor's
    /// set-aside buffer when its own bytes run out, and jumps it back out
    /// (triggering a refill) once the set-aside buffer is consumed.
    fn perform_segment_maintenance<'a>(
        &'a self,
        mut guard: MutexGuard<'a, State>,
        thread_id: u32,
    ) -> Result<MutexGuard<'a, State>> {
        let higher_id = (thread_id + 1) % self.number_of_threads;
        guard = self.ensure_segment(guard, higher_id)?;

        loop {
            let at_end = {
                let seg = guard.segments[thread_id as usize].as_ref().unwrap();
                !seg.cursor_in_sa_buffer && seg.cursor == seg.size
            };
            if !at_end {
                break;
            }

            if thread_id == higher_id {
                // Single-thread pool: force our own neighbor (ourselves) to
                // present a set-aside buffer so the jump-in below succeeds.
                guard.segments[thread_id as usize]
                    .as_mut()
                    .unwrap()
                    .sa_buffer_available = true;
            }

            let (h_avail, h_sa_avail, h_sa_size) = {
                let h = guard.segments[higher_id as usize].as_ref().unwrap();
                (h.avail, h.sa_buffer_available, h.sa_buffer_size)
            };

            if h_sa_avail {
                let seg = guard.segments[thread_id as usize].as_mut().unwrap();
                seg.cursor_in_sa_buffer = true;
                seg.cursor = 0;
                break;
            } else if !h_avail {
                // Higher neighbor is done and never will set one aside.
                let seg = guard.segments[thread_id as usize].as_mut().unwrap();
                seg.cursor_in_sa_buffer = true;
                seg.cursor = h_sa_size;
                break;
            } else {
                guard = self.cv.wait(guard).expect("cache manager mutex poisoned");
            }
        }

        let at_end_of_sa = {
            let seg = guard.segments[thread_id as usize].as_ref().unwrap();
            let h_sa_size = guard.segments[higher_id as usize].as_ref().unwrap().sa_buffer_size;
            seg.cursor_in_sa_buffer && seg.cursor == h_sa_size
        };
        if at_end_of_sa {
            let own_sa = {
                let seg = guard.segments[thread_id as usize].as_ref().unwrap();
                (seg.sa_buffer_size, seg.sa_buffer_available)
            };
            {
                let seg = guard.segments[thread_id as usize].as_mut().unwrap();
                seg.cursor_in_sa_buffer = false;
                seg.cursor = 0;
            }
            {
                let h = guard.segments[higher_id as usize].as_mut().unwrap();
                h.sa_buffer_size = 0;
                h.sa_buffer_available = false;
            }
            self.cv.notify_all();
            if own_sa.1 {
                // We still owe our own lower neighbor a set-aside region;
                // don't let the refill below clobber it.
                guard.segments[thread_id as usize].as_mut().unwrap().cursor = own_sa.0;
            }
            guard = self.fill_segment_from_stream(guard, thread_id)?;
        }

        Ok(guard)
    }

    /// `true` immediately if this thread's own segment still has bytes.
    /// Otherwise blocks until either new data becomes reachable (via a
    /// neighbor's set-aside buffer) or every segment has drained the
    /// stream, at which point it returns `false`.
    pub fn has_more_data(&self, thread_id: u32) -> Result<bool> {
        self.check_thread_id(thread_id)?;
        let mut guard = self.inner.lock().expect("cache manager mutex poisoned");
        guard = self.ensure_segment(guard, thread_id)?;
        loop {
            if guard.segments[thread_id as usize].as_ref().unwrap().avail {
                return Ok(true);
            }
            if guard.segment_ref_count == 0 {
                return Ok(false);
            }
            guard = self.cv.wait(guard).expect("cache manager mutex poisoned");
        }
    }

    /// Copies up to `buf.len()` bytes into `buf`, pulling from this
    /// segment's own memory or (after a boundary jump) its higher
    /// neighbor's set-aside buffer as needed. Returns the number of bytes
    /// actually copied, which is less than `buf.len()` only at end of
    /// stream.
    pub fn get_bytes(&self, thread_id: u32, buf: &mut [u8]) -> Result<u64> {
        self.check_thread_id(thread_id)?;
        let mut guard = self.inner.lock().expect("cache manager mutex poisoned");
        guard = self.ensure_segment(guard, thread_id)?;

        if !guard.segments[thread_id as usize].as_ref().unwrap().avail {
            return Ok(0);
        }

        let higher_id = (thread_id + 1) % self.number_of_threads;
        let mut total = 0usize;

        while total < buf.len() {
            guard = self.perform_segment_maintenance(guard, thread_id)?;

            let in_sa = guard.segments[thread_id as usize]
                .as_ref()
                .unwrap()
                .cursor_in_sa_buffer;
            if !in_sa && !guard.segments[thread_id as usize].as_ref().unwrap().avail {
                break;
            }

            let remaining = buf.len() - total;
            let n = if in_sa {
                let cursor = guard.segments[thread_id as usize].as_ref().unwrap().cursor as usize;
                let h = guard.segments[higher_id as usize].as_ref().unwrap();
                let avail_bytes = h.sa_buffer_size as usize - cursor;
                let n = remaining.min(avail_bytes);
                buf[total..total + n].copy_from_slice(&h.memory[cursor..cursor + n]);
                n
            } else {
                let seg = guard.segments[thread_id as usize].as_ref().unwrap();
                let cursor = seg.cursor as usize;
                let avail_bytes = seg.size as usize - cursor;
                let n = remaining.min(avail_bytes);
                buf[total..total + n].copy_from_slice(&seg.memory[cursor..cursor + n]);
                n
            };
            guard.segments[thread_id as usize].as_mut().unwrap().cursor += n as u64;
            total += n;
            if n == 0 {
                break;
            }
        }

        Ok(total as u64)
    }

    /// Hands off the first `pos` bytes of this segment's remaining data as a
    /// set-aside buffer for the lower neighbor (the thread for which this
    /// segment is "higher") to consume once it reaches the boundary. Blocks
    /// until any previous set-aside buffer has been fully consumed.
    pub fn split_at(&self, thread_id: u32, pos: u64) -> Result<()> {
        self.check_thread_id(thread_id)?;
        let mut guard = self.inner.lock().expect("cache manager mutex poisoned");
        guard = self.ensure_segment(guard, thread_id)?;
        loop {
            let avail = guard.segments[thread_id as usize]
                .as_ref()
                .unwrap()
                .sa_buffer_available;
            if !avail {
                break;
            }
            guard = self.cv.wait(guard).expect("cache manager mutex poisoned");
        }
        let seg = guard.segments[thread_id as usize].as_mut().unwrap();
        seg.sa_buffer_size = pos;
        seg.sa_buffer_available = true;
        self.cv.notify_all();
        Ok(())
    }

    pub fn get_fill_id(&self, thread_id: u32) -> Result<u64> {
        self.check_thread_id(thread_id)?;
        let mut guard = self.inner.lock().expect("cache manager mutex poisoned");
        guard = self.ensure_segment(guard, thread_id)?;
        Ok(guard.segments[thread_id as usize].as_ref().unwrap().fill_id)
    }

    pub fn whereis_cursor(&self, thread_id: u32) -> Result<u64> {
        self.check_thread_id(thread_id)?;
        let mut guard = self.inner.lock().expect("cache manager mutex poisoned");
        guard = self.ensure_segment(guard, thread_id)?;
        Ok(guard.segments[thread_id as usize].as_ref().unwrap().cursor)
    }
}
