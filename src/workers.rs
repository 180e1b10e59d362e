// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A fork-join parallel fill.  The output slice is cut into chunks,
//! the chunks are put in a shared queue, and a fixed set of scoped
//! threads pull from the queue until it is empty.  Each chunk is a
//! disjoint `&mut` borrow, so the only lock is on the queue itself,
//! and nothing returns until every thread has been joined.
//!
//! Pulling chunks rather than pre-assigning them matters for escape
//! time fractals: rows through the set cost the full budget while
//! rows outside it escape almost immediately.

use crossbeam;
use crossbeam::thread::ScopedJoinHandle;
use error::AlmondError;
use std::sync::Mutex;

/// Fills `out[i]` with `compute(i)` for every index, using `workers`
/// threads pulling `chunk_len`-sized pieces of the slice.
///
/// With one worker the fill runs on the calling thread.  No more
/// threads are started than there are chunks, however many workers
/// are asked for; if the OS refuses a thread, the ones already running
/// finish the queue.  If any worker dies the whole fill is reported as
/// failed, and the contents of `out` should be considered garbage.
pub fn fill<T, F>(
    out: &mut [T],
    chunk_len: usize,
    workers: usize,
    compute: F,
) -> Result<(), AlmondError>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    if workers == 0 {
        return Err(AlmondError::InvalidWorkerCount(workers));
    }
    if workers == 1 || out.len() <= 1 {
        for (offset, slot) in out.iter_mut().enumerate() {
            *slot = compute(offset);
        }
        return Ok(());
    }

    let chunk_len = chunk_len.max(1);
    let expected = out.len();
    // Never more threads than there are chunks to hand out.
    let workers = workers.min((expected + chunk_len - 1) / chunk_len);
    let queue = Mutex::new(out.chunks_mut(chunk_len).enumerate());
    let queue = &queue;
    let compute = &compute;

    let outcome = crossbeam::scope(|spawner| {
        let mut handles: Vec<ScopedJoinHandle<Result<usize, AlmondError>>> =
            Vec::with_capacity(workers);
        for _ in 0..workers {
            let spawned = spawner.builder().spawn(move |_| {
                let mut written = 0;
                loop {
                    let next = match queue.lock() {
                        Ok(mut chunks) => chunks.next(),
                        Err(_) => {
                            return Err(AlmondError::WorkerFault(
                                "work queue poisoned".to_string(),
                            ))
                        }
                    };
                    match next {
                        Some((index, chunk)) => {
                            let base = index * chunk_len;
                            for (i, slot) in chunk.iter_mut().enumerate() {
                                *slot = compute(base + i);
                            }
                            written += chunk.len();
                        }
                        None => {
                            break;
                        }
                    }
                }
                Ok(written)
            });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // The threads already running drain the whole queue.
                    warn!(
                        requested = workers,
                        started = handles.len(),
                        "could not spawn worker: {}",
                        e
                    );
                    break;
                }
            }
        }

        if handles.is_empty() {
            return vec![Err(AlmondError::WorkerFault(
                "no worker could be started".to_string(),
            ))];
        }
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(AlmondError::WorkerFault("worker panicked".to_string())),
            })
            .collect::<Vec<_>>()
    });

    let results = match outcome {
        Ok(results) => results,
        Err(_) => return Err(AlmondError::WorkerFault("worker panicked".to_string())),
    };
    let mut written = 0;
    for result in results {
        written += result?;
    }
    if written != expected {
        return Err(AlmondError::WorkerFault(format!(
            "{} of {} cells written",
            written, expected
        )));
    }
    Ok(())
}
