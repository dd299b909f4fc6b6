// Copyright 2026 The reading-archive Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::Result as IoResult;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// The connection thread and the request currently being handled share the
// socket halves. They never use them at the same time: the connection waits
// until the request has been answered before it parses the next one.

/// Handle on the read half of a connection.
pub struct SequentialReader<R>
where
    R: Read + Send,
{
    inner: Arc<Mutex<R>>,
}

/// Handle on the write half of a connection.
pub struct SequentialWriter<W>
where
    W: Write + Send,
{
    inner: Arc<Mutex<W>>,
}

fn lock<T>(inner: &Mutex<T>) -> MutexGuard<'_, T> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: Read + Send> SequentialReader<R> {
    pub fn new(inner: Arc<Mutex<R>>) -> SequentialReader<R> {
        SequentialReader { inner }
    }
}

impl<W: Write + Send> SequentialWriter<W> {
    pub fn new(inner: Arc<Mutex<W>>) -> SequentialWriter<W> {
        SequentialWriter { inner }
    }
}

impl<R: Read + Send> Read for SequentialReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        lock(&self.inner).read(buf)
    }
}

impl<W: Write + Send> Write for SequentialWriter<W> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        lock(&self.inner).write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> IoResult<()> {
        lock(&self.inner).write_all(buf)
    }

    fn flush(&mut self) -> IoResult<()> {
        lock(&self.inner).flush()
    }
}
