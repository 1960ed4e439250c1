//! Frame output: the [`FrameSink`] collaborator, the single-transfer gate in front of it, and an
//! RGB565 [`FrameBuffer`] that procedural scenes draw into with `embedded-graphics`.
//!
//! SPI panels accept one transfer at a time. The sink signals the end of a transfer through
//! [`FlushDone::notify`], usually from the SPI driver's "color transfer done" callback, and the
//! [`Presenter`] refuses to start another transfer until that happens.

use embedded_graphics::pixelcolor::{IntoStorage, Rgb565};
use embedded_graphics::prelude::*;
use log::trace;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// An inclusive pixel rectangle `(x1, y1)..=(x2, y2)`, the shape LVGL hands to `flush_cb`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Area {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl Area {
    /// Creates an area, rejecting inverted corners.
    pub fn new(x1: u16, y1: u16, x2: u16, y2: u16) -> Result<Self, FrameError> {
        if x1 > x2 || y1 > y2 {
            return Err(FrameError::InvalidArea { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// The area covering a whole `width` x `height` panel.
    pub fn full(width: u16, height: u16) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidArea {
                x1: 0,
                y1: 0,
                x2: width,
                y2: height,
            });
        }
        Self::new(0, 0, width - 1, height - 1)
    }

    pub fn width(&self) -> usize {
        (self.x2 - self.x1) as usize + 1
    }

    pub fn height(&self) -> usize {
        (self.y2 - self.y1) as usize + 1
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }
}

/// The display side: accepts a rectangle of RGB565 pixels.
///
/// `flush` must be done reading `pixels` when it returns, either because it transmitted them or
/// because it copied them into its own DMA buffer. It may finish the transfer later, but has to
/// call [`FlushDone::notify`] exactly once when it does, from whatever context is convenient.
pub trait FrameSink {
    fn flush(&mut self, area: Area, pixels: &[u16], done: FlushDone);
}

/// Gate shared between a [`Presenter`] and the sink's completion callback. Holds the number of
/// the outstanding transfer, or 0 while the sink is free.
#[derive(Debug, Default)]
pub struct FlushGate {
    in_flight: AtomicU32,
}

impl FlushGate {
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) != 0
    }

    fn try_acquire(&self, transfer: u32) -> bool {
        self.in_flight
            .compare_exchange(0, transfer, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Frees the gate only if `transfer` is still the outstanding one.
    fn release(&self, transfer: u32) {
        let _ = self
            .in_flight
            .compare_exchange(transfer, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// Completion handle passed to [`FrameSink::flush`]. Equivalent to `lv_display_flush_ready`.
///
/// Each handle belongs to one transfer and is consumed by [`notify`](Self::notify), so it cannot
/// release a later transfer.
#[derive(Debug)]
pub struct FlushDone {
    gate: Arc<FlushGate>,
    transfer: u32,
}

impl FlushDone {
    /// Marks the transfer as finished. Safe from interrupt context.
    pub fn notify(self) {
        self.gate.release(self.transfer);
    }
}

/// Errors produced when submitting a frame.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum FrameError {
    /// The previous transfer has not completed yet. Skip the frame and try again next tick.
    #[error("frame sink is still busy with the previous transfer")]
    Busy,
    #[error("invalid area ({x1}, {y1})..=({x2}, {y2})")]
    InvalidArea { x1: u16, y1: u16, x2: u16, y2: u16 },
    #[error("pixel buffer holds {actual} pixels but the area needs {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Owns a [`FrameSink`] and enforces one outstanding transfer at a time.
pub struct Presenter<S: FrameSink> {
    sink: S,
    gate: Arc<FlushGate>,
    transfers: u32,
}

impl<S: FrameSink> Presenter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            gate: Arc::new(FlushGate::default()),
            transfers: 0,
        }
    }

    /// Whether a new frame can be submitted right now.
    pub fn is_ready(&self) -> bool {
        !self.gate.is_busy()
    }

    /// Sends `pixels` for `area` to the sink.
    ///
    /// Fails with [`FrameError::Busy`] while the previous transfer is outstanding; the frame is not
    /// queued.
    pub fn submit(&mut self, area: Area, pixels: &[u16]) -> Result<(), FrameError> {
        if pixels.len() != area.pixel_count() {
            return Err(FrameError::BufferSize {
                expected: area.pixel_count(),
                actual: pixels.len(),
            });
        }
        // 0 marks a free gate, so transfer numbers skip it when they wrap.
        let transfer = self.transfers.wrapping_add(1).max(1);
        if !self.gate.try_acquire(transfer) {
            trace!("Sink busy, dropping frame for {area:?}");
            return Err(FrameError::Busy);
        }
        self.transfers = transfer;
        let done = FlushDone {
            gate: Arc::clone(&self.gate),
            transfer,
        };
        self.sink.flush(area, pixels, done);
        Ok(())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Full-screen RGB565 buffer that `embedded-graphics` primitives can be drawn into.
///
/// Pixels are kept in the panel's raw `u16` format so they can be handed to the sink without
/// conversion.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
}

impl FrameBuffer {
    /// Creates a black buffer.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Area covering the whole buffer.
    pub fn area(&self) -> Result<Area, FrameError> {
        Area::full(self.width, self.height)
    }

    /// Raw RGB565 pixels, row-major.
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Raw value of the pixel at `(x, y)`, if inside the buffer.
    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = (self.width as i32, self.height as i32);
        for Pixel(Point { x, y }, color) in pixels {
            if x >= 0 && x < width && y >= 0 && y < height {
                self.pixels[(y * width + x) as usize] = color.into_storage();
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.pixels.fill(color.into_storage());
        Ok(())
    }
}

/// Unwraps a draw result whose error type cannot occur.
pub(crate) fn drawn<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
