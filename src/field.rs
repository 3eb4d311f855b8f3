use crate::error::CoreError;

/// How neighbor lookups behave at the domain edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Addressing {
    /// Toroidal: stepping off one edge re-enters on the opposite edge.
    Wrap,
    /// Out-of-range coordinates read the nearest edge cell.
    ClampToEdge,
}

impl Addressing {
    /// Offset `coord` by `delta` (-1, 0 or +1) on an axis of length `side`.
    #[inline]
    pub fn step(self, coord: usize, delta: isize, side: usize) -> usize {
        match (self, delta) {
            (_, 0) => coord,
            (Addressing::Wrap, d) if d < 0 => {
                if coord == 0 {
                    side - 1
                } else {
                    coord - 1
                }
            }
            (Addressing::Wrap, _) => {
                if coord + 1 == side {
                    0
                } else {
                    coord + 1
                }
            }
            (Addressing::ClampToEdge, d) if d < 0 => coord.saturating_sub(1),
            (Addressing::ClampToEdge, _) => (coord + 1).min(side - 1),
        }
    }
}

/// Axis-aligned block of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn full(side: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: side,
            height: side,
        }
    }
}

/// Square grid of `side * side` cells with a fixed number of planar channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    side: usize,
    channels: usize,
    addressing: Addressing,
    data: Vec<f32>,
}

impl Field {
    pub fn new(side: usize, channels: usize, addressing: Addressing) -> Self {
        Self {
            side,
            channels,
            addressing,
            data: vec![0.0; side * side * channels],
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    pub fn cells(&self) -> usize {
        self.side * self.side
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.side + x
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let n = self.cells();
        &self.data[channel * n..(channel + 1) * n]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let n = self.cells();
        &mut self.data[channel * n..(channel + 1) * n]
    }

    /// Mutable access to the first two channels at once.
    pub fn pair_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let n = self.cells();
        let (first, rest) = self.data.split_at_mut(n);
        (first, &mut rest[..n])
    }

    pub fn get(&self, channel: usize, x: usize, y: usize) -> f32 {
        self.channel(channel)[self.idx(x, y)]
    }

    pub fn fill(&mut self, channel: usize, value: f32) {
        self.channel_mut(channel).fill(value);
    }

    /// Copy row-major `data` into `region` of one channel.
    ///
    /// This is the raw entry point for callers that bring their own initial
    /// conditions; the built-in patch seeding writes whole buffers instead.
    pub fn write(&mut self, region: Region, channel: usize, data: &[f32]) -> Result<(), CoreError> {
        if channel >= self.channels {
            return Err(CoreError::ChannelOutOfRange {
                channel,
                channels: self.channels,
            });
        }
        let fits = |start: usize, len: usize| start.checked_add(len).is_some_and(|end| end <= self.side);
        if !fits(region.x, region.width) || !fits(region.y, region.height) {
            return Err(CoreError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                side: self.side,
            });
        }
        let expected = region.width * region.height;
        if data.len() != expected {
            return Err(CoreError::DataLength {
                expected,
                actual: data.len(),
            });
        }

        let side = self.side;
        let target = self.channel_mut(channel);
        for (row, src) in data.chunks_exact(region.width.max(1)).enumerate() {
            let start = (region.y + row) * side + region.x;
            target[start..start + region.width].copy_from_slice(src);
        }
        Ok(())
    }
}

/// Two fixed allocations with an active-index flag. Updates read `current`
/// and write `next`; `swap` flips which one is current.
#[derive(Clone, Debug)]
pub struct DoubleBuffer {
    buffers: [Field; 2],
    active: usize,
}

impl DoubleBuffer {
    pub fn new(field: Field) -> Self {
        Self {
            buffers: [field.clone(), field],
            active: 0,
        }
    }

    pub fn current(&self) -> &Field {
        &self.buffers[self.active]
    }

    /// The current buffer for reading and the next one for writing.
    pub fn split(&mut self) -> (&Field, &mut Field) {
        let (a, b) = self.buffers.split_at_mut(1);
        if self.active == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    pub fn swap(&mut self) {
        self.active ^= 1;
    }

    /// Seed both buffers with the same contents so a later swap never
    /// exposes stale data. Nothing is written unless the whole request is
    /// valid.
    pub fn write(&mut self, region: Region, channel: usize, data: &[f32]) -> Result<(), CoreError> {
        let (current, next) = self.split();
        next.data.copy_from_slice(&current.data);
        next.write(region, channel, data)?;
        self.swap();
        let (current, next) = self.split();
        next.data.copy_from_slice(&current.data);
        Ok(())
    }

    /// Rewrite the current buffer with `seed` and mirror it into the next one.
    pub fn seed_with(&mut self, seed: impl FnOnce(&mut Field)) {
        let (_, next) = self.split();
        seed(next);
        self.swap();
        let (current, next) = self.split();
        next.data.copy_from_slice(&current.data);
    }
}
