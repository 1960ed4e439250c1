//! Clips and the cyclic chains that the [`Sequencer`](crate::sequencer::Sequencer) walks through.

use thiserror::Error;

/// How many full passes a clip plays before the chain moves on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Loops {
    /// Play this many full passes, then signal completion. `Times(0)` is treated as
    /// [`Infinite`](Self::Infinite).
    Times(u32),
    /// Play forever. The chain stalls on this clip until it is restarted.
    Infinite,
}

impl Loops {
    /// Number of passes, or `None` if the clip never completes.
    pub fn passes(&self) -> Option<u32> {
        match self {
            Loops::Times(0) | Loops::Infinite => None,
            Loops::Times(times) => Some(*times),
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.passes().is_none()
    }
}

impl Default for Loops {
    fn default() -> Self {
        Loops::Times(1)
    }
}

/// Converts the LVGL-style loop count, where `0` means "forever".
impl From<u32> for Loops {
    fn from(value: u32) -> Self {
        match value {
            0 => Loops::Infinite,
            times => Loops::Times(times),
        }
    }
}

/// A named, loop-counted reference to an animation resource that was decoded elsewhere.
///
/// `H` is whatever the [`ClipPlayer`](crate::sequencer::ClipPlayer) uses to find the decoded
/// resource: a `&'static` image descriptor compiled into flash, an index into an asset table,
/// and so on. The clip never looks inside it.
#[derive(Clone, Debug)]
pub struct Clip<H> {
    name: &'static str,
    handle: H,
    loops: Loops,
}

impl<H> Clip<H> {
    /// Creates a clip that plays `loops` full passes, where `0` means forever (the LVGL
    /// `lv_gif_set_loop_count` convention).
    pub fn new(name: &'static str, handle: H, loops: u32) -> Self {
        Self::with_loops(name, handle, Loops::from(loops))
    }

    /// Creates a clip from an explicit [`Loops`].
    pub fn with_loops(name: &'static str, handle: H, loops: Loops) -> Self {
        let loops = match loops {
            Loops::Times(0) => Loops::Infinite,
            loops => loops,
        };
        Self {
            name,
            handle,
            loops,
        }
    }

    /// Label used in log output.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// What the player is asked to play.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// How many passes the clip plays before the chain moves on.
    pub fn loops(&self) -> Loops {
        self.loops
    }
}

/// A non-empty cycle of clips. Clip `i` is followed by clip `(i + 1) % len`.
///
/// The face animation, for example, is `start (x1) -> loop (x2) -> end (x1) -> start ...`.
#[derive(Clone, Debug)]
pub struct ClipChain<H> {
    clips: Vec<Clip<H>>,
}

impl<H> ClipChain<H> {
    /// Creates a chain from a sequence of clips, in playback order.
    pub fn of(clips: impl IntoIterator<Item = Clip<H>>) -> Result<Self, ChainError> {
        let clips: Vec<_> = clips.into_iter().collect();
        if clips.is_empty() {
            return Err(ChainError::Empty);
        }
        Ok(Self { clips })
    }

    /// Starts a fluent [`ClipChainBuilder`].
    pub fn builder() -> ClipChainBuilder<H> {
        ClipChainBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Always `false`; chains cannot be empty. Provided for symmetry with [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Clip<H>> {
        self.clips.get(index)
    }

    /// Index of the clip that follows `index`, wrapping to the first clip after the last.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.clips.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip<H>> {
        self.clips.iter()
    }
}

/// Fluent builder for a [`ClipChain`].
pub struct ClipChainBuilder<H> {
    clips: Vec<Clip<H>>,
}

impl<H> Default for ClipChainBuilder<H> {
    fn default() -> Self {
        Self { clips: Vec::new() }
    }
}

impl<H> ClipChainBuilder<H> {
    /// Appends a clip that plays after all clips added so far.
    pub fn then(mut self, name: &'static str, handle: H, loops: u32) -> Self {
        self.clips.push(Clip::new(name, handle, loops));
        self
    }

    /// Builds the chain, consuming the builder.
    pub fn build(self) -> Result<ClipChain<H>, ChainError> {
        ClipChain::of(self.clips)
    }
}

/// Error produced when a [`ClipChain`] cannot be built.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum ChainError {
    #[error("a clip chain needs at least one clip")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_loops_means_forever() {
        assert_eq!(Loops::from(0), Loops::Infinite);
        assert_eq!(Loops::from(3), Loops::Times(3));
        assert_eq!(Clip::with_loops("idle", (), Loops::Times(0)).loops(), Loops::Infinite);
        assert_eq!(Loops::Times(2).passes(), Some(2));
        assert!(Loops::Infinite.is_infinite());
    }

    #[test]
    fn when_empty_then_build_fails() {
        assert_eq!(ClipChain::<()>::builder().build().unwrap_err(), ChainError::Empty);
        assert_eq!(ClipChain::<u8>::of([]).unwrap_err(), ChainError::Empty);
    }

    #[test]
    fn next_index_wraps() {
        let chain = ClipChain::builder()
            .then("start", 0u8, 1)
            .then("loop", 1u8, 2)
            .then("end", 2u8, 1)
            .build()
            .unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.next_index(0), 1);
        assert_eq!(chain.next_index(1), 2);
        assert_eq!(chain.next_index(2), 0);
        assert_eq!(chain.get(1).map(|clip| clip.name()), Some("loop"));
        assert_eq!(chain.get(1).map(|clip| clip.loops()), Some(Loops::Times(2)));
        assert!(chain.get(3).is_none());
    }

    #[test]
    fn single_clip_chain_loops_on_itself() {
        let chain = ClipChain::of([Clip::new("only", "gif", 1)]).unwrap();

        assert_eq!(chain.next_index(0), 0);
    }
}
