//! Composition classification and pass planning.
//!
//! Both are pure functions of the layer's drawable counts, so the whole
//! ping-pong schedule can be inspected without a GPU.

use smallvec::SmallVec;

/// Render strategy of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    /// Nothing to draw.
    Empty,
    /// Shapes straight into the output.
    ShapesOnly,
    /// Independent fullscreen passes straight into the output.
    EffectsOnly,
    /// Shapes into a ping-pong texture, then a chain of effects.
    ShapesWithEffects,
}

impl Composition {
    #[must_use]
    pub fn classify(shapes: usize, effects: usize) -> Self {
        match (shapes > 0, effects > 0) {
            (false, false) => Self::Empty,
            (true, false) => Self::ShapesOnly,
            (false, true) => Self::EffectsOnly,
            (true, true) => Self::ShapesWithEffects,
        }
    }

    /// Whether the two ping-pong textures are needed.
    #[must_use]
    pub fn needs_ping_pong(self) -> bool {
        self == Self::ShapesWithEffects
    }

    #[must_use]
    pub fn has_shapes(self) -> bool {
        matches!(self, Self::ShapesOnly | Self::ShapesWithEffects)
    }
}

/// A texture a pass reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// One of the two intermediate textures.
    PingPong(usize),
    /// The layer's real output: the surface or its output texture.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Clear-only pass of a layer without drawables.
    Clear,
    Shapes,
    /// Effect at this position in the layer's effect list.
    Effect(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlannedPass {
    pub kind: PassKind,
    pub source: Option<Slot>,
    pub destination: Slot,
}

pub type PassPlan = SmallVec<[PlannedPass; 8]>;

/// Ping-pong source of effect `i` in a shapes-with-effects chain.
#[inline]
#[must_use]
pub fn ping_pong_source(i: usize) -> usize {
    i % 2
}

/// Ping-pong destination of effect `i`, unless it is the last one.
#[inline]
#[must_use]
pub fn ping_pong_destination(i: usize) -> usize {
    1 - i % 2
}

/// Passes a layer issues per frame, in execution order.
#[must_use]
pub fn plan(composition: Composition, effects: usize, clears: bool) -> PassPlan {
    let mut passes = PassPlan::new();
    match composition {
        Composition::Empty => {
            if clears {
                passes.push(PlannedPass {
                    kind: PassKind::Clear,
                    source: None,
                    destination: Slot::Output,
                });
            }
        }
        Composition::ShapesOnly => passes.push(PlannedPass {
            kind: PassKind::Shapes,
            source: None,
            destination: Slot::Output,
        }),
        Composition::EffectsOnly => {
            passes.extend((0..effects).map(|i| PlannedPass {
                kind: PassKind::Effect(i),
                source: None,
                destination: Slot::Output,
            }));
        }
        Composition::ShapesWithEffects => {
            passes.push(PlannedPass {
                kind: PassKind::Shapes,
                source: None,
                destination: Slot::PingPong(0),
            });
            passes.extend((0..effects).map(|i| PlannedPass {
                kind: PassKind::Effect(i),
                source: Some(Slot::PingPong(ping_pong_source(i))),
                destination: if i + 1 == effects {
                    Slot::Output
                } else {
                    Slot::PingPong(ping_pong_destination(i))
                },
            }));
        }
    }
    passes
}
