//! Error Types
//!
//! This module defines the error type shared by every component of the crate.
//!
//! # Overview
//!
//! [`PainterError`] is grouped into four families, reported by
//! [`PainterError::kind`]:
//! - **Configuration**: bad bindings, missing shader stages, impossible layer
//!   compositions. Always raised while creating an object, never while drawing.
//! - **Resource exhaustion**: a GPU allocation the device cannot satisfy.
//! - **Misuse**: calls made in the wrong state (drawing an unready layer,
//!   resizing a fixed-size layer, stale handles).
//! - **Platform**: adapter, device, surface and event loop failures.
//!
//! Nothing in the crate retries on its own; every failure is surfaced.
//!
//! ```rust,ignore
//! use painter::errors::{ErrorKind, PainterError};
//!
//! match painter.paint(layer) {
//!     Err(e) if e.kind() == ErrorKind::Misuse => log::warn!("{e}"),
//!     other => other?,
//! }
//! ```

use thiserror::Error;

use crate::binding::BindingKind;
use crate::shader::ShaderStage;

/// Coarse classification of a [`PainterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    ResourceExhaustion,
    Misuse,
    Platform,
}

/// The main error type of the crate.
#[derive(Error, Debug)]
pub enum PainterError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A slot declared by the shader received no binding source.
    #[error("Missing binding for group {group} slot {slot}")]
    MissingBinding { group: u32, slot: u32 },

    /// A slot received more than one binding source.
    #[error("Duplicate binding for group {group} slot {slot}")]
    DuplicateBinding { group: u32, slot: u32 },

    /// A binding source targets a slot the shader never declared.
    #[error("Binding for group {group} slot {slot} is not declared by the shader")]
    UndeclaredBinding { group: u32, slot: u32 },

    /// The supplied source does not match the declared slot kind.
    #[error("Binding for group {group} slot {slot} expects {expected:?}, got {found:?}")]
    BindingKindMismatch {
        group: u32,
        slot: u32,
        expected: BindingKind,
        found: BindingKind,
    },

    /// The declared slot kind cannot live in this bind group.
    #[error("Binding kind {kind:?} is not supported in group {group} (slot {slot})")]
    UnsupportedBinding {
        group: u32,
        slot: u32,
        kind: BindingKind,
    },

    /// The shader lacks a stage the drawable needs.
    #[error("Shader is missing its {0:?} stage")]
    MissingStage(ShaderStage),

    /// The form does not fit the shader (stride mismatch, empty data, ...).
    #[error("Invalid form: {0}")]
    InvalidForm(String),

    /// Texture data does not cover the texture exactly.
    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    /// The layer's shapes and effects cannot be rendered together.
    #[error("Unsatisfiable layer composition: {0}")]
    UnsatisfiableComposition(String),

    /// A fixed layer size or an explicit resize has a zero dimension.
    #[error("Invalid layer size {width}x{height}")]
    InvalidLayerSize { width: u32, height: u32 },

    // ========================================================================
    // Resource Exhaustion
    // ========================================================================
    /// The device cannot satisfy an allocation request.
    #[error("Failed to allocate {resource}: {reason}")]
    AllocationFailed {
        resource: &'static str,
        reason: String,
    },

    // ========================================================================
    // Misuse
    // ========================================================================
    /// A layer was rendered before its target textures exist.
    #[error("Layer has no render targets yet")]
    LayerNotReady,

    /// `resize_layer` was called on a fixed-size layer.
    #[error("Fixed-size layers cannot be resized")]
    FixedSizeResize,

    /// A handle does not refer to a live object.
    #[error("Unknown {0} handle")]
    UnknownHandle(&'static str),

    /// A surface-backed layer was painted on a backend without a surface.
    #[error("Backend has no presentation target")]
    NoPresentationTarget,

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceRequestFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create the window surface.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface could not provide a frame.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Event loop error (winit).
    #[cfg(feature = "winit")]
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Window creation failed (winit).
    #[cfg(feature = "winit")]
    #[error("Window error: {0}")]
    Window(#[from] winit::error::OsError),
}

impl PainterError {
    /// Returns the error family this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingBinding { .. }
            | Self::DuplicateBinding { .. }
            | Self::UndeclaredBinding { .. }
            | Self::BindingKindMismatch { .. }
            | Self::UnsupportedBinding { .. }
            | Self::MissingStage(_)
            | Self::InvalidForm(_)
            | Self::InvalidTexture(_)
            | Self::UnsatisfiableComposition(_)
            | Self::InvalidLayerSize { .. } => ErrorKind::Configuration,
            Self::AllocationFailed { .. } => ErrorKind::ResourceExhaustion,
            Self::LayerNotReady
            | Self::FixedSizeResize
            | Self::UnknownHandle(_)
            | Self::NoPresentationTarget => ErrorKind::Misuse,
            Self::AdapterRequestFailed(_)
            | Self::DeviceRequestFailed(_)
            | Self::SurfaceCreateFailed(_)
            | Self::Surface(_) => ErrorKind::Platform,
            #[cfg(feature = "winit")]
            Self::EventLoop(_) | Self::Window(_) => ErrorKind::Platform,
        }
    }
}

/// Alias for `Result<T, PainterError>`.
pub type Result<T, E = PainterError> = std::result::Result<T, E>;
