//! Virtual tree and reconciliation engine.
//!
//! A [`Document`] mirrors the script side's element tree. Change Actions are
//! applied to it with [`apply`]; the engine keeps the virtual tree, the element
//! registry and the host renderables in sync, virtualizes list-like containers
//! through the recycler pool and drives page transitions.

pub mod document;
pub use document::{Document, DocumentHost, DocumentOptions, DocumentStats, ElementSnapshot, TypeChangeRule};

pub mod element;
pub use element::{Binding, DataItem, ElementKind, ElementState, VirtualElement};

pub mod engine;
pub use engine::apply;

pub mod error;
pub use error::{ApplyError, FactoryError, TransitionError};

pub mod headless;

/// Collaborator traits: factory, host surfaces, callback and telemetry sinks.
pub mod host;
pub use host::{
    AnimationId, Animator, CallbackSink, ClickRecord, ComponentClass, ElementFactory, HostSurface, PageDelegate,
    RenderHandle, Renderable, ScrollRequest, TelemetrySink, WindowSurface,
};

pub mod printing;
pub use printing::Outline;

pub mod recycler;
pub use recycler::{KeyedShapeClassifier, RecyclerPool, ShapeClassifier, ShapeKey, Template};

pub mod registry;
pub use registry::ElementRegistry;

pub mod transition;
pub use transition::{
    PageTransition, PaneLayout, PaneRole, Transform, TransitionListener, TransitionRequest, TransitionState,
    WindowMode,
};
