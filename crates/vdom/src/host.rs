use crate::error::FactoryError;
use crate::transition::Transform;
use actions::{AttrMap, ElementId, HookEvent, PageId};
use std::fmt;

/// Opaque identity of a host renderable, minted by the element factory.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct RenderHandle(pub u64);

impl fmt::Display for RenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// The concrete class a tag + attribute set resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentClass {
    pub name: String,
    /// Instances own a host surface and accept children.
    pub container: bool,
    /// Children are virtualized through the recycler pool.
    pub recycler: bool,
}

impl ComponentClass {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: false,
            recycler: false,
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: true,
            recycler: false,
        }
    }

    pub fn recycler(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: true,
            recycler: true,
        }
    }
}

/// Insert/remove/reorder capability of a container renderable.
pub trait HostSurface {
    fn insert_child(&mut self, child: RenderHandle, index: usize);
    fn remove_child(&mut self, child: RenderHandle);
    fn reorder_child(&mut self, child: RenderHandle, index: usize);
}

/// A concrete host object bound to one virtual element.
pub trait Renderable {
    fn handle(&self) -> RenderHandle;
    fn class_name(&self) -> &str;
    /// Apply a delta of attributes; keys not present are left untouched.
    fn apply_attrs(&mut self, attrs: &AttrMap);
    fn apply_styles(&mut self, styles: &AttrMap);
    fn bind_event(&mut self, event: &str);
    fn unbind_event(&mut self, event: &str);
    /// Container renderables expose their host surface.
    fn surface_mut(&mut self) -> Option<&mut dyn HostSurface> {
        None
    }
    /// Reset bound data before the object goes back to a recycler pool.
    fn recycle(&mut self) {}
    fn destroy(&mut self) {}
}

/// Turns a tag and attributes into renderables. Must be deterministic for a
/// given tag + attribute shape.
pub trait ElementFactory {
    fn resolve(&self, tag: &str, attrs: &AttrMap) -> Option<ComponentClass>;
    fn create(
        &mut self,
        tag: &str,
        parent: Option<RenderHandle>,
        id: ElementId,
        attrs: &AttrMap,
    ) -> Result<Box<dyn Renderable>, FactoryError>;
}

/// Receives lifecycle notifications bound for the script engine.
pub trait CallbackSink {
    fn notify(&mut self, event: HookEvent);
}

/// Snapshot of a clicked element forwarded to telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRecord {
    pub page: PageId,
    pub element: ElementId,
    pub tag: String,
    pub handle: Option<RenderHandle>,
    pub event: String,
}

pub trait TelemetrySink {
    fn record_click(&mut self, click: ClickRecord);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollRequest {
    pub target: Option<ElementId>,
    pub top: Option<f32>,
    pub left: Option<f32>,
    pub smooth: bool,
}

impl ScrollRequest {
    /// Read `top`, `left` and `behavior` from scroll action attributes.
    pub fn from_attrs(target: Option<ElementId>, attrs: &AttrMap) -> Self {
        let number = |key: &str| attrs.get(key).and_then(|value| value.trim().parse::<f32>().ok());
        Self {
            target,
            top: number("top"),
            left: number("left"),
            smooth: attrs.get("behavior") == Some("smooth"),
        }
    }
}

/// Page-level chrome owned by the document root component.
pub trait PageDelegate {
    fn update_title_bar(&mut self, attrs: &AttrMap);
    fn update_status_bar(&mut self, attrs: &AttrMap);
    fn exit_fullscreen(&mut self);
    fn set_secure(&mut self, secure: bool);
    fn scroll_to(&mut self, request: &ScrollRequest);
    fn hide_skeleton(&mut self);
    /// The initial tree is complete.
    fn page_created(&mut self, page: PageId);
}

/// The window-level container pages are attached to.
pub trait WindowSurface: HostSurface {
    fn child_count(&self) -> usize;
    fn width(&self) -> f32;
    fn bring_to_front(&mut self, child: RenderHandle);
    fn set_transform(&mut self, child: RenderHandle, transform: Transform);
    fn clear_focus(&mut self);
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct AnimationId(pub u64);

/// Pluggable animation driver; completion is reported back through
/// [`crate::Document::animation_finished`].
pub trait Animator {
    fn start(&mut self, target: RenderHandle, from: Transform, to: Transform) -> AnimationId;
    fn cancel(&mut self, id: AnimationId);
}
