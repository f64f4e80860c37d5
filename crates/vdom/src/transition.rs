//! Page transition state machine.
//!
//! A page moves `Closed -> Attaching -> Attached -> Detaching -> Closed`, with a
//! `Moving` detour from `Attached` when it is raised above sibling pages. The
//! animation itself is driven by an external [`Animator`]; this module only
//! decides where the page goes, which transforms bracket the animation and
//! what happens when it ends. The page is unlinked from the window only when a
//! detach completes, whether or not it was animated.

use crate::error::TransitionError;
use crate::host::{AnimationId, Animator, RenderHandle, WindowSurface};
use log::debug;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum TransitionState {
    #[default]
    Closed,
    Attaching,
    Attached,
    Detaching,
    Moving,
}

/// Position/opacity applied to a page renderable.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Transform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub opacity: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        opacity: 1.0,
    };

    pub const fn shifted_x(offset: f32) -> Self {
        Self {
            translate_x: offset,
            translate_y: 0.0,
            opacity: 1.0,
        }
    }

    pub const fn faded() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            opacity: 0.0,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PaneLayout {
    Shopping,
    Navigation,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum PaneRole {
    /// Fixed left pane (home/list page).
    Primary,
    #[default]
    Secondary,
}

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub enum WindowMode {
    #[default]
    Single,
    MultiPane { layout: PaneLayout, pane_width: f32 },
}

impl WindowMode {
    /// Index in the window's child list a newly opened page is inserted at.
    pub fn insertion_index(self, role: PaneRole, child_count: usize) -> usize {
        match (self, role) {
            (Self::MultiPane { .. }, PaneRole::Primary) => 0,
            _ => child_count,
        }
    }

    /// Transform an opening page animates from.
    pub fn entry_transform(self, role: PaneRole, window_width: f32) -> Transform {
        match (self, role) {
            (Self::Single, _) => Transform::shifted_x(window_width),
            (Self::MultiPane { .. }, PaneRole::Primary) => Transform::IDENTITY,
            (
                Self::MultiPane {
                    layout: PaneLayout::Shopping,
                    pane_width,
                },
                PaneRole::Secondary,
            ) => Transform::shifted_x(pane_width),
            (
                Self::MultiPane {
                    layout: PaneLayout::Navigation,
                    ..
                },
                PaneRole::Secondary,
            ) => Transform::faded(),
        }
    }

    /// Transform a closing page animates to.
    pub fn exit_transform(self, role: PaneRole, window_width: f32) -> Transform {
        match (self, role) {
            (Self::MultiPane { .. }, PaneRole::Primary) => Transform::faded(),
            _ => self.entry_transform(role, window_width),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct TransitionRequest {
    pub mode: WindowMode,
    pub role: PaneRole,
    pub animated: bool,
}

/// Observes one transition. `on_end` always fires, including when the
/// animation is skipped or aborted.
pub trait TransitionListener {
    fn on_start(&mut self, state: TransitionState) {
        let _ = state;
    }
    fn on_end(&mut self, state: TransitionState) {
        let _ = state;
    }
}

struct PendingTransition {
    animation: AnimationId,
    target: Transform,
    terminal: TransitionState,
    listener: Option<Box<dyn TransitionListener>>,
}

#[derive(Default)]
pub struct PageTransition {
    state: TransitionState,
    transform: Transform,
    mode: WindowMode,
    role: PaneRole,
    pending: Option<PendingTransition>,
}

impl PageTransition {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> TransitionState {
        self.state
    }

    pub const fn transform(&self) -> Transform {
        self.transform
    }

    pub fn pending_animation(&self) -> Option<AnimationId> {
        self.pending.as_ref().map(|pending| pending.animation)
    }

    /// Insert `page` into `window` and bring it to `Attached`.
    pub fn attach(
        &mut self,
        window: &mut dyn WindowSurface,
        page: RenderHandle,
        animator: Option<&mut dyn Animator>,
        request: TransitionRequest,
        mut listener: Option<Box<dyn TransitionListener>>,
    ) -> Result<(), TransitionError> {
        self.expect_state("attach", TransitionState::Closed)?;
        self.mode = request.mode;
        self.role = request.role;

        let index = request.mode.insertion_index(request.role, window.child_count());
        window.insert_child(page, index);
        self.state = TransitionState::Attaching;
        if let Some(listener) = listener.as_mut() {
            listener.on_start(TransitionState::Attaching);
        }

        let from = request.mode.entry_transform(request.role, window.width());
        self.run(
            window,
            page,
            animator.filter(|_| request.animated),
            from,
            Transform::IDENTITY,
            TransitionState::Attached,
            listener,
        );
        Ok(())
    }

    /// Take `page` out of `window`. Focus is cleared first; the page is
    /// unlinked when the transition ends.
    pub fn detach(
        &mut self,
        window: &mut dyn WindowSurface,
        page: RenderHandle,
        animator: Option<&mut dyn Animator>,
        animated: bool,
        mut listener: Option<Box<dyn TransitionListener>>,
    ) -> Result<(), TransitionError> {
        self.expect_state("detach", TransitionState::Attached)?;
        window.clear_focus();
        self.state = TransitionState::Detaching;
        if let Some(listener) = listener.as_mut() {
            listener.on_start(TransitionState::Detaching);
        }
        let to = self.mode.exit_transform(self.role, window.width());
        self.run(
            window,
            page,
            animator.filter(|_| animated),
            self.transform,
            to,
            TransitionState::Closed,
            listener,
        );
        Ok(())
    }

    /// Raise `page` to the top of the window's paint order and settle it at
    /// `resting`.
    pub fn move_to_front(
        &mut self,
        window: &mut dyn WindowSurface,
        page: RenderHandle,
        animator: Option<&mut dyn Animator>,
        animated: bool,
        resting: Transform,
        mut listener: Option<Box<dyn TransitionListener>>,
    ) -> Result<(), TransitionError> {
        self.expect_state("move", TransitionState::Attached)?;
        window.bring_to_front(page);
        self.state = TransitionState::Moving;
        if let Some(listener) = listener.as_mut() {
            listener.on_start(TransitionState::Moving);
        }
        self.run(
            window,
            page,
            animator.filter(|_| animated),
            self.transform,
            resting,
            TransitionState::Attached,
            listener,
        );
        Ok(())
    }

    /// The animation driver finished `id`. Stale ids are ignored.
    pub fn animation_finished(&mut self, window: &mut dyn WindowSurface, page: RenderHandle, id: AnimationId) -> bool {
        if self.pending_animation() != Some(id) {
            debug!(target: "trellis::transition", "ignoring stale animation {id:?}");
            return false;
        }
        if let Some(pending) = self.pending.take() {
            self.complete(window, page, pending.target, pending.terminal, pending.listener);
        }
        true
    }

    /// Cancel an in-flight animation and jump to its terminal state.
    pub fn abort(
        &mut self,
        window: &mut dyn WindowSurface,
        page: RenderHandle,
        animator: Option<&mut dyn Animator>,
    ) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if let Some(animator) = animator {
            animator.cancel(pending.animation);
        }
        self.complete(window, page, pending.target, pending.terminal, pending.listener);
        true
    }

    #[expect(clippy::too_many_arguments, reason = "Transition steps share one code path")]
    fn run(
        &mut self,
        window: &mut dyn WindowSurface,
        page: RenderHandle,
        animator: Option<&mut dyn Animator>,
        from: Transform,
        to: Transform,
        terminal: TransitionState,
        listener: Option<Box<dyn TransitionListener>>,
    ) {
        match animator {
            Some(animator) if from != to => {
                window.set_transform(page, from);
                self.transform = from;
                let animation = animator.start(page, from, to);
                self.pending = Some(PendingTransition {
                    animation,
                    target: to,
                    terminal,
                    listener,
                });
            }
            _ => self.complete(window, page, to, terminal, listener),
        }
    }

    fn complete(
        &mut self,
        window: &mut dyn WindowSurface,
        page: RenderHandle,
        target: Transform,
        terminal: TransitionState,
        listener: Option<Box<dyn TransitionListener>>,
    ) {
        window.set_transform(page, target);
        self.transform = target;
        if terminal == TransitionState::Closed {
            window.remove_child(page);
            self.transform = Transform::IDENTITY;
        }
        self.state = terminal;
        if let Some(mut listener) = listener {
            listener.on_end(terminal);
        }
    }

    fn expect_state(&self, operation: &'static str, expected: TransitionState) -> Result<(), TransitionError> {
        if self.state == expected && self.pending.is_none() {
            Ok(())
        } else {
            Err(TransitionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
