use crate::config::WidgetConfig;
use spincube_common::{CubePose, MountId, PointerState, RotationSpeed, Viewport};
use spincube_controls::ControlPanel;
use spincube_input::{Action, ListenerHandle, ListenerKind, Listeners, normalize_pointer};
use spincube_kernel::{
    FrameHandle, Phase, PhaseError, Scheduler, TaskHandle, WidgetEvent, WidgetState,
};
use spincube_render::{Capability, CapabilityProbe, RenderError, SceneDesc, SceneHandle};
use std::time::Instant;

/// Errors from mounting a widget.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("container has no area ({width}x{height})")]
    EmptyContainer { width: u32, height: u32 },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

/// Deferred work a mount schedules on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    /// End of the loading delay.
    Startup,
}

/// One mounted instance of the widget.
///
/// Owns its scene, its scheduled callbacks and its listeners. Nothing is
/// shared between instances. The host drives it with `poll` (timers),
/// `frame` (display refresh) and `handle` (input).
pub struct Widget<S: SceneHandle> {
    state: WidgetState,
    config: WidgetConfig,
    controls: ControlPanel,
    capability: Capability,
    container: Viewport,
    scene: Option<S>,
    scheduler: Scheduler<Task>,
    listeners: Listeners,
    listener_handles: Vec<ListenerHandle>,
    startup: Option<TaskHandle>,
    frame: Option<FrameHandle>,
    mounted: bool,
}

impl<S: SceneHandle> Widget<S> {
    /// Mount into a container of `container` pixels.
    ///
    /// Probes capability exactly once. On success `bootstrap` builds the
    /// scene, listeners are attached and the startup delay is scheduled; on
    /// failure the widget goes straight to `Unsupported` and `bootstrap` is
    /// never called.
    pub fn mount<P, F>(
        config: WidgetConfig,
        container: Viewport,
        probe: &mut P,
        bootstrap: F,
        now: Instant,
    ) -> Result<Self, MountError>
    where
        P: CapabilityProbe + ?Sized,
        F: FnOnce(&SceneDesc) -> Result<S, RenderError>,
    {
        if container.is_empty() {
            return Err(MountError::EmptyContainer {
                width: container.width,
                height: container.height,
            });
        }

        let id = MountId::new();
        let mut state = WidgetState::new(id, config.initial_speed);
        state.record(WidgetEvent::Mounted { id, container });

        let mut scheduler = Scheduler::new();
        let mut listeners = Listeners::new();
        let capability = probe.probe();

        // Nothing below may fail once the scene exists, so a failed mount
        // never reaches `Drop` and never reports a teardown.
        let (scene, startup, listener_handles) = match &capability {
            Capability::Unsupported { reason } => {
                tracing::info!(mount = %id, %reason, "hardware acceleration unavailable, showing fallback");
                state.mark_unsupported(reason.clone())?;
                (None, None, Vec::new())
            }
            Capability::Supported { adapter } => {
                let scene = bootstrap(&SceneDesc::standard(container))?;
                let handles = vec![
                    listeners.add(ListenerKind::PointerMove),
                    listeners.add(ListenerKind::Resize),
                ];
                let startup = scheduler.defer(now, config.startup_delay, Task::Startup);
                tracing::info!(
                    mount = %id,
                    %adapter,
                    width = container.width,
                    height = container.height,
                    "widget mounted"
                );
                (Some(scene), Some(startup), handles)
            }
        };

        Ok(Self {
            state,
            config,
            controls: ControlPanel::new(config.initial_speed),
            capability,
            container,
            scene,
            scheduler,
            listeners,
            listener_handles,
            startup,
            frame: None,
            mounted: true,
        })
    }

    /// Run every deferred task due at `now`.
    pub fn poll(&mut self, now: Instant) {
        for (handle, task) in self.scheduler.take_due(now) {
            match task {
                Task::Startup => {
                    if self.startup != Some(handle) || !self.mounted {
                        continue;
                    }
                    self.startup = None;
                    self.become_ready();
                }
            }
        }
    }

    fn become_ready(&mut self) {
        if let Err(e) = self.state.mark_ready() {
            tracing::warn!(mount = %self.id(), "startup ignored: {e}");
            return;
        }
        self.frame = Some(self.scheduler.request_frame());
        tracing::info!(mount = %self.id(), "widget ready");
    }

    /// The display refreshed. Returns true if the widget used the frame.
    ///
    /// Consumes the pending frame request, queues the next one, advances the
    /// pose and submits it to the scene.
    pub fn frame(&mut self) -> bool {
        if self.scheduler.take_frame().is_none() {
            return false;
        }
        self.frame = None;
        if !self.mounted || self.state.phase() != Phase::Ready {
            return false;
        }
        self.frame = Some(self.scheduler.request_frame());

        if let Some(scene) = self.scene.as_mut() {
            self.state.step();
            scene.submit(&self.state.pose());
        }
        true
    }

    /// React to host input. Returns true if the action changed anything.
    pub fn handle(&mut self, action: Action) -> bool {
        if !self.mounted {
            return false;
        }
        match action {
            Action::PointerMoved {
                client_x,
                client_y,
                bounds,
            } => {
                if !self.listeners.is_listening(ListenerKind::PointerMove) {
                    return false;
                }
                match normalize_pointer(client_x, client_y, bounds) {
                    Some(pointer) => {
                        self.state.set_pointer(pointer);
                        true
                    }
                    None => false,
                }
            }
            Action::Resized(viewport) => {
                if !self.listeners.is_listening(ListenerKind::Resize) || viewport.is_empty() {
                    return false;
                }
                self.container = viewport;
                if let Some(scene) = self.scene.as_mut() {
                    scene.resize(viewport);
                }
                self.state.record(WidgetEvent::Resized { viewport });
                tracing::debug!(
                    mount = %self.id(),
                    width = viewport.width,
                    height = viewport.height,
                    "container resized"
                );
                true
            }
            Action::SetSpeed(raw) => {
                if !self.state.is_supported() {
                    return false;
                }
                let speed = self.controls.set_slider(raw);
                self.state.set_speed(speed)
            }
            Action::Preset(preset) => {
                if !self.state.is_supported() {
                    return false;
                }
                let speed = self.controls.apply(preset);
                self.state.set_speed(speed)
            }
        }
    }

    /// Tear the mount down. Safe to call more than once.
    ///
    /// Cancels the startup task and the pending frame, removes every
    /// listener and drops the scene.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        if let Some(handle) = self.startup.take() {
            self.scheduler.cancel(handle);
        }
        if let Some(handle) = self.frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        let removed = self
            .listener_handles
            .drain(..)
            .filter(|handle| self.listeners.remove(*handle))
            .count();
        let had_scene = self.scene.take().is_some();

        let frames = self.state.frames();
        self.state.record(WidgetEvent::Unmounted { frames });
        tracing::info!(
            mount = %self.id(),
            frames,
            listeners = removed,
            released_scene = had_scene,
            "widget unmounted"
        );
    }

    pub fn id(&self) -> MountId {
        self.state.id()
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn is_supported(&self) -> bool {
        self.state.is_supported()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn pose(&self) -> CubePose {
        self.state.pose()
    }

    pub fn pointer(&self) -> PointerState {
        self.state.pointer()
    }

    pub fn speed(&self) -> RotationSpeed {
        self.state.speed()
    }

    pub fn controls(&self) -> &ControlPanel {
        &self.controls
    }

    pub fn container(&self) -> Viewport {
        self.container
    }

    pub fn scene(&self) -> Option<&S> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut S> {
        self.scene.as_mut()
    }

    /// True while a frame callback is queued.
    pub fn wants_frame(&self) -> bool {
        self.scheduler.frame_pending()
    }

    /// When the host should next call `poll`.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Scheduled callbacks still outstanding.
    pub fn pending_callbacks(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn drain_events(&mut self) -> Vec<WidgetEvent> {
        self.state.drain_events()
    }
}

impl<S: SceneHandle> Drop for Widget<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spincube_controls::SpeedPreset;
    use spincube_render::{PerspectiveCamera, StaticProbe};
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a subscriber that records formatted log lines.
    fn with_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (out, text)
    }

    /// Counts live scenes and submitted frames.
    #[derive(Debug, Default, Clone)]
    struct Counters {
        built: Rc<Cell<u32>>,
        live: Rc<Cell<i32>>,
        submits: Rc<Cell<u32>>,
    }

    struct MockScene {
        camera: PerspectiveCamera,
        viewport: Viewport,
        counters: Counters,
    }

    impl SceneHandle for MockScene {
        fn camera(&self) -> &PerspectiveCamera {
            &self.camera
        }

        fn resize(&mut self, viewport: Viewport) {
            self.viewport = viewport;
            self.camera.set_viewport(viewport);
        }

        fn submit(&mut self, _pose: &CubePose) {
            self.counters.submits.set(self.counters.submits.get() + 1);
        }
    }

    impl Drop for MockScene {
        fn drop(&mut self) {
            self.counters.live.set(self.counters.live.get() - 1);
        }
    }

    fn builder(
        counters: &Counters,
        viewport: Viewport,
    ) -> impl FnOnce(&SceneDesc) -> Result<MockScene, RenderError> + '_ {
        move |desc| {
            counters.built.set(counters.built.get() + 1);
            counters.live.set(counters.live.get() + 1);
            Ok(MockScene {
                camera: desc.camera,
                viewport,
                counters: counters.clone(),
            })
        }
    }

    const CONTAINER: Viewport = Viewport {
        width: 800,
        height: 400,
    };

    fn mount_supported(counters: &Counters, now: Instant) -> Widget<MockScene> {
        Widget::mount(
            WidgetConfig::default(),
            CONTAINER,
            &mut StaticProbe::supported("mock"),
            builder(counters, CONTAINER),
            now,
        )
        .unwrap()
    }

    fn ready_widget(counters: &Counters) -> (Widget<MockScene>, Instant) {
        let start = Instant::now();
        let mut w = mount_supported(counters, start);
        let after = start + Duration::from_millis(800);
        w.poll(after);
        assert_eq!(w.phase(), Phase::Ready);
        (w, after)
    }

    #[test]
    fn unsupported_never_builds_a_scene() {
        let start = Instant::now();
        let mut w: Widget<MockScene> = Widget::mount(
            WidgetConfig::default(),
            CONTAINER,
            &mut StaticProbe::unsupported("no gpu"),
            |_| -> Result<MockScene, RenderError> { panic!("scene must not be built") },
            start,
        )
        .unwrap();

        assert_eq!(w.phase(), Phase::Unsupported);
        assert!(!w.is_supported());
        assert!(!w.is_loading());
        assert!(w.scene().is_none());
        assert_eq!(w.pending_callbacks(), 0);
        assert_eq!(w.listener_count(), 0);
        assert!(!w.wants_frame());

        w.poll(start + Duration::from_secs(5));
        assert!(!w.frame());
        assert_eq!(w.phase(), Phase::Unsupported);
        assert_eq!(w.state().frames(), 0);
        assert!(!w.handle(Action::SetSpeed(0.02)));
    }

    #[test]
    fn loading_until_startup_delay() {
        let counters = Counters::default();
        let start = Instant::now();
        let mut w = mount_supported(&counters, start);

        assert!(w.is_loading());
        assert_eq!(counters.built.get(), 1);
        assert_eq!(w.listener_count(), 2);
        assert_eq!(w.pending_callbacks(), 1);
        assert_eq!(w.next_deadline(), Some(start + Duration::from_millis(800)));

        w.poll(start + Duration::from_millis(799));
        assert!(w.is_loading());
        assert!(!w.frame());

        w.poll(start + Duration::from_millis(800));
        assert_eq!(w.phase(), Phase::Ready);
        assert!(w.wants_frame());
        assert_eq!(w.pending_callbacks(), 1);
    }

    #[test]
    fn hundred_frames_without_pointer() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);
        for _ in 0..100 {
            assert!(w.frame());
            assert_eq!(w.pending_callbacks(), 1);
        }
        let pose = w.pose();
        assert!((pose.yaw - 1.0).abs() < 1e-4);
        assert!(pose.pitch.abs() < 1e-6);
        assert!(pose.roll.abs() < 1e-6);
        assert_eq!(counters.submits.get(), 100);
    }

    #[test]
    fn frame_without_request_is_ignored() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);
        assert!(w.frame());
        w.unmount();
        assert!(!w.frame());
        assert_eq!(counters.submits.get(), 1);
    }

    #[test]
    fn unmount_during_startup_delay_cancels_everything() {
        let counters = Counters::default();
        let start = Instant::now();
        let mut w = mount_supported(&counters, start);

        w.unmount();
        assert_eq!(w.pending_callbacks(), 0);
        assert_eq!(w.listener_count(), 0);
        assert_eq!(counters.live.get(), 0);

        // The delay elapsing afterwards must not revive anything.
        w.poll(start + Duration::from_secs(2));
        assert!(w.is_loading());
        assert!(!w.frame());
        assert!(w.scene().is_none());
        assert_eq!(counters.built.get(), 1);
    }

    #[test]
    fn unmount_mid_loop_is_idempotent() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);
        w.frame();
        w.frame();

        w.unmount();
        w.unmount();
        assert_eq!(w.pending_callbacks(), 0);
        assert_eq!(w.listener_count(), 0);
        assert_eq!(counters.live.get(), 0);
        assert!(!w.is_mounted());

        let unmounted = w
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, WidgetEvent::Unmounted { .. }))
            .count();
        assert_eq!(unmounted, 1);

        drop(w);
        assert_eq!(counters.live.get(), 0);
    }

    #[test]
    fn drop_releases_the_scene() {
        let counters = Counters::default();
        {
            let (_w, _) = ready_widget(&counters);
            assert_eq!(counters.live.get(), 1);
        }
        assert_eq!(counters.live.get(), 0);
    }

    #[test]
    fn resize_updates_aspect_exactly() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);
        let viewport = Viewport::new(1023, 377);
        assert!(w.handle(Action::Resized(viewport)));

        let scene = w.scene().unwrap();
        assert_eq!(scene.camera().aspect, 1023.0 / 377.0);
        assert_eq!(scene.viewport, viewport);
        assert_eq!(w.container(), viewport);

        assert!(!w.handle(Action::Resized(Viewport::new(0, 10))));
        assert_eq!(w.container(), viewport);
    }

    #[test]
    fn pointer_drives_tilt_target() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);
        assert!(w.handle(Action::pointer_in(CONTAINER, 800.0, 0.0)));
        assert_eq!(w.pointer(), PointerState { x: 1.0, y: 1.0 });

        for _ in 0..300 {
            w.frame();
        }
        let pose = w.pose();
        assert!((pose.pitch - 0.2).abs() < 1e-4);
        assert!((pose.roll - 0.2).abs() < 1e-4);
    }

    #[test]
    fn input_ignored_after_unmount() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);
        w.unmount();
        assert!(!w.handle(Action::pointer_in(CONTAINER, 0.0, 0.0)));
        assert!(!w.handle(Action::Resized(Viewport::new(10, 10))));
        assert!(!w.handle(Action::Preset(SpeedPreset::Fast)));
        assert_eq!(w.pointer(), PointerState::default());
    }

    #[test]
    fn speed_controls_feed_the_next_frame() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);

        assert!(w.handle(Action::SetSpeed(0.5)));
        assert_eq!(w.speed().get(), 0.05);

        assert!(w.handle(Action::Preset(SpeedPreset::Fast)));
        let before = w.pose().yaw;
        w.frame();
        assert!((w.pose().yaw - before - 0.03).abs() < 1e-6);

        assert!(w.handle(Action::Preset(SpeedPreset::Stop)));
        let before = w.pose().yaw;
        w.frame();
        assert_eq!(w.pose().yaw, before);
        assert_eq!(w.controls().label(), "0.0%");
    }

    #[test]
    fn empty_container_is_rejected() {
        let counters = Counters::default();
        let result = Widget::mount(
            WidgetConfig::default(),
            Viewport::new(0, 300),
            &mut StaticProbe::supported("mock"),
            builder(&counters, CONTAINER),
            Instant::now(),
        );
        assert!(matches!(
            result,
            Err(MountError::EmptyContainer {
                width: 0,
                height: 300
            })
        ));
        assert_eq!(counters.built.get(), 0);
    }

    #[test]
    fn bootstrap_failure_is_reported() {
        let result: Result<Widget<MockScene>, _> = Widget::mount(
            WidgetConfig::default(),
            CONTAINER,
            &mut StaticProbe::supported("mock"),
            |_| Err(RenderError::Bootstrap("out of memory".into())),
            Instant::now(),
        );
        assert!(matches!(
            result,
            Err(MountError::Render(RenderError::Bootstrap(_)))
        ));
    }

    #[test]
    fn mounts_are_isolated() {
        let a_counters = Counters::default();
        let b_counters = Counters::default();
        let (mut a, _) = ready_widget(&a_counters);
        let (mut b, _) = ready_widget(&b_counters);
        assert_ne!(a.id(), b.id());

        a.unmount();
        assert!(b.frame());
        assert_eq!(b_counters.live.get(), 1);
        assert_eq!(b.listener_count(), 2);
        assert_eq!(a_counters.live.get(), 0);
    }

    #[test]
    fn failed_bootstrap_reports_no_teardown() {
        let (result, logs) = with_logs(|| {
            Widget::<MockScene>::mount(
                WidgetConfig::default(),
                CONTAINER,
                &mut StaticProbe::supported("mock"),
                |_| Err(RenderError::Bootstrap("no memory".into())),
                Instant::now(),
            )
            .map(|_| ())
        });
        assert!(result.is_err());
        assert!(!logs.contains("widget mounted"));
        assert!(!logs.contains("widget unmounted"));
    }

    #[test]
    fn successful_mount_logs_both_ends() {
        let counters = Counters::default();
        let (_, logs) = with_logs(|| {
            let mut w = mount_supported(&counters, Instant::now());
            w.unmount();
        });
        assert!(logs.contains("widget mounted"));
        assert_eq!(logs.matches("widget unmounted").count(), 1);
    }

    #[test]
    fn skipped_refresh_keeps_pose_and_request() {
        let counters = Counters::default();
        let (mut w, ready_at) = ready_widget(&counters);
        assert!(w.frame());
        let pose = w.pose();

        // Timers keep running while the host has no surface to draw on.
        for ms in 0..50 {
            w.poll(ready_at + Duration::from_millis(ms));
        }
        assert_eq!(w.pose(), pose);
        assert_eq!(w.state().frames(), 1);
        assert!(w.wants_frame());

        assert!(w.frame());
        assert_eq!(w.state().frames(), 2);
    }

    #[test]
    fn unmount_releases_by_handle() {
        let counters = Counters::default();
        let (mut w, _) = ready_widget(&counters);
        assert!(w.wants_frame());
        w.unmount();
        assert!(!w.wants_frame());
        assert_eq!(w.listener_count(), 0);
        assert_eq!(w.pending_callbacks(), 0);
        assert!(w.next_deadline().is_none());
    }
}
