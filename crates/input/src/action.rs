use spincube_common::{Bounds, Viewport};
use spincube_controls::SpeedPreset;

/// Something the host asks the widget to react to.
///
/// Hosts translate their native events into actions; the widget never sees
/// raw window or DOM events.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Pointer moved. Coordinates share a space with `bounds`, which the host
    /// re-reads for every event.
    PointerMoved {
        client_x: f32,
        client_y: f32,
        bounds: Bounds,
    },
    /// The container now has this pixel size.
    Resized(Viewport),
    /// Slider moved to a raw value.
    SetSpeed(f32),
    /// One of the preset buttons was pressed.
    Preset(SpeedPreset),
}

impl Action {
    /// Pointer move against bounds anchored at the origin.
    pub fn pointer_in(viewport: Viewport, client_x: f32, client_y: f32) -> Self {
        Self::PointerMoved {
            client_x,
            client_y,
            bounds: Bounds::from_viewport(viewport),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_in_uses_origin_bounds() {
        let a = Action::pointer_in(Viewport::new(200, 100), 50.0, 25.0);
        match a {
            Action::PointerMoved { bounds, .. } => {
                assert_eq!(bounds, Bounds::new(0.0, 0.0, 200.0, 100.0));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn preset_action() {
        let a = Action::Preset(SpeedPreset::Fast);
        assert!(matches!(a, Action::Preset(SpeedPreset::Fast)));
    }
}
